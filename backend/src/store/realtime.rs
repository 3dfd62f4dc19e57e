//! Realtime database REST client
//!
//! Talks to a hierarchical realtime database over its REST interface:
//! `{base}/{path}.json` for reads and writes, a multi-location `PATCH` at the
//! root for batches and server-sent events for live collections.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use shared::Snapshot;
use tokio::sync::mpsc;

use super::{PushIdGenerator, RecordStore, StoreError, StoreResult, Subscription, Updates};
use crate::config::StoreConfig;

#[derive(Clone)]
pub struct RealtimeDbStore {
    endpoint: Endpoint,
    ids: Arc<PushIdGenerator>,
}

#[derive(Clone)]
struct Endpoint {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    timeout: Duration,
}

/// Response to a `POST`: the allocated key
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

impl RealtimeDbStore {
    /// Create a new client
    pub fn new(base_url: String, auth_token: Option<String>, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: Endpoint {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                auth_token,
                timeout,
            },
            ids: Arc::new(PushIdGenerator::new()),
        })
    }

    /// Create a client from the store configuration
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Self::new(
            config.database_url.clone(),
            config.auth_token.clone().filter(|t| !t.is_empty()),
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

impl Endpoint {
    fn url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            format!("{}/.json", self.base_url)
        } else {
            format!("{}/{}.json", self.base_url, path)
        }
    }

    /// Request with the per-request timeout; not used for event streams
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .timeout(self.timeout)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token.as_str())]),
            None => request,
        }
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> StoreResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StoreError::Network(format!("Request to {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, path, &body));
        }
        Ok(response)
    }

    async fn read(&self, path: &str) -> StoreResult<Snapshot> {
        let response = self.send(path, self.request(Method::GET, path)).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("{}: {}", path, e)))?;
        Ok(snapshot_from_value(value))
    }
}

fn status_error(status: StatusCode, path: &str, body: &str) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::Permission(format!("{}: {}", path, body))
        }
        StatusCode::NOT_FOUND => StoreError::NotFound(path.to_string()),
        _ => StoreError::Network(format!("{} - {}: {}", status, path, body)),
    }
}

/// Children of a node as a snapshot; leaves and `null` give an empty one
fn snapshot_from_value(value: Value) -> Snapshot {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Snapshot::new(),
    }
}

#[async_trait]
impl RecordStore for RealtimeDbStore {
    async fn read(&self, path: &str) -> StoreResult<Snapshot> {
        self.endpoint.read(path).await
    }

    async fn subscribe(&self, path: &str) -> StoreResult<Subscription> {
        let endpoint = self.endpoint.clone();
        let request = endpoint
            .client
            .get(endpoint.url(path))
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let response = endpoint.send(path, request).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let watched = path.to_string();
        let task = tokio::spawn(async move {
            if let Err(e) = stream_snapshots(&endpoint, &watched, response, tx).await {
                tracing::warn!("Subscription to {} ended: {}", watched, e);
            }
        });

        Ok(Subscription::new(path, rx).with_task(task))
    }

    async fn write(&self, path: &str, record: Value) -> StoreResult<()> {
        let request = self.endpoint.request(Method::PUT, path).json(&record);
        self.endpoint.send(path, request).await?;
        Ok(())
    }

    /// Removing an absent record is a no-op on this store
    async fn delete(&self, path: &str) -> StoreResult<()> {
        let request = self.endpoint.request(Method::DELETE, path);
        self.endpoint.send(path, request).await?;
        Ok(())
    }

    async fn append(&self, path: &str, record: Value) -> StoreResult<String> {
        let request = self.endpoint.request(Method::POST, path).json(&record);
        let response = self.endpoint.send(path, request).await?;
        let pushed: PushResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("{}: {}", path, e)))?;
        Ok(pushed.name)
    }

    async fn update_many(&self, updates: Updates) -> StoreResult<()> {
        let body: Map<String, Value> = updates
            .into_iter()
            .map(|(path, value)| (path.trim_matches('/').to_string(), value.unwrap_or(Value::Null)))
            .collect();
        let request = self
            .endpoint
            .request(Method::PATCH, "")
            .json(&Value::Object(body));
        self.endpoint.send("/", request).await?;
        Ok(())
    }

    fn new_push_id(&self) -> String {
        self.ids.next_id()
    }
}

/// Forward one full snapshot per change until the stream or the receiver ends
async fn stream_snapshots(
    endpoint: &Endpoint,
    path: &str,
    response: Response,
    tx: mpsc::UnboundedSender<Snapshot>,
) -> StoreResult<()> {
    let mut parser = EventParser::default();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| StoreError::Network(format!("{}: {}", path, e)))?;
        for event in parser.push(&String::from_utf8_lossy(&chunk)) {
            match event.name.as_str() {
                "put" | "patch" => {
                    let snapshot = endpoint.read(path).await?;
                    tracing::debug!("Snapshot of {} with {} records", path, snapshot.len());
                    if tx.send(snapshot).is_err() {
                        return Ok(());
                    }
                }
                "keep-alive" => {}
                "cancel" => return Err(StoreError::Permission(path.to_string())),
                "auth_revoked" => return Err(StoreError::Permission("auth revoked".to_string())),
                other => tracing::debug!("Ignoring event {} on {}", other, path),
            }
        }
    }

    Err(StoreError::Closed)
}

/// One server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub name: String,
    pub data: String,
}

/// Incremental `text/event-stream` parser
#[derive(Debug, Default)]
pub struct EventParser {
    buffer: String,
}

impl EventParser {
    /// Feed a chunk; returns every event completed by it
    pub fn push(&mut self, chunk: &str) -> Vec<StreamEvent> {
        self.buffer.push_str(&chunk.replace("\r\n", "\n"));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..end + 2).collect();
            let mut name = String::new();
            let mut data = Vec::new();
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    name = value.trim().to_string();
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.trim_start().to_string());
                }
            }
            if !name.is_empty() {
                events.push(StreamEvent {
                    name,
                    data: data.join("\n"),
                });
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parser_handles_split_chunks() {
        let mut parser = EventParser::default();
        assert!(parser.push("event: put\ndata: {\"path\":\"/\",").is_empty());
        let events = parser.push("\"data\":null}\n\nevent: keep-alive\ndata: null\n\n");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "put");
        assert_eq!(events[0].data, "{\"path\":\"/\",\"data\":null}");
        assert_eq!(events[1].name, "keep-alive");
    }

    #[test]
    fn test_parser_accepts_crlf() {
        let mut parser = EventParser::default();
        let events = parser.push("event: patch\r\ndata: {}\r\n\r\n");
        assert_eq!(events, vec![StreamEvent { name: "patch".into(), data: "{}".into() }]);
    }

    #[test]
    fn test_snapshot_from_value() {
        let snapshot = snapshot_from_value(json!({"b": {"n": 2}, "a": {"n": 1}}));
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(snapshot_from_value(Value::Null).is_empty());
        assert!(snapshot_from_value(json!("leaf")).is_empty());
        assert_eq!(snapshot_from_value(json!([null, {"n": 1}])).len(), 1);
    }

    #[test]
    fn test_status_errors() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "p", ""),
            StoreError::Permission(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "p", ""),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "p", ""),
            StoreError::Network(_)
        ));
    }

    #[test]
    fn test_urls() {
        let store = RealtimeDbStore::new(
            "https://db.example.com/".to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            store.endpoint.url("usuarios/u1/productos"),
            "https://db.example.com/usuarios/u1/productos.json"
        );
        assert_eq!(store.endpoint.url(""), "https://db.example.com/.json");
    }
}
