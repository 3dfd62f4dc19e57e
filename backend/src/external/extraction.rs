//! Text extraction client
//!
//! Sends a spoken product description to a generative language model and
//! reads back a partial product record.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ExtractionConfig;
use crate::error::{AppError, AppResult};

/// Best-effort product fields; anything the model could not determine is empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    pub name: String,
    pub brand: String,
    pub price: String,
    pub stock: String,
    pub category: String,
}

/// Free text to product fields
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> AppResult<ExtractedProduct>;
}

/// Client for the generative language API
#[derive(Clone)]
pub struct GenerativeExtractionClient {
    endpoint: String,
    api_key: String,
    model: String,
    http_client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerativeExtractionClient {
    /// Create a new extraction client
    pub fn new(endpoint: String, api_key: String, model: String) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model,
            http_client,
        })
    }

    /// Create a client from the extraction configuration
    pub fn from_config(config: &ExtractionConfig) -> AppResult<Self> {
        if config.api_key.is_empty() {
            return Err(AppError::Configuration(
                "extraction.api_key is not set".to_string(),
            ));
        }
        Self::new(
            config.endpoint.clone(),
            config.api_key.clone(),
            config.model.clone(),
        )
    }
}

#[async_trait]
impl TextExtractor for GenerativeExtractionClient {
    async fn extract(&self, text: &str) -> AppResult<ExtractedProduct> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: extraction_prompt(text),
                }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Extraction request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Extraction API error: {} - {}",
                status, body
            )));
        }

        let data: GenerateResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse extraction response: {}", e))
        })?;

        let reply: String = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        tracing::debug!("Extraction reply: {}", reply);
        parse_extraction_reply(&reply)
    }
}

fn extraction_prompt(text: &str) -> String {
    format!(
        r#"Eres un asistente de inventario experto. Analiza este texto de voz: "{}".
Extrae los datos y devuelve SOLO un objeto JSON (sin markdown).

Estructura requerida:
{{
  "nombre": "Nombre del producto",
  "marca": "Marca (si se menciona)",
  "precio": "Precio unitario (número en string, ej: '1.50')",
  "stock": "Cantidad (número en string, ej: '10')",
  "categoria": "Categoría sugerida"
}}

Reglas:
- Si dice "dólares" o "con", usa punto decimal.
- Si falta un dato, déjalo como string vacío ""."#,
        text.replace('"', "'")
    )
}

/// Remove markdown code fences around a model reply
pub fn strip_code_fences(reply: &str) -> String {
    reply.replace("```json", "").replace("```", "").trim().to_string()
}

/// Decode the model's JSON reply; numbers are accepted where text is expected
pub fn parse_extraction_reply(reply: &str) -> AppResult<ExtractedProduct> {
    let cleaned = strip_code_fences(reply);
    let fields: Map<String, Value> = serde_json::from_str(&cleaned).map_err(|e| {
        AppError::ExternalService(format!("Extraction reply is not a JSON object: {}", e))
    })?;

    Ok(ExtractedProduct {
        name: field_text(&fields, "nombre"),
        brand: field_text(&fields, "marca"),
        price: field_text(&fields, "precio"),
        stock: field_text(&fields, "stock"),
        category: field_text(&fields, "categoria"),
    })
}

fn field_text(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
