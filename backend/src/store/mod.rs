//! Record store client
//!
//! The inventory lives in a remote hierarchical key-value store. Collections
//! are read and observed as whole snapshots (identifier -> raw record); writes
//! address single records by path.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use shared::Snapshot;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub mod memory;
pub mod realtime;

pub use memory::MemoryStore;
pub use realtime::RealtimeDbStore;

/// Store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("no record at {0}")]
    NotFound(String),

    #[error("malformed store response: {0}")]
    Decode(String),

    #[error("subscription closed")]
    Closed,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A multi-location update: each path maps to a record, or `None` to remove it
pub type Updates = BTreeMap<String, Option<Value>>;

/// Access to the remote record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current snapshot of a collection; empty when nothing is stored there
    async fn read(&self, path: &str) -> StoreResult<Snapshot>;

    /// Live snapshots of a collection, starting with the current one
    async fn subscribe(&self, path: &str) -> StoreResult<Subscription>;

    /// Create or replace the record at `path`
    async fn write(&self, path: &str, record: Value) -> StoreResult<()>;

    /// Remove the record at `path`
    async fn delete(&self, path: &str) -> StoreResult<()>;

    /// Store `record` under a fresh identifier in the collection at `path`
    async fn append(&self, path: &str, record: Value) -> StoreResult<String> {
        let id = self.new_push_id();
        self.write(&join(path, &id), record).await?;
        Ok(id)
    }

    /// Apply every update or none of them
    async fn update_many(&self, updates: Updates) -> StoreResult<()>;

    /// Allocate a time-ordered identifier without writing anything
    fn new_push_id(&self) -> String;
}

/// `parent/child`
pub fn join(parent: &str, child: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), child.trim_start_matches('/'))
}

/// Stream of full snapshots for one collection.
///
/// Delivery stops on [`Subscription::unsubscribe`] or when the subscription
/// is dropped.
pub struct Subscription {
    path: String,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
    task: Option<JoinHandle<()>>,
    closed: bool,
}

impl Subscription {
    pub fn new(path: impl Into<String>, receiver: mpsc::UnboundedReceiver<Snapshot>) -> Self {
        Self {
            path: path.into(),
            receiver,
            task: None,
            closed: false,
        }
    }

    /// Attach the task that feeds this subscription; it is aborted on unsubscribe
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Next snapshot; `None` once the subscription is closed
    pub async fn next(&mut self) -> Option<Snapshot> {
        if self.closed {
            return None;
        }
        self.receiver.recv().await
    }

    /// Stop delivery. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.receiver.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::debug!("Unsubscribed from {}", self.path);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Collection paths of one owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerPaths {
    root: String,
}

impl OwnerPaths {
    pub fn new(uid: &str) -> Self {
        Self {
            root: format!("usuarios/{}", uid),
        }
    }

    pub fn catalog(&self) -> String {
        join(&self.root, "catalogoProductos")
    }

    pub fn stock(&self) -> String {
        join(&self.root, "productos")
    }

    pub fn sales(&self) -> String {
        join(&self.root, "historialVentas")
    }

    pub fn contacts(&self) -> String {
        join(&self.root, "distribuidores")
    }

    pub fn catalog_entry(&self, code: &str) -> String {
        join(&self.catalog(), code)
    }

    pub fn stock_unit(&self, id: &str) -> String {
        join(&self.stock(), id)
    }

    pub fn sale(&self, id: &str) -> String {
        join(&self.sales(), id)
    }

    pub fn contact(&self, id: &str) -> String {
        join(&self.contacts(), id)
    }
}

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Generator of 20-character, lexicographically time-ordered identifiers:
/// 8 characters of millisecond timestamp followed by 12 random characters.
/// Identifiers allocated within the same millisecond still sort in allocation
/// order.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    state: Mutex<PushIdState>,
}

#[derive(Debug, Default)]
struct PushIdState {
    last_millis: i64,
    last_random: [u8; 12],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier for the current time
    pub fn next_id(&self) -> String {
        self.next_id_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn next_id_at(&self, now_millis: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if now_millis == state.last_millis {
            increment(&mut state.last_random);
        } else {
            let mut rng = rand::thread_rng();
            for slot in state.last_random.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
            state.last_millis = now_millis;
        }

        let mut id = String::with_capacity(20);
        let mut millis = now_millis.max(0);
        let mut stamp = [0u8; 8];
        for slot in stamp.iter_mut().rev() {
            *slot = PUSH_CHARS[(millis % 64) as usize];
            millis /= 64;
        }
        id.extend(stamp.iter().map(|&c| c as char));
        id.extend(state.last_random.iter().map(|&i| PUSH_CHARS[i as usize] as char));
        id
    }
}

fn increment(random: &mut [u8; 12]) {
    for slot in random.iter_mut().rev() {
        if *slot < 63 {
            *slot += 1;
            return;
        }
        *slot = 0;
    }
}
