//! In-process record store
//!
//! Holds the whole tree in memory and notifies subscribers after every
//! change. Used for tests and offline runs. Writes under chosen path prefixes
//! can be made to fail to exercise partial batches.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};
use shared::Snapshot;
use tokio::sync::mpsc;

use super::{PushIdGenerator, RecordStore, StoreError, StoreResult, Subscription, Updates};

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    ids: Arc<PushIdGenerator>,
}

#[derive(Default)]
struct MemoryState {
    root: Map<String, Value>,
    subscribers: Vec<(String, mpsc::UnboundedSender<Snapshot>)>,
    failing_prefixes: Vec<String>,
    mutations: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutation under `prefix` fail with a network error
    pub fn fail_writes_under(&self, prefix: &str) {
        self.lock().failing_prefixes.push(normalize(prefix));
    }

    /// Let writes succeed again
    pub fn clear_failures(&self) {
        self.lock().failing_prefixes.clear();
    }

    /// Number of successful mutations so far
    pub fn mutation_count(&self) -> usize {
        self.lock().mutations
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock();
        state.subscribers.retain(|(_, tx)| !tx.is_closed());
        state.subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MemoryState {
    fn check_writable(&self, path: &str) -> StoreResult<()> {
        if self
            .failing_prefixes
            .iter()
            .any(|prefix| path == prefix || path.starts_with(&format!("{}/", prefix)))
        {
            return Err(StoreError::Network(format!("write to {} failed", path)));
        }
        Ok(())
    }

    fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = segments(path);
        let first = segments.next()?;
        let mut node = self.root.get(first)?;
        for segment in segments {
            node = node.as_object()?.get(segment)?;
        }
        Some(node)
    }

    fn snapshot(&self, path: &str) -> Snapshot {
        match self.get(path) {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Snapshot::new(),
        }
    }

    fn set(&mut self, path: &str, value: Value) {
        let parts: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = parts.split_last() else {
            return;
        };
        let mut node = &mut self.root;
        for part in parents {
            let child = node
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            node = match child {
                Value::Object(map) => map,
                _ => return,
            };
        }
        node.insert(last.to_string(), value);
    }

    fn remove(&mut self, path: &str) -> bool {
        let parts: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = parts.split_last() else {
            return false;
        };
        let mut node = &mut self.root;
        for part in parents {
            node = match node.get_mut(*part) {
                Some(Value::Object(map)) => map,
                _ => return false,
            };
        }
        node.remove(*last).is_some()
    }

    fn notify(&mut self, changed: &[String]) {
        self.mutations += 1;
        let mut deliveries = Vec::new();
        for (index, (path, _)) in self.subscribers.iter().enumerate() {
            let related = changed.iter().any(|c| overlaps(path, c));
            if related {
                deliveries.push((index, self.snapshot(path)));
            }
        }
        for (index, snapshot) in deliveries {
            let _ = self.subscribers[index].1.send(snapshot);
        }
        self.subscribers.retain(|(_, tx)| !tx.is_closed());
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, path: &str) -> StoreResult<Snapshot> {
        Ok(self.lock().snapshot(&normalize(path)))
    }

    async fn subscribe(&self, path: &str) -> StoreResult<Subscription> {
        let path = normalize(path);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        tx.send(state.snapshot(&path)).map_err(|_| StoreError::Closed)?;
        state.subscribers.push((path.clone(), tx));
        Ok(Subscription::new(path, rx))
    }

    async fn write(&self, path: &str, record: Value) -> StoreResult<()> {
        let path = normalize(path);
        let mut state = self.lock();
        state.check_writable(&path)?;
        if record.is_null() {
            state.remove(&path);
        } else {
            state.set(&path, record);
        }
        state.notify(&[path]);
        Ok(())
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let path = normalize(path);
        let mut state = self.lock();
        state.check_writable(&path)?;
        if !state.remove(&path) {
            return Err(StoreError::NotFound(path));
        }
        state.notify(&[path]);
        Ok(())
    }

    async fn update_many(&self, updates: Updates) -> StoreResult<()> {
        let updates: Vec<(String, Option<Value>)> = updates
            .into_iter()
            .map(|(path, value)| (normalize(&path), value))
            .collect();

        let mut state = self.lock();
        for (path, _) in &updates {
            state.check_writable(path)?;
        }

        let mut changed = Vec::with_capacity(updates.len());
        for (path, value) in updates {
            match value {
                Some(record) if !record.is_null() => state.set(&path, record),
                _ => {
                    state.remove(&path);
                }
            }
            changed.push(path);
        }
        state.notify(&changed);
        Ok(())
    }

    fn new_push_id(&self) -> String {
        self.ids.next_id()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn normalize(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("/")
}

/// Whether a change at `b` is visible from `a` (or the other way round)
fn overlaps(a: &str, b: &str) -> bool {
    a == b
        || a.is_empty()
        || b.is_empty()
        || a.starts_with(&format!("{}/", b))
        || b.starts_with(&format!("{}/", a))
}
