use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::errors::BackendError;
use crate::Backend;

/// One recorded call against a [`MemoryBackend`], in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    Increment { path: String, delta: i64 },
    Update { writes: Map<String, Value> },
    Get { path: String },
    SetPresence { path: String, payload: Value },
    Beacon { payload: Value },
}

/// In-memory [`Backend`] for engine tests.
///
/// Records every call, serves reads from a flat path map, and can be
/// scripted to fail upcoming writes or to flip connectivity.
pub struct MemoryBackend {
    tree: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<BackendCall>>,
    scripted_failures: Mutex<VecDeque<BackendError>>,
    connectivity: watch::Sender<bool>,
    key_counter: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (connectivity, _) = watch::channel(true);
        Self {
            tree: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            scripted_failures: Mutex::new(VecDeque::new()),
            connectivity,
            key_counter: AtomicU64::new(0),
        }
    }

    /// Seed a value readable through [`Backend::get`].
    pub fn seed(&self, path: &str, value: Value) {
        self.tree.lock().insert(path.to_string(), value);
    }

    /// Queue an error to be returned by the next write-path call.
    pub fn fail_next(&self, error: BackendError) {
        self.scripted_failures.lock().push_back(error);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connectivity.send_replace(connected);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn value_at(&self, path: &str) -> Option<Value> {
        self.tree.lock().get(path).cloned()
    }

    /// Beacon payloads received so far, in order.
    pub fn beacons(&self) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                BackendCall::Beacon { payload } => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    fn take_scripted_failure(&self) -> Option<BackendError> {
        self.scripted_failures.lock().pop_front()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn increment(&self, path: &str, delta: i64) -> Result<i64, BackendError> {
        self.calls.lock().push(BackendCall::Increment {
            path: path.to_string(),
            delta,
        });
        if let Some(e) = self.take_scripted_failure() {
            return Err(e);
        }
        let mut tree = self.tree.lock();
        let current = tree.get(path).and_then(|v| v.as_i64()).unwrap_or(0);
        let next = current + delta;
        tree.insert(path.to_string(), Value::from(next));
        Ok(next)
    }

    async fn update(&self, writes: Map<String, Value>) -> Result<(), BackendError> {
        self.calls.lock().push(BackendCall::Update {
            writes: writes.clone(),
        });
        if let Some(e) = self.take_scripted_failure() {
            return Err(e);
        }
        let mut tree = self.tree.lock();
        for (path, value) in writes {
            tree.insert(path, value);
        }
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Value>, BackendError> {
        self.calls.lock().push(BackendCall::Get {
            path: path.to_string(),
        });
        if let Some(e) = self.take_scripted_failure() {
            return Err(e);
        }
        Ok(self.tree.lock().get(path).cloned())
    }

    async fn set_presence(&self, path: &str, payload: Value) -> Result<(), BackendError> {
        self.calls.lock().push(BackendCall::SetPresence {
            path: path.to_string(),
            payload: payload.clone(),
        });
        if let Some(e) = self.take_scripted_failure() {
            return Err(e);
        }
        self.tree.lock().insert(path.to_string(), payload);
        Ok(())
    }

    fn beacon(&self, payload: Value) {
        self.calls.lock().push(BackendCall::Beacon { payload });
    }

    fn watch_connectivity(&self) -> watch::Receiver<bool> {
        self.connectivity.subscribe()
    }

    // Deterministic keys so tests can assert on paths.
    fn new_child_key(&self) -> String {
        let n = self.key_counter.fetch_add(1, Ordering::Relaxed);
        format!("key-{n:04}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn increment_accumulates() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.increment("a/b", 1).await.unwrap(), 1);
        assert_eq!(backend.increment("a/b", 2).await.unwrap(), 3);
        assert_eq!(backend.value_at("a/b"), Some(json!(3)));
    }

    #[tokio::test]
    async fn scripted_failure_consumed_once() {
        let backend = MemoryBackend::new();
        backend.fail_next(BackendError::Network("down".into()));
        assert!(backend.increment("a", 1).await.is_err());
        assert!(backend.increment("a", 1).await.is_ok());
    }

    #[tokio::test]
    async fn update_applies_all_paths() {
        let backend = MemoryBackend::new();
        let mut writes = Map::new();
        writes.insert("x/1".into(), json!("a"));
        writes.insert("y/2".into(), json!({"n": 2}));
        backend.update(writes).await.unwrap();
        assert_eq!(backend.value_at("x/1"), Some(json!("a")));
        assert_eq!(backend.value_at("y/2"), Some(json!({"n": 2})));
    }

    #[tokio::test]
    async fn calls_are_recorded_in_order() {
        let backend = MemoryBackend::new();
        backend.increment("c", 1).await.unwrap();
        backend.get("c").await.unwrap();
        backend.beacon(json!({"bye": true}));
        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], BackendCall::Increment { .. }));
        assert!(matches!(calls[1], BackendCall::Get { .. }));
        assert!(matches!(calls[2], BackendCall::Beacon { .. }));
    }

    #[tokio::test]
    async fn connectivity_flips_are_observable() {
        let backend = MemoryBackend::new();
        let mut rx = backend.watch_connectivity();
        assert!(*rx.borrow());
        backend.set_connected(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());
    }

    #[test]
    fn child_keys_are_deterministic() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.new_child_key(), "key-0000");
        assert_eq!(backend.new_child_key(), "key-0001");
    }
}
