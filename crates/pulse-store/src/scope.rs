use dashmap::DashMap;

use crate::error::StoreError;

/// A named key/value storage scope.
///
/// Two instances back the pipeline: a durable scope that outlives sessions
/// and a session scope that clears when the browsing episode ends. Reads are
/// infallible by design — a blocked or corrupt store reads as absent and the
/// caller regenerates defaults.
pub trait KeyValueScope: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str);
}

/// Ephemeral in-process scope. The session-scoped default, and the fallback
/// when a persistent scope is unavailable.
#[derive(Default)]
pub struct MemoryScope {
    entries: DashMap<String, String>,
}

impl MemoryScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueScope for MemoryScope {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}
