//! The backend seam: a hierarchical key-value store reachable over HTTP.
//!
//! The telemetry core needs exactly four persistence primitives —
//! transactional counter increment, append under a fresh child key,
//! multi-path set, and a live connectivity signal — plus a fire-and-forget
//! one-shot delivery usable during page teardown. [`Backend`] captures that
//! surface; [`HttpBackend`] speaks the REST conventions of such a store and
//! [`MemoryBackend`] stands in for tests.

pub mod errors;
pub mod http;
pub mod memory;

pub use errors::BackendError;
pub use http::{HttpBackend, HttpBackendConfig};
pub use memory::{BackendCall, MemoryBackend};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

/// The persistence backend, specified only at its interface.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Atomically increment the counter at `path` by `delta`, returning the
    /// committed value. Read-modify-write; never grouped with other writes.
    async fn increment(&self, path: &str, delta: i64) -> Result<i64, BackendError>;

    /// Apply every entry of `writes` (full path → value) in one request.
    async fn update(&self, writes: Map<String, Value>) -> Result<(), BackendError>;

    /// Read the value at `path`. Absent data reads as `None`.
    async fn get(&self, path: &str) -> Result<Option<Value>, BackendError>;

    /// Set a live-presence record and arm automatic removal of it for when
    /// connectivity is later lost.
    async fn set_presence(&self, path: &str, payload: Value) -> Result<(), BackendError>;

    /// Non-blocking, fire-and-forget one-shot delivery. Attempted even if
    /// the caller goes away immediately after; no completion guarantee.
    fn beacon(&self, payload: Value);

    /// Live connectivity signal (true = connected).
    fn watch_connectivity(&self) -> watch::Receiver<bool>;

    /// Fresh unique child key for append operations. Keys sort by creation
    /// time so appended lists read back in order.
    fn new_child_key(&self) -> String {
        push_key(chrono::Utc::now().timestamp_millis())
    }
}

const PUSH_ALPHABET: &[u8; 64] =
    b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Chronologically sortable child key: 8 base-64 characters of timestamp
/// followed by 12 random characters.
pub fn push_key(now_ms: i64) -> String {
    use rand::Rng;

    let mut key = String::with_capacity(20);
    let mut ts = now_ms;
    let mut stamp = [0u8; 8];
    for slot in stamp.iter_mut().rev() {
        *slot = PUSH_ALPHABET[(ts % 64) as usize];
        ts /= 64;
    }
    key.extend(stamp.iter().map(|&b| b as char));

    let mut rng = rand::thread_rng();
    for _ in 0..12 {
        key.push(PUSH_ALPHABET[rng.gen_range(0..64)] as char);
    }
    key
}
