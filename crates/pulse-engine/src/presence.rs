//! Live-presence tracking.
//!
//! Presence writes directly, never through the queue: whenever connectivity
//! is confirmed, the visitor's live record is set and the backend arms an
//! automatic removal for when connectivity is later lost. That keeps the
//! "currently online" count accurate without an explicit disconnect signal.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use pulse_backend::Backend;
use pulse_core::ids::VisitorId;
use pulse_core::paths;

/// Spawn the presence watcher. Runs until the backend's connectivity sender
/// is dropped.
pub fn spawn_presence(backend: Arc<dyn Backend>, visitor: VisitorId) -> JoinHandle<()> {
    let path = paths::presence(&visitor);
    let mut connectivity = backend.watch_connectivity();
    tokio::spawn(async move {
        loop {
            if *connectivity.borrow_and_update() {
                let payload = json!({
                    "online": true,
                    "since": Utc::now().timestamp_millis(),
                });
                match backend.set_presence(&path, payload).await {
                    Ok(()) => debug!(path, "presence set"),
                    Err(e) => warn!(error = %e, kind = e.error_kind(), "presence set dropped"),
                }
            }
            if connectivity.changed().await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_backend::{BackendCall, MemoryBackend};
    use std::time::Duration;

    #[tokio::test]
    async fn presence_set_once_connected() {
        let backend = Arc::new(MemoryBackend::new());
        let handle = spawn_presence(backend.clone(), VisitorId::from_raw("v-1"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            BackendCall::SetPresence { path, payload } => {
                assert_eq!(path, "presence/v-1");
                assert_eq!(payload["online"], true);
            }
            other => panic!("expected SetPresence, got {other:?}"),
        }
        handle.abort();
    }

    #[tokio::test]
    async fn reconnect_sets_presence_again() {
        let backend = Arc::new(MemoryBackend::new());
        let handle = spawn_presence(backend.clone(), VisitorId::from_raw("v-1"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        backend.set_connected(false);
        tokio::time::sleep(Duration::from_millis(50)).await;
        backend.set_connected(true);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let presence_sets = backend
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::SetPresence { .. }))
            .count();
        assert_eq!(presence_sets, 2);
        handle.abort();
    }
}
