//! Layered best-effort delivery: normal flush, then a fire-and-forget
//! beacon fallback for teardown.
//!
//! Nothing here retries. A failed flush drops its operations and logs;
//! telemetry is loss-tolerant by design.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use pulse_backend::Backend;
use pulse_core::ops::Operation;

pub struct DeliveryEngine {
    backend: Arc<dyn Backend>,
    // Latched on bootstrap failure; never cleared within a page life.
    writes_disabled: AtomicBool,
}

impl DeliveryEngine {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            writes_disabled: AtomicBool::new(false),
        }
    }

    /// Disable every write path for the rest of the page life. Called when
    /// the backend transport failed to initialize.
    pub fn disable_writes(&self) {
        self.writes_disabled.store(true, Ordering::Relaxed);
    }

    pub fn writes_disabled(&self) -> bool {
        self.writes_disabled.load(Ordering::Relaxed)
    }

    /// Transmit one drained queue snapshot.
    ///
    /// Increments execute individually as atomic transactions; Append and
    /// Set merge into a single multi-path update. Append resolves a fresh
    /// child key under its target path first. Failures drop the affected
    /// operations.
    pub async fn flush(&self, ops: Vec<Operation>) {
        if ops.is_empty() {
            return;
        }
        if self.writes_disabled() {
            debug!(dropped = ops.len(), "writes disabled, flush dropped");
            return;
        }

        let mut writes = Map::new();
        for op in ops {
            match op {
                Operation::Increment { path, delta } => {
                    if let Err(e) = self.backend.increment(&path, delta).await {
                        warn!(error = %e, kind = e.error_kind(), path, "increment dropped");
                    }
                }
                Operation::Append { path, payload } => {
                    let key = self.backend.new_child_key();
                    writes.insert(format!("{path}/{key}"), payload);
                }
                Operation::Set { path, payload } => {
                    writes.insert(path, payload);
                }
            }
        }

        if writes.is_empty() {
            return;
        }
        let count = writes.len();
        if let Err(e) = self.backend.update(writes).await {
            warn!(error = %e, kind = e.error_kind(), count, "batched update dropped");
        }
    }

    /// Teardown fallback: re-encode leftovers as one fire-and-forget
    /// payload. Increments become best-effort delta markers here, not true
    /// atomic increments — explicitly lossy.
    pub fn flush_beacon(&self, ops: Vec<Operation>) {
        if ops.is_empty() || self.writes_disabled() {
            return;
        }

        let mut writes = Map::new();
        let mut deltas = Map::new();
        for op in ops {
            match op {
                Operation::Increment { path, delta } => {
                    let merged = deltas.get(&path).and_then(Value::as_i64).unwrap_or(0) + delta;
                    deltas.insert(path, Value::from(merged));
                }
                Operation::Append { path, payload } => {
                    let key = self.backend.new_child_key();
                    writes.insert(format!("{path}/{key}"), payload);
                }
                Operation::Set { path, payload } => {
                    writes.insert(path, payload);
                }
            }
        }

        self.backend.beacon(json!({
            "writes": writes,
            "deltas": deltas,
        }));
    }
}
