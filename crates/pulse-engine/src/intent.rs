//! Accumulating intent score and its low/medium/high classification.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Map;
use tracing::debug;

use pulse_backend::Backend;
use pulse_core::config::{INTENT_LOW_THRESHOLD, INTENT_MEDIUM_THRESHOLD};
use pulse_core::ids::VisitorId;
use pulse_core::paths;
use pulse_store::IdentityStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentLevel {
    Low,
    Medium,
    High,
}

impl IntentLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Classify a score. Thresholds are inclusive.
pub fn level_for(score: u32) -> IntentLevel {
    if score >= INTENT_MEDIUM_THRESHOLD {
        IntentLevel::High
    } else if score >= INTENT_LOW_THRESHOLD {
        IntentLevel::Medium
    } else {
        IntentLevel::Low
    }
}

/// Mirrored backend record, written on every grant.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IntentRecord {
    score: u32,
    level: IntentLevel,
    updated_at: i64,
}

/// Point accumulation with durable persistence and a near-real-time backend
/// mirror.
///
/// The score never decreases within a browsing lifetime. Grants bypass the
/// batch queue: the last-known level must reach the backend immediately, not
/// on the next flush.
pub struct IntentEngine {
    identity: Arc<IdentityStore>,
    backend: Arc<dyn Backend>,
    visitor: VisitorId,
    score: u32,
}

impl IntentEngine {
    /// Restore the durable score, defaulting to 0.
    pub fn new(identity: Arc<IdentityStore>, backend: Arc<dyn Backend>, visitor: VisitorId) -> Self {
        let score = identity.restore_intent();
        Self {
            identity,
            backend,
            visitor,
            score,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> IntentLevel {
        level_for(self.score)
    }

    /// Add points, persist durably, and mirror the new state to the backend.
    ///
    /// Mirror failures are dropped: telemetry stays loss-tolerant, and the
    /// durable score already carries the truth forward to the next page.
    pub async fn grant(&mut self, points: u32, now: DateTime<Utc>) -> IntentLevel {
        if points == 0 {
            return self.level();
        }
        self.score += points;
        self.identity.persist_intent(self.score);

        let record = IntentRecord {
            score: self.score,
            level: self.level(),
            updated_at: now.timestamp_millis(),
        };
        let mut writes = Map::new();
        match serde_json::to_value(&record) {
            Ok(value) => {
                writes.insert(paths::visitor_intent(&self.visitor), value);
                if let Err(e) = self.backend.update(writes).await {
                    debug!(error = %e, kind = e.error_kind(), "intent mirror dropped");
                }
            }
            Err(e) => debug!(error = %e, "intent record not serializable"),
        }

        self.level()
    }
}
