use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use pulse_core::ids::{SessionToken, VisitorId};

use crate::scope::KeyValueScope;

const VISITOR_KEY: &str = "pulse.visitorId";
const SESSION_KEY: &str = "pulse.session";
const INTENT_KEY: &str = "pulse.intentScore";
const DWELL_KEY: &str = "pulse.dwellGranted";

/// One tab-scoped browsing episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: SessionToken,
    /// Milliseconds since the Unix epoch.
    pub started_at: i64,
    pub page_views: u32,
}

/// Identity, session, and intent bootstrap over the two storage scopes.
///
/// Every read path here degrades silently: a blocked scope or malformed
/// persisted state regenerates defaults, and write failures are swallowed
/// after a warn. Nothing surfaces to the host page.
pub struct IdentityStore {
    durable: Arc<dyn KeyValueScope>,
    session: Arc<dyn KeyValueScope>,
    // Cached after first resolution so a failed durable write still yields a
    // stable identity for the rest of the page life.
    resolved_visitor: Mutex<Option<VisitorId>>,
}

impl IdentityStore {
    pub fn new(durable: Arc<dyn KeyValueScope>, session: Arc<dyn KeyValueScope>) -> Self {
        Self {
            durable,
            session,
            resolved_visitor: Mutex::new(None),
        }
    }

    /// Resolve the durable visitor identity, generating one if absent.
    ///
    /// A corrupt or missing stored value regenerates a new identity —
    /// accepted identity churn, not an error.
    pub fn resolve_visitor_id(&self) -> VisitorId {
        let mut cached = self.resolved_visitor.lock();
        if let Some(id) = cached.as_ref() {
            return id.clone();
        }

        let id = match self.durable.get(VISITOR_KEY) {
            Some(raw) if !raw.trim().is_empty() => VisitorId::from_raw(raw),
            _ => {
                let fresh = VisitorId::new();
                if let Err(e) = self.durable.set(VISITOR_KEY, fresh.as_str()) {
                    warn!(error = %e, "could not persist visitor id, using in-memory identity");
                }
                fresh
            }
        };

        *cached = Some(id.clone());
        id
    }

    /// Resolve the current session, creating one if no active record exists.
    ///
    /// The id, start time, and page-view counter are created together; an
    /// existing record only has its counter incremented. The updated record
    /// is always written back.
    pub fn resolve_session(&self, now: DateTime<Utc>) -> SessionRecord {
        let mut record = self
            .session
            .get(SESSION_KEY)
            .and_then(|raw| serde_json::from_str::<SessionRecord>(&raw).ok())
            .unwrap_or_else(|| SessionRecord {
                id: SessionToken::new(),
                started_at: now.timestamp_millis(),
                page_views: 0,
            });

        record.page_views += 1;

        match serde_json::to_string(&record) {
            Ok(json) => {
                if let Err(e) = self.session.set(SESSION_KEY, &json) {
                    warn!(error = %e, "could not persist session record");
                }
            }
            Err(e) => warn!(error = %e, "could not encode session record"),
        }

        record
    }

    /// Restore the durable intent score, defaulting to 0 on absence or
    /// parse failure.
    pub fn restore_intent(&self) -> u32 {
        self.durable
            .get(INTENT_KEY)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Persist the intent score durably. Failure is swallowed.
    pub fn persist_intent(&self, score: u32) {
        if let Err(e) = self.durable.set(INTENT_KEY, &score.to_string()) {
            warn!(error = %e, score, "could not persist intent score");
        }
    }

    /// Whether the once-per-session dwell grant already fired.
    pub fn dwell_granted(&self) -> bool {
        self.session.get(DWELL_KEY).is_some()
    }

    pub fn mark_dwell_granted(&self) {
        if let Err(e) = self.session.set(DWELL_KEY, "1") {
            warn!(error = %e, "could not persist dwell marker");
        }
    }

    /// Clear the session record and its per-session markers (explicit
    /// teardown write). The next session starts with a fresh dwell grant.
    pub fn end_session(&self) {
        self.session.remove(SESSION_KEY);
        self.session.remove(DWELL_KEY);
    }
}
