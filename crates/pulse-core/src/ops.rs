//! Queued backend operations.
//!
//! One [`Operation`] is one pending write destined for the backend. Any
//! adapter may create one; a flush cycle consumes them. Increments require
//! read-modify-write semantics the batching format cannot express, so the
//! delivery engine executes them individually; Append and Set merge into one
//! multi-path update per flush.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One pending write destined for the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Atomic counter increment at `path`.
    Increment { path: String, delta: i64 },
    /// Append `payload` under a fresh unique child key of `path`.
    Append { path: String, payload: Value },
    /// Write `payload` directly at `path`.
    Set { path: String, payload: Value },
}

impl Operation {
    /// Counter increment by one.
    pub fn increment(path: impl Into<String>) -> Self {
        Self::Increment {
            path: path.into(),
            delta: 1,
        }
    }

    pub fn append(path: impl Into<String>, payload: Value) -> Self {
        Self::Append {
            path: path.into(),
            payload,
        }
    }

    pub fn set(path: impl Into<String>, payload: Value) -> Self {
        Self::Set {
            path: path.into(),
            payload,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Increment { path, .. } | Self::Append { path, .. } | Self::Set { path, .. } => {
                path
            }
        }
    }

    /// Kind string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Increment { .. } => "increment",
            Self::Append { .. } => "append",
            Self::Set { .. } => "set",
        }
    }
}
