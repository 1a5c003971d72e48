/// Typed error hierarchy for backend transport operations.
///
/// Nothing here ever reaches the host page: the delivery engine drops the
/// affected operations and logs. The classification exists for logging and
/// for distinguishing a dead transport (disable writes) from a lost request
/// (drop and continue).
#[derive(Clone, Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend not ready")]
    NotReady,
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("increment conflict at {path} after {attempts} attempts")]
    Conflict { path: String, attempts: u32 },
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl BackendError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotReady => "not_ready",
            Self::Network(_) => "network",
            Self::Http { .. } => "http",
            Self::Conflict { .. } => "conflict",
            Self::Serialization(_) => "serialization",
        }
    }

    pub fn from_status(status: u16, body: String) -> Self {
        Self::Http { status, body }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Serialization(e.to_string())
    }
}
