//! Error types for the Loki push exporter

use std::fmt;

pub type Result<T> = std::result::Result<T, ExporterError>;

#[derive(Debug)]
pub enum ExporterError {
    /// Batch could not be turned into a push payload
    Encoding(String),

    /// Operation is not valid in the exporter's current lifecycle state
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Network-level failure (connection refused, timeout, DNS)
    Transport(Box<dyn std::error::Error + Send + Sync>),

    /// Remote answered with a non-2xx status
    PushRejected { status: u16, body: String },

    /// Caller withdrew the operation
    Cancelled,

    /// Configuration error
    Config(String),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),
}

impl ExporterError {
    /// Whether a higher layer may retry the failed operation.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExporterError::Transport(_) => true,
            ExporterError::PushRejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for ExporterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExporterError::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            ExporterError::InvalidState { operation, state } => {
                write!(f, "Invalid state: cannot {} while {}", operation, state)
            }
            ExporterError::Transport(err) => write!(f, "Transport error: {}", err),
            ExporterError::PushRejected { status, body } => {
                write!(f, "Push rejected with status {}: {}", status, body)
            }
            ExporterError::Cancelled => write!(f, "Operation cancelled"),
            ExporterError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ExporterError::Json(err) => write!(f, "JSON error: {}", err),
        }
    }
}

impl std::error::Error for ExporterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExporterError::Transport(err) => Some(err.as_ref()),
            ExporterError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExporterError {
    fn from(err: reqwest::Error) -> Self {
        ExporterError::Transport(Box::new(err))
    }
}

impl From<serde_json::Error> for ExporterError {
    fn from(err: serde_json::Error) -> Self {
        ExporterError::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let rejected = |status| ExporterError::PushRejected {
            status,
            body: String::new(),
        };

        assert!(rejected(429).is_retryable());
        assert!(rejected(500).is_retryable());
        assert!(rejected(503).is_retryable());
        assert!(!rejected(400).is_retryable());
        assert!(!rejected(401).is_retryable());
        assert!(ExporterError::Transport("connection refused".into()).is_retryable());
        assert!(!ExporterError::Cancelled.is_retryable());
        assert!(!ExporterError::Encoding("empty batch".to_string()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = ExporterError::InvalidState {
            operation: "consume logs",
            state: "unstarted",
        };
        assert_eq!(err.to_string(), "Invalid state: cannot consume logs while unstarted");

        let err = ExporterError::PushRejected {
            status: 401,
            body: "no org id".to_string(),
        };
        assert_eq!(err.to_string(), "Push rejected with status 401: no org id");
    }
}
