//! Error types for remote control-plane calls.

use thiserror::Error;

/// Errors returned by the remote API client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Connection failure (DNS, refused, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// Request exceeded the configured deadline.
    #[error("request timeout after {0}ms")]
    Timeout(u64),

    /// Remote answered with a non-2xx status.
    #[error("remote error {status}: {detail}")]
    Api { status: u16, detail: String },

    /// Body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The pass was cancelled while the call was outstanding.
    #[error("operation cancelled")]
    Cancelled,
}

impl RemoteError {
    pub fn api(status: u16, detail: impl Into<String>) -> Self {
        RemoteError::Api {
            status,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Wrap with family and operation context for a status message.
    pub fn context(&self, family: &str, operation: &str) -> String {
        format!("failed to {} {}: {}", operation, family, self)
    }
}
