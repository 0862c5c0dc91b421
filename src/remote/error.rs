//! Remote call error definitions.

use thiserror::Error;

use crate::resilience::TimeoutError;

/// Errors surfaced by a remote resource fetch.
///
/// `Clone` so that every caller sharing a single-flight request receives the
/// same error value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Backend answered with a non-success status.
    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, TLS or transport-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body was not valid JSON.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Request could not be built from the given input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Hard deadline elapsed.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
}

impl RemoteError {
    /// Whether the failure is plausibly transient.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
            RemoteError::Transport(_) | RemoteError::Timeout(_) => true,
            RemoteError::Decode(_) | RemoteError::InvalidRequest(_) => false,
        }
    }
}
