//! Persistence-API client errors.

use thiserror::Error;

/// A collaborator API call failed.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection-level failure (DNS, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("api returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated by the client.
        body: String,
    },
}

impl RemoteError {
    /// Whether a retry could plausibly succeed (transport faults and
    /// server-side errors; client errors are permanent).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
        }
    }
}
