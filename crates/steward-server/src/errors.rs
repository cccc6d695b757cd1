//! Server error types.

use steward_core::ThreadId;
use steward_state::StateStoreError;
use thiserror::Error;

/// Errors surfaced by the dispatcher and HTTP surface.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The thread already has an active run.
    #[error("thread {0} already has an active run")]
    ThreadBusy(String),

    /// The server is at its concurrent-run cap.
    #[error("server busy: {current}/{max} runs active")]
    ServerBusy {
        /// Currently active runs.
        current: usize,
        /// Configured cap.
        max: usize,
    },

    /// The run was aborted before completion.
    #[error("run for thread {0} was aborted")]
    Aborted(ThreadId),

    /// State store failure.
    #[error(transparent)]
    State(#[from] StateStoreError),
}
