//! Graph engine error types.

use thiserror::Error;

use crate::node::NodeName;

/// Errors surfaced by graph execution.
///
/// Every variant is caught at the engine boundary, appended to the state's
/// error accumulator, and routed to the failure exit — a run never crashes
/// on a stage error.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A stage raised.
    #[error("stage {node} failed: {message}")]
    Stage {
        /// The failing node.
        node: NodeName,
        /// Human-readable cause.
        message: String,
    },

    /// A stage exceeded the configured timeout.
    #[error("stage {node} timed out after {secs}s")]
    Timeout {
        /// The node that timed out.
        node: NodeName,
        /// The configured limit.
        secs: u64,
    },
}

impl GraphError {
    /// Wrap any error as a stage failure for `node`.
    pub fn stage(node: NodeName, err: impl std::fmt::Display) -> Self {
        Self::Stage {
            node,
            message: err.to_string(),
        }
    }
}
