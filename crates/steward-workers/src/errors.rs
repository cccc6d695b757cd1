//! Worker lifecycle error types.

use steward_core::{ValidationError, WorkerId};
use thiserror::Error;

use crate::capability::Capability;

/// Errors from the worker lifecycle manager.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The underlying runtime could not start the execution unit
    /// (resource exhaustion, invalid image, daemon unreachable).
    #[error("failed to provision worker: {0}")]
    Provision(String),

    /// A declared capability's dependency is missing from the declaration.
    #[error("capability {capability} requires {requires}, which was not declared")]
    CapabilityConflict {
        /// The capability whose dependency is unmet.
        capability: Capability,
        /// The missing dependency.
        requires: Capability,
    },

    /// The static capability table is missing a variant (startup invariant).
    #[error("capability registry incomplete: {0} has no registration")]
    RegistryIncomplete(Capability),

    /// No record for the given worker.
    #[error("unknown worker {0}")]
    NotFound(WorkerId),

    /// Teardown of the execution unit failed; the status marker was left
    /// untouched.
    #[error("teardown failed for worker {worker_id}: {reason}")]
    Teardown {
        /// The worker whose unit could not be removed.
        worker_id: WorkerId,
        /// Runtime-reported reason.
        reason: String,
    },

    /// Malformed launch configuration.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Status store failure.
    #[error(transparent)]
    Store(#[from] steward_store::StoreError),
}
