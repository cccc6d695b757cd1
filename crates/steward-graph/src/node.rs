//! Node contract and shared stage context.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use steward_api::ApiClient;
use steward_core::RetryConfig;
use steward_events::EventChannel;
use steward_settings::{PermissionGate, WorkerSettings};
use steward_state::{StatePatch, WorkflowState};
use steward_store::SessionStore;
use steward_workers::WorkerManager;

use crate::errors::GraphError;

/// Names of the fixed graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeName {
    /// Request classification.
    Intake,
    /// Requirements capture.
    Requirements,
    /// Technical planning.
    Planning,
    /// Implementation via a code-generation worker.
    Implementation,
    /// Lightweight deployment preparation (simple path).
    DeployPrep,
    /// Deployment recording.
    Deployment,
    /// Infrastructure remediation/provisioning.
    Remediation,
    /// Designated error-handling exit.
    FailureExit,
}

impl NodeName {
    /// Wire-format string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Requirements => "requirements",
            Self::Planning => "planning",
            Self::Implementation => "implementation",
            Self::DeployPrep => "deploy_prep",
            Self::Deployment => "deployment",
            Self::Remediation => "remediation",
            Self::FailureExit => "failure_exit",
        }
    }
}

impl std::fmt::Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing outcome: the next node, or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Continue with the named node.
    Node(NodeName),
    /// Terminal marker.
    End,
}

/// Collaborator handles injected into every stage.
///
/// Explicitly constructed by the composition root and passed in — no global
/// registries.
pub struct StageContext {
    /// Persistence API client.
    pub api: ApiClient,
    /// Worker lifecycle manager.
    pub workers: Arc<WorkerManager>,
    /// Event channel for lifecycle/response events.
    pub events: Arc<EventChannel>,
    /// Session token store for worker re-entry.
    pub sessions: Arc<SessionStore>,
    /// Capability/tool permission gate.
    pub gate: PermissionGate,
    /// Worker launch defaults (image, TTL, timeout).
    pub worker_settings: WorkerSettings,
    /// Retry policy for collaborator API calls.
    pub retry: RetryConfig,
    /// How long a stage waits for a spawned worker to finish.
    pub worker_wait: Duration,
    /// Poll interval while waiting on a worker.
    pub worker_poll: Duration,
}

/// One unit of work in the orchestration graph.
///
/// A node receives a read-only view of the current state and returns a
/// sparse patch; it never writes the state store directly.
#[async_trait]
pub trait Node: Send + Sync {
    /// This node's name.
    fn name(&self) -> NodeName;

    /// Execute the stage.
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StatePatch, GraphError>;
}

/// Lookup from node name to implementation. The production set is
/// [`crate::stages::Stages`]; tests may substitute stubs.
pub trait NodeSet: Send + Sync {
    /// Resolve a node by name.
    fn node(&self, name: NodeName) -> &dyn Node;
}
