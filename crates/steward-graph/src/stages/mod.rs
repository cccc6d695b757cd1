//! Production stage implementations.
//!
//! Each stage is a zero-sized [`Node`] holding no state of its own; all
//! collaborators arrive through the [`StageContext`]. Stages publish lifecycle
//! events under the thread ID so dashboards can follow a run.

mod deploy_prep;
mod deployment;
mod failure_exit;
mod implementation;
mod intake;
mod planning;
mod remediation;
mod requirements;
pub mod testutil;

use crate::node::{Node, NodeName, NodeSet};

pub use deploy_prep::DeployPrep;
pub use deployment::Deployment;
pub use failure_exit::FailureExit;
pub use implementation::Implementation;
pub use intake::Intake;
pub use planning::Planning;
pub use remediation::Remediation;
pub use requirements::Requirements;

/// The full production node set.
#[derive(Default)]
pub struct Stages {
    intake: Intake,
    requirements: Requirements,
    planning: Planning,
    implementation: Implementation,
    deploy_prep: DeployPrep,
    deployment: Deployment,
    remediation: Remediation,
    failure_exit: FailureExit,
}

impl Stages {
    /// Construct the production node set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeSet for Stages {
    fn node(&self, name: NodeName) -> &dyn Node {
        match name {
            NodeName::Intake => &self.intake,
            NodeName::Requirements => &self.requirements,
            NodeName::Planning => &self.planning,
            NodeName::Implementation => &self.implementation,
            NodeName::DeployPrep => &self.deploy_prep,
            NodeName::Deployment => &self.deployment,
            NodeName::Remediation => &self.remediation,
            NodeName::FailureExit => &self.failure_exit,
        }
    }
}
