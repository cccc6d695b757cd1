//! Lightweight deployment preparation (simple path).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;
use steward_api::with_retry;
use steward_core::events::progress_event;
use steward_state::{StageStatus, StatePatch, WorkflowState};
use tracing::{info, instrument};

use crate::errors::GraphError;
use crate::node::{Node, NodeName, StageContext};

/// Prepare a simple project for deployment without spawning a worker.
///
/// Requests a lightweight allocation tier and marks the spec done; the
/// deployment stage always follows.
#[derive(Default)]
pub struct DeployPrep;

#[async_trait]
impl Node for DeployPrep {
    fn name(&self) -> NodeName {
        NodeName::DeployPrep
    }

    #[instrument(skip_all, fields(thread_id = %state.thread_id))]
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StatePatch, GraphError> {
        let mut spec = state
            .project_spec
            .clone()
            .ok_or_else(|| GraphError::stage(self.name(), "no project spec captured"))?;
        let project = state
            .current_project
            .clone()
            .ok_or_else(|| GraphError::stage(self.name(), "no registered project"))?;

        let request = json!({ "projectId": project.id, "tier": "lightweight" });
        let response = with_retry(ctx.retry, || {
            ctx.api.allocate_resources(&project.id, &request)
        })
        .await
        .map_err(|e| GraphError::stage(self.name(), e))?;

        spec.status = Some(StageStatus::Done);
        spec.allocated_resources = response["resources"]
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_else(BTreeMap::new);
        info!(resources = spec.allocated_resources.len(), "deploy prep complete");

        ctx.events.publish(progress_event(
            state.thread_id.as_str(),
            &format!("prepared deployment for {}", project.name),
        ));
        Ok(StatePatch::none().with_spec(spec))
    }
}
