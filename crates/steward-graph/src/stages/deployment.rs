//! Deployment recording.

use async_trait::async_trait;
use serde_json::json;
use steward_api::with_retry;
use steward_core::events::response_event;
use steward_state::{ChatMessage, MessageRole, StatePatch, WorkflowState};
use tracing::{info, instrument};

use crate::errors::GraphError;
use crate::node::{Node, NodeName, StageContext};

/// Record the deployment with the persistence API and send the final
/// user-visible response.
#[derive(Default)]
pub struct Deployment;

#[async_trait]
impl Node for Deployment {
    fn name(&self) -> NodeName {
        NodeName::Deployment
    }

    #[instrument(skip_all, fields(thread_id = %state.thread_id))]
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StatePatch, GraphError> {
        let project = state
            .current_project
            .clone()
            .ok_or_else(|| GraphError::stage(self.name(), "no registered project"))?;
        let resources = state
            .project_spec
            .as_ref()
            .map(|s| s.allocated_resources.clone())
            .unwrap_or_default();

        let payload = json!({
            "resources": resources,
            "correlationId": state.correlation_id,
        });
        let recorded = with_retry(ctx.retry, || {
            ctx.api.create_deployment(&project.id, &payload)
        })
        .await
        .map_err(|e| GraphError::stage(self.name(), e))?;
        let deployment_id = recorded["id"].as_str().unwrap_or("unknown").to_string();
        info!(deployment_id = %deployment_id, project_id = %project.id, "deployment recorded");

        let text = format!("Deployed {} (deployment {deployment_id}).", project.name);
        ctx.events
            .publish(response_event(state.thread_id.as_str(), &text, true));
        Ok(StatePatch::none()
            .with_message(ChatMessage::new(MessageRole::Assistant, text))
            .with_awaiting_user(false))
    }
}
