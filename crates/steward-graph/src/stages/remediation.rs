//! Infrastructure remediation and provisioning.

use async_trait::async_trait;
use serde_json::json;
use steward_api::with_retry;
use steward_core::WorkerId;
use steward_core::events::{failed_event, response_event, started_event};
use steward_state::{ChatMessage, MessageRole, StatePatch, WorkflowState};
use steward_workers::{AgentType, Capability, RunState, WorkerConfig};
use tracing::{info, instrument, warn};

use crate::errors::GraphError;
use crate::node::{Node, NodeName, StageContext};

/// Tool group guarding infrastructure changes.
pub const INFRA_TOOL_GROUP: &str = "infrastructure";

/// Handle deploy/provision requests and incidents with an infra worker.
///
/// The incident is filed with the persistence API whether or not the worker
/// succeeded, with the outcome recorded on it. A failed worker still fails
/// the stage afterwards.
#[derive(Default)]
pub struct Remediation;

#[async_trait]
impl Node for Remediation {
    fn name(&self) -> NodeName {
        NodeName::Remediation
    }

    #[instrument(skip_all, fields(thread_id = %state.thread_id))]
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StatePatch, GraphError> {
        ctx.gate
            .check(INFRA_TOOL_GROUP)
            .map_err(|e| GraphError::stage(self.name(), e))?;
        let description = state
            .project_intent
            .as_ref()
            .map(|i| i.description.clone())
            .or_else(|| state.last_user_message().map(|m| m.content.clone()))
            .unwrap_or_default();

        let worker_id = WorkerId::generate();
        let token = ctx
            .sessions
            .get_or_create(worker_id.as_str())
            .map_err(|e| GraphError::stage(self.name(), e))?;

        let mut config = WorkerConfig::new(format!("infra-{worker_id}"), AgentType::Infra)
            .with_capability(Capability::VersionControl)
            .with_capability(Capability::NestedIsolation)
            .with_env("STEWARD_SESSION_TOKEN", token)
            .with_internet();
        config.allowed_tools = vec![INFRA_TOOL_GROUP.to_string()];
        config.ttl_hours = ctx.worker_settings.default_ttl_hours;
        config.timeout_minutes = ctx.worker_settings.default_timeout_minutes;

        ctx.events.publish(started_event(worker_id.as_str()));
        let _handle = ctx
            .workers
            .create_worker(worker_id.clone(), &ctx.worker_settings.image, config)
            .await
            .map_err(|e| GraphError::stage(self.name(), e))?;

        let outcome = ctx
            .workers
            .wait_for_terminal(&worker_id, ctx.worker_wait, ctx.worker_poll)
            .await;
        if let Err(e) = ctx.workers.delete_worker(&worker_id).await {
            warn!(worker_id = %worker_id, error = %e, "worker teardown failed");
        }
        let run_state = outcome.map_err(|e| GraphError::stage(self.name(), e))?;
        let resolved = run_state == RunState::Completed;

        let incident = json!({
            "description": description,
            "resolved": resolved,
            "correlationId": state.correlation_id,
        });
        let _ = with_retry(ctx.retry, || ctx.api.record_incident(&incident))
            .await
            .map_err(|e| GraphError::stage(self.name(), e))?;

        if !resolved {
            let reason = format!("infra worker ended in state {run_state:?}");
            ctx.events
                .publish(failed_event(worker_id.as_str(), &reason));
            return Err(GraphError::stage(self.name(), reason));
        }
        info!(worker_id = %worker_id, "remediation completed");

        let text = "Infrastructure work completed and the incident was recorded.".to_string();
        ctx.events
            .publish(response_event(state.thread_id.as_str(), &text, true));
        Ok(StatePatch::none()
            .with_message(ChatMessage::new(MessageRole::Assistant, text))
            .with_awaiting_user(false))
    }
}
