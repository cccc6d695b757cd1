//! Implementation via a code-generation worker.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Value, json};
use steward_api::with_retry;
use steward_core::WorkerId;
use steward_core::events::{completed_event, failed_event, response_event, started_event};
use steward_state::{ChatMessage, MessageRole, ProjectSpec, StageStatus, StatePatch, WorkflowState};
use steward_workers::{AgentType, Capability, RunState, WorkerConfig};
use tracing::{info, instrument, warn};

use crate::errors::GraphError;
use crate::node::{Node, NodeName, StageContext};

/// Tool group guarding worker execution.
pub const EXECUTION_TOOL_GROUP: &str = "code-execution";

/// Run the build inside an isolated code-generation worker, then request
/// resource allocation for the result.
///
/// The worker gets a session token so a re-entrant run reuses its identity,
/// and is always torn down before the stage returns — success, failure, or
/// timeout. Allocation responses flagged `approvalRequired` mark the spec
/// blocked with the stated reason; blocked runs end without retrying, and
/// the reason is sent to the user as the final response.
#[derive(Default)]
pub struct Implementation;

fn apply_allocation(spec: &mut ProjectSpec, response: &Value) {
    if response["approvalRequired"].as_bool() == Some(true) {
        spec.status = Some(StageStatus::Blocked);
        spec.approval_reason = Some(
            response["reason"]
                .as_str()
                .unwrap_or("allocation requires approval")
                .to_string(),
        );
        return;
    }
    spec.status = Some(StageStatus::Done);
    spec.allocated_resources = response["resources"]
        .as_object()
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_else(BTreeMap::new);
}

#[async_trait]
impl Node for Implementation {
    fn name(&self) -> NodeName {
        NodeName::Implementation
    }

    #[instrument(skip_all, fields(thread_id = %state.thread_id))]
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StatePatch, GraphError> {
        ctx.gate
            .check(EXECUTION_TOOL_GROUP)
            .map_err(|e| GraphError::stage(self.name(), e))?;
        let mut spec = state
            .project_spec
            .clone()
            .ok_or_else(|| GraphError::stage(self.name(), "no project spec captured"))?;
        let project = state
            .current_project
            .clone()
            .ok_or_else(|| GraphError::stage(self.name(), "no registered project"))?;

        let worker_id = WorkerId::generate();
        let token = ctx
            .sessions
            .get_or_create(worker_id.as_str())
            .map_err(|e| GraphError::stage(self.name(), e))?;

        let mut config = WorkerConfig::new(
            format!("impl-{worker_id}"),
            AgentType::CodeGeneration,
        )
        .with_capability(Capability::VersionControl)
        .with_capability(Capability::GitAuth)
        .with_capability(Capability::InterpreterRuntime)
        .with_capability(Capability::NetworkFetch)
        .with_env("STEWARD_SESSION_TOKEN", token)
        .with_env("STEWARD_PROJECT_ID", project.id.clone())
        .with_internet();
        config.allowed_tools = vec![EXECUTION_TOOL_GROUP.to_string()];
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

        if run_state != RunState::Completed {
            let reason = format!("worker ended in state {run_state:?}");
            ctx.events
                .publish(failed_event(worker_id.as_str(), &reason));
            return Err(GraphError::stage(self.name(), reason));
        }
        ctx.events.publish(completed_event(
            worker_id.as_str(),
            json!({ "projectId": project.id }),
        ));
        info!(worker_id = %worker_id, "build completed");

        let request = json!({
            "projectId": project.id,
            "complexity": spec.complexity,
        });
        let response = with_retry(ctx.retry, || {
            ctx.api.allocate_resources(&project.id, &request)
        })
        .await
        .map_err(|e| GraphError::stage(self.name(), e))?;
        apply_allocation(&mut spec, &response);

        // Blocked and done-with-nothing-allocated both terminate here without
        // a deployment stage, so the user-visible answer is sent now.
        let text = terminal_response(&project.name, &spec);
        let mut patch = StatePatch::none().with_spec(spec);
        if let Some(text) = text {
            ctx.events
                .publish(response_event(state.thread_id.as_str(), &text, true));
            patch = patch
                .with_message(ChatMessage::new(MessageRole::Assistant, text))
                .with_awaiting_user(false);
        }
        Ok(patch)
    }
}

/// Final answer for outcomes that end the run at this stage. Runs that
/// continue to deployment answer there instead.
fn terminal_response(project_name: &str, spec: &ProjectSpec) -> Option<String> {
    match spec.status {
        Some(StageStatus::Blocked) => Some(format!(
            "Work on {project_name} is blocked pending approval: {}",
            spec.approval_reason
                .as_deref()
                .unwrap_or("allocation requires approval")
        )),
        Some(StageStatus::Done) if spec.allocated_resources.is_empty() => Some(format!(
            "The build for {project_name} completed, but no resources were allocated, so nothing was deployed."
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_required_blocks_with_reason() {
        let mut spec = ProjectSpec::default();
        apply_allocation(
            &mut spec,
            &json!({ "approvalRequired": true, "reason": "over budget" }),
        );
        assert_eq!(spec.status, Some(StageStatus::Blocked));
        assert_eq!(spec.approval_reason.as_deref(), Some("over budget"));
        assert!(spec.allocated_resources.is_empty());
    }

    #[test]
    fn granted_allocation_records_resources() {
        let mut spec = ProjectSpec::default();
        apply_allocation(
            &mut spec,
            &json!({ "resources": { "cpu": 2, "bucket": "b-1" } }),
        );
        assert_eq!(spec.status, Some(StageStatus::Done));
        assert_eq!(spec.allocated_resources["cpu"], json!(2));
        assert_eq!(spec.allocated_resources.len(), 2);
    }

    #[test]
    fn empty_allocation_is_done_with_nothing_to_deploy() {
        let mut spec = ProjectSpec::default();
        apply_allocation(&mut spec, &json!({}));
        assert_eq!(spec.status, Some(StageStatus::Done));
        assert!(spec.allocated_resources.is_empty());
    }

    #[test]
    fn blocked_outcome_answers_with_the_reason() {
        let mut spec = ProjectSpec::default();
        apply_allocation(
            &mut spec,
            &json!({ "approvalRequired": true, "reason": "over budget" }),
        );
        let text = terminal_response("todo-app", &spec).unwrap();
        assert!(text.contains("over budget"));
        assert!(text.contains("todo-app"));
    }

    #[test]
    fn done_with_nothing_allocated_answers_too() {
        let mut spec = ProjectSpec::default();
        apply_allocation(&mut spec, &json!({}));
        let text = terminal_response("todo-app", &spec).unwrap();
        assert!(text.contains("nothing was deployed"));
    }

    #[test]
    fn done_with_resources_defers_the_answer_to_deployment() {
        let mut spec = ProjectSpec::default();
        apply_allocation(&mut spec, &json!({ "resources": { "cpu": 2 } }));
        assert_eq!(terminal_response("todo-app", &spec), None);
    }
}
