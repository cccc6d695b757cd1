//! Designated error-handling exit.

use async_trait::async_trait;
use steward_core::events::{failed_event, response_event};
use steward_state::{ChatMessage, MessageRole, StatePatch, WorkflowState};
use tracing::{instrument, warn};

use crate::errors::GraphError;
use crate::node::{Node, NodeName, StageContext};

/// Surface the failure to the user and close the run.
///
/// This stage is intentionally infallible in practice: it only publishes
/// events and builds a patch, so the engine's route-to-failure-exit edge
/// cannot loop.
#[derive(Default)]
pub struct FailureExit;

#[async_trait]
impl Node for FailureExit {
    fn name(&self) -> NodeName {
        NodeName::FailureExit
    }

    #[instrument(skip_all, fields(thread_id = %state.thread_id))]
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StatePatch, GraphError> {
        let reason = state
            .errors
            .last()
            .cloned()
            .unwrap_or_else(|| "unknown error".to_string());
        warn!(reason = %reason, "run ending at failure exit");

        ctx.events
            .publish(failed_event(state.thread_id.as_str(), &reason));
        let text = format!("The run could not be completed: {reason}");
        ctx.events
            .publish(response_event(state.thread_id.as_str(), &text, true));
        Ok(StatePatch::none()
            .with_message(ChatMessage::new(MessageRole::Assistant, text))
            .with_awaiting_user(false))
    }
}
