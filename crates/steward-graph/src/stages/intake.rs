//! Request classification.

use async_trait::async_trait;
use steward_core::events::response_event;
use steward_state::{ChatMessage, IntentKind, MessageRole, ProjectIntent, StatePatch, WorkflowState};
use tracing::{debug, instrument};

use crate::errors::GraphError;
use crate::node::{Node, NodeName, StageContext};

const QUESTION_ANSWER: &str = "I orchestrate project work: ask me to build \
something, deploy or provision infrastructure, or report an incident.";

/// Classify the latest user message into a [`ProjectIntent`].
///
/// Classification is keyword-based and deterministic. Incident phrasing wins
/// over deploy phrasing ("the deploy is down" is an incident), and anything
/// unrecognized is treated as a build request so it flows into requirements
/// capture rather than being dropped.
#[derive(Default)]
pub struct Intake;

fn classify(text: &str) -> IntentKind {
    let lower = text.to_lowercase();
    if ["incident", "outage", "is down", "crashed", "broken"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        return IntentKind::Incident;
    }
    if ["deploy", "provision", "rollout", "roll out", "release"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        return IntentKind::Deploy;
    }
    if lower.trim_end().ends_with('?') {
        return IntentKind::Question;
    }
    IntentKind::Build
}

#[async_trait]
impl Node for Intake {
    fn name(&self) -> NodeName {
        NodeName::Intake
    }

    #[instrument(skip_all, fields(thread_id = %state.thread_id))]
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StatePatch, GraphError> {
        let description = state
            .last_user_message()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let kind = classify(&description);
        debug!(?kind, "classified request");

        let mut patch = StatePatch::none().with_intent(ProjectIntent { kind, description });
        if kind == IntentKind::Question {
            ctx.events
                .publish(response_event(state.thread_id.as_str(), QUESTION_ANSWER, true));
            patch = patch.with_message(ChatMessage::new(MessageRole::Assistant, QUESTION_ANSWER));
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_phrasing_classifies_as_deploy() {
        assert_eq!(classify("please deploy the api to staging"), IntentKind::Deploy);
        assert_eq!(classify("Provision a new database"), IntentKind::Deploy);
        assert_eq!(classify("roll out v2"), IntentKind::Deploy);
    }

    #[test]
    fn incident_phrasing_wins_over_deploy() {
        assert_eq!(classify("the deploy is down"), IntentKind::Incident);
        assert_eq!(classify("we have an outage"), IntentKind::Incident);
    }

    #[test]
    fn question_mark_classifies_as_question() {
        assert_eq!(classify("what can you do?"), IntentKind::Question);
    }

    #[test]
    fn everything_else_is_a_build() {
        assert_eq!(classify("build me a todo app"), IntentKind::Build);
        assert_eq!(classify(""), IntentKind::Build);
    }
}
