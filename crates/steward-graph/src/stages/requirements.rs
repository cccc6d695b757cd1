//! Requirements capture.

use async_trait::async_trait;
use steward_state::{ChatMessage, MessageRole, ProjectSpec, StatePatch, WorkflowState};
use tracing::{debug, instrument};

use crate::errors::GraphError;
use crate::node::{Node, NodeName, StageContext};

/// Descriptions shorter than this are too thin to plan against.
const MIN_DESCRIPTION_WORDS: usize = 4;

const CLARIFY_PROMPT: &str = "I need a bit more detail before I can plan this \
project. What should it do, and who is it for?";

/// Turn the classified request into a structured [`ProjectSpec`].
///
/// A description too thin to work with pauses the run instead of guessing:
/// the patch sets `awaiting_user_response` and routing ends the run until the
/// user replies.
#[derive(Default)]
pub struct Requirements;

fn derive_name(description: &str) -> String {
    let slug: Vec<String> = description
        .split_whitespace()
        .take(5)
        .map(|w| {
            w.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();
    if slug.is_empty() {
        "untitled-project".to_string()
    } else {
        slug.join("-")
    }
}

fn split_requirements(description: &str) -> Vec<String> {
    description
        .split(['.', ';', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Node for Requirements {
    fn name(&self) -> NodeName {
        NodeName::Requirements
    }

    #[instrument(skip_all, fields(thread_id = %state.thread_id))]
    async fn run(
        &self,
        state: &WorkflowState,
        _ctx: &StageContext,
    ) -> Result<StatePatch, GraphError> {
        let description = state
            .project_intent
            .as_ref()
            .map(|i| i.description.clone())
            .or_else(|| state.last_user_message().map(|m| m.content.clone()))
            .unwrap_or_default();

        if description.split_whitespace().count() < MIN_DESCRIPTION_WORDS {
            debug!("description too thin, pausing for clarification");
            return Ok(StatePatch::none()
                .with_awaiting_user(true)
                .with_message(ChatMessage::new(MessageRole::Assistant, CLARIFY_PROMPT)));
        }

        let spec = ProjectSpec {
            name: derive_name(&description),
            summary: description.clone(),
            requirements: split_requirements(&description),
            ..ProjectSpec::default()
        };
        debug!(name = %spec.name, requirements = spec.requirements.len(), "captured spec");
        Ok(StatePatch::none().with_spec(spec).with_awaiting_user(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_slugified_from_leading_words() {
        assert_eq!(
            derive_name("Build a todo app with auth and sync"),
            "build-a-todo-app-with"
        );
        assert_eq!(derive_name("  "), "untitled-project");
    }

    #[test]
    fn requirements_split_on_sentence_boundaries() {
        let reqs = split_requirements("Store tasks. Sync across devices; offline first.");
        assert_eq!(
            reqs,
            vec!["Store tasks", "Sync across devices", "offline first"]
        );
    }
}
