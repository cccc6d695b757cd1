//! Workflow state model types.
//!
//! All serializable types use `camelCase` for wire compatibility with the
//! front-end and dashboard.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use steward_core::{CorrelationId, ThreadId};

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Inbound user message.
    User,
    /// Outbound assistant message.
    Assistant,
    /// Injected system context.
    System,
}

/// One conversation message. Appended, never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message author.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl ChatMessage {
    /// Build a message stamped with the current time.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Classified user intent kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    /// Build a new project or feature.
    Build,
    /// Deploy or provision infrastructure.
    Deploy,
    /// Report or remediate an incident.
    Incident,
    /// Informational question, no workflow work.
    Question,
}

/// A pending user request, as classified by the intake stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIntent {
    /// Classified intent kind.
    pub kind: IntentKind,
    /// The user's request, verbatim.
    pub description: String,
}

/// Planning-stage complexity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Lightweight path: skip implementation, go straight to deploy prep.
    Simple,
    /// Full path through the implementation stage.
    Complex,
}

/// Implementation-stage outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Still being worked on.
    InProgress,
    /// Finished successfully.
    Done,
    /// Waiting on human approval; never silently retried.
    Blocked,
}

/// Reference to a project held by the persistence API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
    /// Persistence-API project ID.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Structured project specification accumulated across stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSpec {
    /// Project name.
    pub name: String,
    /// One-paragraph summary.
    pub summary: String,
    /// Captured requirement lines.
    pub requirements: Vec<String>,
    /// Planning classification; `None` until the planning stage runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    /// Implementation outcome; `None` until the implementation stage runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StageStatus>,
    /// Resources allocated for deployment, keyed by resource name.
    pub allocated_resources: BTreeMap<String, Value>,
    /// Why the run is blocked, when `status == Blocked`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_reason: Option<String>,
}

/// One conversation thread's mutable workflow state.
///
/// Exactly one `WorkflowState` is live per thread at a time; all mutation
/// goes through [`WorkflowState::apply`] under the store's per-thread lock.
/// States are never deleted automatically — they are retained for
/// resumption until an explicit close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    /// Stable thread key.
    pub thread_id: ThreadId,
    /// Front-end chat identifier.
    pub chat_id: String,
    /// Front-end user identifier.
    pub user_id: String,
    /// Opaque tracing token for this run.
    pub correlation_id: CorrelationId,
    /// Append-only conversation log, completion order.
    pub messages: Vec<ChatMessage>,
    /// Project under discussion, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_project: Option<ProjectRef>,
    /// Accumulated project specification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_spec: Option<ProjectSpec>,
    /// The pending classified request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_intent: Option<ProjectIntent>,
    /// Capability tags active for this thread (set-union merged).
    pub capabilities: BTreeSet<String>,
    /// Whether the thread is paused waiting for the user.
    pub awaiting_user_response: bool,
    /// Passes through graph decision points; the engine forces termination
    /// at the configured cap.
    pub iteration_count: u32,
    /// Whether this run resumes a prior conversation.
    pub is_continuation: bool,
    /// Ordered error accumulator (append-only, no dedup).
    pub errors: Vec<String>,
}

impl WorkflowState {
    /// Fresh state for a thread's first message.
    #[must_use]
    pub fn new(thread_id: ThreadId, chat_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            thread_id,
            chat_id: chat_id.into(),
            user_id: user_id.into(),
            correlation_id: CorrelationId::generate(),
            messages: Vec::new(),
            current_project: None,
            project_spec: None,
            project_intent: None,
            capabilities: BTreeSet::new(),
            awaiting_user_response: false,
            iteration_count: 0,
            is_continuation: false,
            errors: Vec::new(),
        }
    }

    /// Latest user message, if any.
    #[must_use]
    pub fn last_user_message(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_core::ThreadId;

    #[test]
    fn new_state_is_empty() {
        let state = WorkflowState::new(ThreadId::from_string("t1"), "c1", "u1");
        assert!(state.messages.is_empty());
        assert!(state.capabilities.is_empty());
        assert_eq!(state.iteration_count, 0);
        assert!(!state.is_continuation);
    }

    #[test]
    fn last_user_message_skips_assistant() {
        let mut state = WorkflowState::new(ThreadId::from_string("t1"), "c1", "u1");
        state.messages.push(ChatMessage::new(MessageRole::User, "hi"));
        state
            .messages
            .push(ChatMessage::new(MessageRole::Assistant, "hello"));
        assert_eq!(state.last_user_message().unwrap().content, "hi");
    }

    #[test]
    fn spec_serializes_camel_case() {
        let spec = ProjectSpec {
            complexity: Some(Complexity::Simple),
            status: Some(StageStatus::Done),
            ..ProjectSpec::default()
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["complexity"], "simple");
        assert_eq!(json["status"], "done");
        assert!(json["allocatedResources"].is_object());
    }
}
