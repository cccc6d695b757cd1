//! Lifecycle event vocabulary.
//!
//! An [`AgentEvent`] is an immutable fact published once: it is never mutated
//! or retracted after publication. Base fields live at the top level and the
//! `payload` is opaque [`serde_json::Value`], matching the wire format the
//! front-end and dashboard consume (camelCase).
//!
//! Ordering is per-agent delivery order only; there is no global total order
//! across agents.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event type discriminator.
///
/// The serialized form doubles as the channel-name suffix, so the `type`
/// field of a payload always matches the channel it was published on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Worker or stage began executing.
    Started,
    /// Intermediate progress report.
    Progress,
    /// Work finished successfully.
    Completed,
    /// Work failed terminally.
    Failed,
    /// User-visible response text.
    Response,
    /// Run-state snapshot.
    Status,
    /// Free-form message.
    Message,
}

impl EventKind {
    /// Channel-suffix string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Progress => "progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Response => "response",
            Self::Status => "status",
            Self::Message => "message",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable lifecycle event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    /// The agent (worker or stage) this event belongs to.
    pub agent_id: String,
    /// Event type discriminator.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Event-specific data (opaque JSON).
    pub payload: Value,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl AgentEvent {
    /// Build an event stamped with the current time.
    #[must_use]
    pub fn new(agent_id: impl Into<String>, kind: EventKind, payload: Value) -> Self {
        Self {
            agent_id: agent_id.into(),
            kind,
            payload,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Compose the channel name for an event: `{prefix}:{agent_id}:{kind}`.
#[must_use]
pub fn channel_name(prefix: &str, agent_id: &str, kind: EventKind) -> String {
    format!("{prefix}:{agent_id}:{}", kind.as_str())
}

/// A `started` event for an agent.
#[must_use]
pub fn started_event(agent_id: &str) -> AgentEvent {
    AgentEvent::new(agent_id, EventKind::Started, Value::Null)
}

/// A `progress` event carrying a human-readable note.
#[must_use]
pub fn progress_event(agent_id: &str, note: &str) -> AgentEvent {
    AgentEvent::new(
        agent_id,
        EventKind::Progress,
        serde_json::json!({ "type": "progress", "note": note }),
    )
}

/// A `completed` event with an arbitrary result payload.
#[must_use]
pub fn completed_event(agent_id: &str, result: Value) -> AgentEvent {
    AgentEvent::new(agent_id, EventKind::Completed, result)
}

/// A `failed` event carrying a human-readable reason.
#[must_use]
pub fn failed_event(agent_id: &str, reason: &str) -> AgentEvent {
    AgentEvent::new(
        agent_id,
        EventKind::Failed,
        serde_json::json!({ "type": "failed", "reason": reason }),
    )
}

/// A `response` event carrying user-visible text.
#[must_use]
pub fn response_event(agent_id: &str, text: &str, is_final: bool) -> AgentEvent {
    AgentEvent::new(
        agent_id,
        EventKind::Response,
        serde_json::json!({ "type": "response", "text": text, "isFinal": is_final }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_follows_convention() {
        assert_eq!(
            channel_name("steward", "worker-1", EventKind::Response),
            "steward:worker-1:response"
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&EventKind::Started).unwrap();
        assert_eq!(json, "\"started\"");
    }

    #[test]
    fn event_serializes_camel_case_with_type_tag() {
        let event = response_event("a1", "done", true);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["agentId"], "a1");
        assert_eq!(json["type"], "response");
        assert_eq!(json["payload"]["isFinal"], true);
    }

    #[test]
    fn payload_type_tag_matches_channel_suffix() {
        let event = failed_event("a1", "boom");
        assert_eq!(
            event.payload["type"].as_str().unwrap(),
            event.kind.as_str()
        );
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let event = started_event("a1");
        assert!(chrono::DateTime::parse_from_rfc3339(&event.timestamp).is_ok());
    }
}
