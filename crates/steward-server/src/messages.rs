//! Front-end wire messages.

use serde::{Deserialize, Serialize};

/// An inbound user message from the front-end adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Front-end user identifier; also keys the conversation thread.
    pub user_id: String,
    /// The user's message text.
    pub prompt: String,
    /// Event channel to publish the response under; defaults to the thread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_channel: Option<String>,
}

/// The outbound response delivered back to the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// The user this response belongs to.
    pub user_id: String,
    /// Response text.
    pub text: String,
    /// Whether the run is complete, or paused waiting on the user.
    pub is_final: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_deserializes_without_callback() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"userId":"u1","prompt":"build a thing"}"#).unwrap();
        assert_eq!(msg.user_id, "u1");
        assert!(msg.callback_channel.is_none());
    }

    #[test]
    fn outbound_serializes_camel_case() {
        let out = OutboundMessage {
            user_id: "u1".to_string(),
            text: "done".to_string(),
            is_final: true,
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["isFinal"], true);
    }
}
