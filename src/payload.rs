//! The payload a Copilot extension receives once a request has been verified.
use serde::{Deserialize, Serialize};

/// Body of an agent request sent by the Copilot platform.
///
/// Only the message list is interpreted. Everything else is kept so it can
/// be inspected or logged without losing fields we don't model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopilotPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copilot_thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default)]
    pub messages: Vec<CopilotMessage>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single turn of the conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopilotMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub copilot_references: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copilot_confirmations: Option<Vec<serde_json::Value>>,
}

/// The message the user just typed: the content of the last turn.
///
/// An empty conversation yields an empty string.
pub fn get_user_message(payload: &CopilotPayload) -> &str {
    payload
        .messages
        .last()
        .map(|message| message.content.as_str())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_message_is_last_turn() {
        let payload: CopilotPayload = serde_json::from_value(json!({
            "copilot_thread_id": "thread-1",
            "messages": [
                {"role": "user", "content": "Hi"},
                {"role": "assistant", "content": "Hello!"},
                {"role": "user", "content": "What is the capital of France?"}
            ]
        }))
        .unwrap();

        assert_eq!(get_user_message(&payload), "What is the capital of France?");
        assert_eq!(payload.copilot_thread_id.as_deref(), Some("thread-1"));
    }

    #[test]
    fn test_empty_conversation_yields_empty_message() {
        let payload: CopilotPayload = serde_json::from_value(json!({})).unwrap();
        assert_eq!(get_user_message(&payload), "");
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let payload: CopilotPayload = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hey", "copilot_references": [{"type": "file"}]}],
            "agent": "my-agent",
            "tools": []
        }))
        .unwrap();

        assert_eq!(payload.agent.as_deref(), Some("my-agent"));
        assert_eq!(payload.messages[0].copilot_references.len(), 1);
        assert_eq!(payload.extra.get("tools"), Some(&json!([])));
    }
}
