//! Realtime event model
//!
//! Events on both legs of the relay are JSON objects discriminated by a
//! `type` field. The relay treats almost all of them opaquely; this module
//! names the types the gateway inspects and provides the small set of
//! gateway-originated messages.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Event type strings the gateway recognizes on the upstream leg.
pub mod types {
    pub const SESSION_CREATED: &str = "session.created";
    pub const SESSION_UPDATED: &str = "session.updated";
    pub const SPEECH_STARTED: &str = "input_audio_buffer.speech_started";
    pub const SPEECH_STOPPED: &str = "input_audio_buffer.speech_stopped";
    pub const AUDIO_APPEND: &str = "input_audio_buffer.append";
    pub const ITEM_CREATED: &str = "conversation.item.created";
    pub const AUDIO_DELTA: &str = "response.audio.delta";
    pub const TRANSCRIPT_DELTA: &str = "response.audio_transcript.delta";
    pub const TRANSCRIPT_DONE: &str = "response.audio_transcript.done";
    pub const FUNCTION_CALL_DONE: &str = "response.function_call_arguments.done";
    pub const RESPONSE_DONE: &str = "response.done";
    pub const ERROR: &str = "error";
    /// Gateway-originated event to the browser announcing a persona change.
    pub const AGENT_HANDOFF: &str = "agent.handoff";
}

/// Extract the `type` discriminant of a parsed event.
pub fn event_type(event: &Value) -> Option<&str> {
    event.get("type").and_then(Value::as_str)
}

/// A completed tool invocation emitted by the upstream model.
///
/// Parsed out of `response.function_call_arguments.done`; the `arguments`
/// field arrives as a JSON-encoded string and is kept that way until the
/// tool layer validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallEvent {
    pub call_id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallEvent {
    /// Parse a tool call out of an upstream event, if it is one.
    pub fn from_event(event: &Value) -> Option<Self> {
        if event_type(event)? != types::FUNCTION_CALL_DONE {
            return None;
        }
        Some(Self {
            call_id: event.get("call_id")?.as_str()?.to_string(),
            name: event.get("name")?.as_str()?.to_string(),
            arguments: event
                .get("arguments")
                .and_then(Value::as_str)
                .unwrap_or("{}")
                .to_string(),
        })
    }
}

/// Build the `conversation.item.create` message that injects a tool result
/// into the upstream conversation.
pub fn function_call_output(call_id: &str, output: &str) -> Value {
    json!({
        "type": "conversation.item.create",
        "item": {
            "type": "function_call_output",
            "call_id": call_id,
            "output": output,
        }
    })
}

/// Build the `response.create` trigger that follows a tool output.
pub fn response_create() -> Value {
    json!({ "type": "response.create" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type() {
        let ev = json!({"type": "session.created", "session": {}});
        assert_eq!(event_type(&ev), Some(types::SESSION_CREATED));
        assert_eq!(event_type(&json!({"no_type": 1})), None);
    }

    #[test]
    fn test_tool_call_parse() {
        let ev = json!({
            "type": "response.function_call_arguments.done",
            "call_id": "c1",
            "name": "search_knowledge_base",
            "arguments": "{\"query\":\"freeze card\"}",
        });
        let call = ToolCallEvent::from_event(&ev).unwrap();
        assert_eq!(call.call_id, "c1");
        assert_eq!(call.name, "search_knowledge_base");
        assert!(call.arguments.contains("freeze card"));
    }

    #[test]
    fn test_tool_call_parse_rejects_other_types() {
        let ev = json!({"type": "response.done", "call_id": "c1", "name": "x"});
        assert!(ToolCallEvent::from_event(&ev).is_none());
    }

    #[test]
    fn test_tool_call_missing_arguments_defaults_empty_object() {
        let ev = json!({
            "type": "response.function_call_arguments.done",
            "call_id": "c2",
            "name": "get_account_balance",
        });
        let call = ToolCallEvent::from_event(&ev).unwrap();
        assert_eq!(call.arguments, "{}");
    }

    #[test]
    fn test_function_call_output_shape() {
        let msg = function_call_output("c9", "balance: 100");
        assert_eq!(event_type(&msg), Some("conversation.item.create"));
        assert_eq!(msg["item"]["type"], "function_call_output");
        assert_eq!(msg["item"]["call_id"], "c9");
        assert_eq!(msg["item"]["output"], "balance: 100");
    }
}
