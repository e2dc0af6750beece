//! Transport representation of a conversation state.
//!
//! The client keeps the conversation between requests; every request carries
//! the full snapshot back. The wire shape is a flat JSON object:
//!
//! ```json
//! {
//!   "version": 1,
//!   "messages": [{"kind": "human", "content": "..."}],
//!   "router": "coordinate",
//!   "coordinator_instructions": "",
//!   "research_summary": "",
//!   "draft_text": "",
//!   "final_response": ""
//! }
//! ```
//!
//! `null` and `{}` decode to a fresh conversation. Unknown top-level keys
//! (for example the `"event"` key added by run events) are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ConversationState, Handoff, RoutingTag};
use crate::messages::{validate_history, Message};
use crate::utilities::errors::CodecError;

/// Current transport format version.
pub const TRANSPORT_VERSION: u32 = 1;

fn default_version() -> u32 {
    TRANSPORT_VERSION
}

/// Serializable snapshot of a [`ConversationState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub router: RoutingTag,
    #[serde(flatten)]
    pub handoff: Handoff,
}

impl From<&ConversationState> for TransportState {
    fn from(state: &ConversationState) -> Self {
        Self {
            version: TRANSPORT_VERSION,
            messages: state.messages().to_vec(),
            router: state.routing_tag(),
            handoff: state.handoff().clone(),
        }
    }
}

impl TryFrom<TransportState> for ConversationState {
    type Error = CodecError;

    fn try_from(transport: TransportState) -> Result<Self, Self::Error> {
        if transport.version != TRANSPORT_VERSION {
            return Err(CodecError::UnsupportedVersion {
                found: transport.version,
                supported: TRANSPORT_VERSION,
            });
        }
        validate_history(&transport.messages).map_err(|violation| CodecError::InvalidHistory {
            index: violation.index,
            reason: violation.reason,
        })?;
        Ok(ConversationState::from_parts(
            transport.messages,
            transport.router,
            transport.handoff,
        ))
    }
}

/// Encode a state into its transport JSON.
pub fn encode(state: &ConversationState) -> Value {
    // A struct of strings, enums and JSON maps always serializes.
    serde_json::to_value(TransportState::from(state)).unwrap_or(Value::Null)
}

/// Encode a state into a transport JSON string.
pub fn encode_string(state: &ConversationState) -> String {
    encode(state).to_string()
}

/// Decode a transport JSON value.
pub fn decode(payload: &Value) -> Result<ConversationState, CodecError> {
    match payload {
        Value::Null => Ok(ConversationState::new()),
        Value::Object(_) => {
            let transport = TransportState::deserialize(payload)?;
            ConversationState::try_from(transport)
        }
        other => Err(CodecError::NotAnObject {
            found: json_type_name(other).to_string(),
        }),
    }
}

/// Decode a transport JSON string.
pub fn decode_str(payload: &str) -> Result<ConversationState, CodecError> {
    let value: Value = serde_json::from_str(payload)?;
    decode(&value)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Stage;
    use crate::messages::CapabilityCall;
    use crate::state::HandoffField;
    use serde_json::json;

    fn busy_state() -> ConversationState {
        ConversationState::new()
            .with_message(Message::human("draft a two-sentence greeting"))
            .with_message(Message::agent("Research greetings"))
            .with_message(Message::agent_with_calls(
                "",
                vec![
                    CapabilityCall::single("web_search", "query", "greeting", "c1"),
                    CapabilityCall::single("google_scholar", "query", "greeting", "c2"),
                ],
            ))
            .with_message(Message::tool("c1", "web_search", "Hello\nsnippet\nhttps://x"))
            .with_message(Message::tool("c2", "google_scholar", "[]"))
            .with_message(Message::system("note"))
            .with_routing_tag(Stage::Research)
            .with_handoff(HandoffField::CoordinatorInstructions, "Research greetings")
    }

    #[test]
    fn test_round_trip_is_exact() {
        let state = busy_state();
        let decoded = decode(&encode(&state)).unwrap();
        assert_eq!(decoded, state);
        assert_eq!(encode(&decoded), encode(&state));

        let via_string = decode_str(&encode_string(&state)).unwrap();
        assert_eq!(via_string, state);
    }

    #[test]
    fn test_encoded_shape() {
        let json = encode(&busy_state());
        assert_eq!(json["version"], 1);
        assert_eq!(json["router"], "research");
        assert_eq!(json["coordinator_instructions"], "Research greetings");
        assert_eq!(json["draft_text"], "");
        assert_eq!(json["messages"][2]["capability_calls"][1]["call_id"], "c2");
    }

    #[test]
    fn test_null_and_empty_object_decode_fresh() {
        assert_eq!(decode(&Value::Null).unwrap(), ConversationState::new());
        assert_eq!(decode(&json!({})).unwrap(), ConversationState::new());
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let mut json = encode(&busy_state());
        json["event"] = json!("final");
        assert_eq!(decode(&json).unwrap(), busy_state());
    }

    #[test]
    fn test_rejects_non_object() {
        let err = decode(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, CodecError::NotAnObject { .. }));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_rejects_bad_router() {
        let err = decode(&json!({"router": "publish"})).unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let err = decode(&json!({"version": 2})).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnsupportedVersion { found: 2, supported: 1 }
        ));
    }

    #[test]
    fn test_rejects_orphan_tool_reply() {
        let payload = json!({
            "messages": [
                {"kind": "human", "content": "hi"},
                {"kind": "tool", "content": "x", "call_id": "c1", "name": "web_search"}
            ]
        });
        let err = decode(&payload).unwrap_err();
        assert!(matches!(err, CodecError::InvalidHistory { index: 1, .. }));
    }

    #[test]
    fn test_rejects_invalid_json_text() {
        assert!(matches!(decode_str("{not json"), Err(CodecError::Json(_))));
    }
}
