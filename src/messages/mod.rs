//! Conversation message model.
//!
//! A conversation is an append-only log of typed entries. The variant is the
//! discriminant the router switches on, so there is no runtime type
//! inspection anywhere in the engine: an Agent reply is an Agent reply
//! because it is `Message::Agent`, not because it happens to carry calls.
//!
//! Messages have no identity of their own. Two messages are "the same entry"
//! only if they sit at the same position of the same log; `PartialEq`
//! compares content and exists for snapshot comparisons.

pub mod capability_call;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use capability_call::{generate_call_id, normalize_call_ids, CapabilityCall};

/// Discriminant of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Human,
    Agent,
    Tool,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Human => "human",
            MessageKind::Agent => "agent",
            MessageKind::Tool => "tool",
            MessageKind::System => "system",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the conversation log.
///
/// Every field of every variant is always serialized; an Agent message with
/// no calls carries `"capability_calls": []`, and decoding an Agent message
/// without that field fails instead of guessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    /// Input typed by the user.
    Human { content: String },
    /// A stage reply, optionally requesting capability invocations.
    Agent {
        content: String,
        capability_calls: Vec<CapabilityCall>,
    },
    /// The result of one capability call.
    Tool {
        content: String,
        /// The `call_id` of the capability call this message answers.
        call_id: String,
        /// Name of the capability that produced the content.
        name: String,
    },
    /// Out-of-band instructions.
    System { content: String },
}

impl Message {
    /// Create a human message.
    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a plain agent message with no capability calls.
    pub fn agent(content: impl Into<String>) -> Self {
        Message::Agent {
            content: content.into(),
            capability_calls: Vec::new(),
        }
    }

    /// Create an agent message carrying capability calls.
    pub fn agent_with_calls(content: impl Into<String>, calls: Vec<CapabilityCall>) -> Self {
        Message::Agent {
            content: content.into(),
            capability_calls: calls,
        }
    }

    /// Create a tool message answering `call_id`.
    pub fn tool(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::Tool {
            content: content.into(),
            call_id: call_id.into(),
            name: name.into(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Human { .. } => MessageKind::Human,
            Message::Agent { .. } => MessageKind::Agent,
            Message::Tool { .. } => MessageKind::Tool,
            Message::System { .. } => MessageKind::System,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::Human { content }
            | Message::Agent { content, .. }
            | Message::Tool { content, .. }
            | Message::System { content } => content,
        }
    }

    /// Capability calls carried by this message (empty unless Agent).
    pub fn capability_calls(&self) -> &[CapabilityCall] {
        match self {
            Message::Agent {
                capability_calls, ..
            } => capability_calls,
            _ => &[],
        }
    }

    /// The answered call id (only for Tool messages).
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Message::Tool { call_id, .. } => Some(call_id),
            _ => None,
        }
    }

    pub fn is_tool(&self) -> bool {
        matches!(self, Message::Tool { .. })
    }

    /// Whether this is an Agent message with at least one capability call.
    pub fn requests_capabilities(&self) -> bool {
        !self.capability_calls().is_empty()
    }
}

/// A history entry that breaks the call/reply pairing rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryViolation {
    /// Position of the offending message.
    pub index: usize,
    pub reason: String,
}

/// Check the call/reply pairing of a message log.
///
/// Every Tool message must answer a call id issued by an earlier Agent
/// message and not answered yet. Call ids inside one Agent message must be
/// unique. Calls left unanswered are allowed: a run may stop between an
/// Agent reply and its dispatch.
pub fn validate_history(messages: &[Message]) -> Result<(), HistoryViolation> {
    let mut outstanding: HashSet<&str> = HashSet::new();

    for (index, message) in messages.iter().enumerate() {
        match message {
            Message::Agent {
                capability_calls, ..
            } => {
                let mut in_message: HashSet<&str> = HashSet::new();
                for call in capability_calls {
                    if call.call_id.is_empty() {
                        return Err(HistoryViolation {
                            index,
                            reason: format!("capability call '{}' has an empty call id", call.name),
                        });
                    }
                    if !in_message.insert(call.call_id.as_str()) {
                        return Err(HistoryViolation {
                            index,
                            reason: format!("call id '{}' is repeated in one message", call.call_id),
                        });
                    }
                    outstanding.insert(call.call_id.as_str());
                }
            }
            Message::Tool { call_id, .. } => {
                if !outstanding.remove(call_id.as_str()) {
                    return Err(HistoryViolation {
                        index,
                        reason: format!(
                            "tool message answers call id '{}' which has no open capability call",
                            call_id
                        ),
                    });
                }
            }
            Message::Human { .. } | Message::System { .. } => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_per_kind() {
        let human = Message::human("hi");
        assert_eq!(human.kind(), MessageKind::Human);
        assert_eq!(human.content(), "hi");
        assert!(human.capability_calls().is_empty());
        assert_eq!(human.call_id(), None);

        let call = CapabilityCall::single("web_search", "query", "x", "c1");
        let agent = Message::agent_with_calls("", vec![call.clone()]);
        assert_eq!(agent.kind(), MessageKind::Agent);
        assert!(agent.requests_capabilities());
        assert_eq!(agent.capability_calls(), &[call]);

        let tool = Message::tool("c1", "web_search", "result");
        assert!(tool.is_tool());
        assert_eq!(tool.call_id(), Some("c1"));
        assert!(!tool.requests_capabilities());
    }

    #[test]
    fn test_agent_serializes_empty_calls_explicitly() {
        let json = serde_json::to_value(Message::agent("done")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "agent", "content": "done", "capability_calls": []})
        );
    }

    #[test]
    fn test_agent_without_calls_field_is_rejected() {
        let raw = serde_json::json!({"kind": "agent", "content": "done"});
        assert!(serde_json::from_value::<Message>(raw).is_err());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let raw = serde_json::json!({"kind": "function", "content": "x"});
        assert!(serde_json::from_value::<Message>(raw).is_err());
    }

    #[test]
    fn test_tool_message_shape() {
        let json = serde_json::to_value(Message::tool("c1", "save", "ok")).unwrap();
        assert_eq!(json["kind"], "tool");
        assert_eq!(json["call_id"], "c1");
        assert_eq!(json["name"], "save");
    }

    #[test]
    fn test_validate_accepts_paired_history() {
        let log = vec![
            Message::human("draft"),
            Message::agent_with_calls(
                "",
                vec![
                    CapabilityCall::single("web_search", "query", "a", "c1"),
                    CapabilityCall::single("web_search", "query", "b", "c2"),
                ],
            ),
            Message::tool("c1", "web_search", "A"),
            Message::tool("c2", "web_search", "B"),
            Message::agent("summary"),
        ];
        assert_eq!(validate_history(&log), Ok(()));
    }

    #[test]
    fn test_validate_allows_unanswered_calls() {
        let log = vec![
            Message::human("draft"),
            Message::agent_with_calls("", vec![CapabilityCall::single("save", "filename", "x", "c1")]),
        ];
        assert!(validate_history(&log).is_ok());
    }

    #[test]
    fn test_validate_rejects_orphan_tool_message() {
        let log = vec![Message::human("draft"), Message::tool("c7", "web_search", "A")];
        let err = validate_history(&log).unwrap_err();
        assert_eq!(err.index, 1);
        assert!(err.reason.contains("c7"));
    }

    #[test]
    fn test_validate_rejects_double_answer() {
        let log = vec![
            Message::agent_with_calls("", vec![CapabilityCall::single("web_search", "query", "a", "c1")]),
            Message::tool("c1", "web_search", "A"),
            Message::tool("c1", "web_search", "A again"),
        ];
        assert_eq!(validate_history(&log).unwrap_err().index, 2);
    }

    #[test]
    fn test_validate_rejects_repeated_id_in_one_message() {
        let log = vec![Message::agent_with_calls(
            "",
            vec![
                CapabilityCall::single("web_search", "query", "a", "c1"),
                CapabilityCall::single("web_search", "query", "b", "c1"),
            ],
        )];
        assert!(validate_history(&log).is_err());
    }
}
