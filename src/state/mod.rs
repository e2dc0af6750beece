//! Conversation state threaded through every node.
//!
//! A `ConversationState` is a value: nodes take it by value and return the
//! next value. The message log is append-only; there is no API to reorder or
//! remove entries.

pub mod codec;
pub mod summary;

use serde::{Deserialize, Serialize};

use crate::agents::Stage;
use crate::messages::{CapabilityCall, Message};

pub use codec::{decode, decode_str, encode, encode_string, TransportState, TRANSPORT_VERSION};
pub use summary::StateSummary;

/// The identity of the stage that most recently completed.
///
/// After a dispatch round-trip the orchestrator resumes the stage named here.
pub type RoutingTag = Stage;

/// Names of the scratch fields stages use to hand work to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandoffField {
    CoordinatorInstructions,
    ResearchSummary,
    DraftText,
    FinalResponse,
}

impl HandoffField {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandoffField::CoordinatorInstructions => "coordinator_instructions",
            HandoffField::ResearchSummary => "research_summary",
            HandoffField::DraftText => "draft_text",
            HandoffField::FinalResponse => "final_response",
        }
    }
}

/// Last-write-wins scratch strings passed between stages.
///
/// An empty string means "nothing provided yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    #[serde(default)]
    pub coordinator_instructions: String,
    #[serde(default)]
    pub research_summary: String,
    #[serde(default)]
    pub draft_text: String,
    #[serde(default)]
    pub final_response: String,
}

impl Handoff {
    pub fn get(&self, field: HandoffField) -> &str {
        match field {
            HandoffField::CoordinatorInstructions => &self.coordinator_instructions,
            HandoffField::ResearchSummary => &self.research_summary,
            HandoffField::DraftText => &self.draft_text,
            HandoffField::FinalResponse => &self.final_response,
        }
    }

    pub fn set(&mut self, field: HandoffField, value: impl Into<String>) {
        let slot = match field {
            HandoffField::CoordinatorInstructions => &mut self.coordinator_instructions,
            HandoffField::ResearchSummary => &mut self.research_summary,
            HandoffField::DraftText => &mut self.draft_text,
            HandoffField::FinalResponse => &mut self.final_response,
        };
        *slot = value.into();
    }
}

/// The record threaded through every stage and dispatch step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    messages: Vec<Message>,
    routing_tag: RoutingTag,
    handoff: Handoff,
}

impl ConversationState {
    /// An empty conversation: no messages, tag `Coordinate`, empty handoff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a state from already-validated parts.
    pub(crate) fn from_parts(messages: Vec<Message>, routing_tag: RoutingTag, handoff: Handoff) -> Self {
        Self {
            messages,
            routing_tag,
            handoff,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn latest_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn routing_tag(&self) -> RoutingTag {
        self.routing_tag
    }

    pub fn handoff(&self) -> &Handoff {
        &self.handoff
    }

    /// The document under work: the edited response if there is one,
    /// otherwise the latest draft, otherwise empty.
    pub fn current_document(&self) -> &str {
        if !self.handoff.final_response.is_empty() {
            &self.handoff.final_response
        } else {
            &self.handoff.draft_text
        }
    }

    /// Append one message.
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Append messages in order.
    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn with_routing_tag(mut self, tag: RoutingTag) -> Self {
        self.routing_tag = tag;
        self
    }

    pub fn with_handoff(mut self, field: HandoffField, value: impl Into<String>) -> Self {
        self.handoff.set(field, value);
        self
    }

    /// Index of the Agent message whose capability round is still at the
    /// tail of the log, i.e. it requested calls and has been followed by
    /// nothing but Tool messages since.
    pub fn open_round(&self) -> Option<usize> {
        for (index, message) in self.messages.iter().enumerate().rev() {
            match message {
                Message::Tool { .. } => continue,
                Message::Agent {
                    capability_calls, ..
                } if !capability_calls.is_empty() => return Some(index),
                _ => return None,
            }
        }
        None
    }

    /// Calls of the open round, in issue order.
    pub fn round_calls(&self) -> &[CapabilityCall] {
        self.open_round()
            .map(|index| self.messages[index].capability_calls())
            .unwrap_or(&[])
    }

    /// Calls of the open round that have no Tool reply yet, in issue order.
    pub fn pending_calls(&self) -> Vec<&CapabilityCall> {
        let Some(index) = self.open_round() else {
            return Vec::new();
        };
        let answered: Vec<&str> = self.messages[index + 1..]
            .iter()
            .filter_map(Message::call_id)
            .collect();
        self.messages[index]
            .capability_calls()
            .iter()
            .filter(|call| !answered.contains(&call.call_id.as_str()))
            .collect()
    }

    /// Whether the open round's only call is the capability named `name`.
    pub fn round_is_sole_call(&self, name: &str) -> bool {
        matches!(self.round_calls(), [only] if only.name == name)
    }

    /// Whether the latest message is a Tool reply in a round that asked for
    /// the capability named `name`.
    pub fn answers_capability(&self, name: &str) -> bool {
        self.latest_message().map_or(false, Message::is_tool)
            && self.round_calls().iter().any(|call| call.name == name)
    }
}
