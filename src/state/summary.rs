//! Human-readable digest of a conversation state.

use std::collections::BTreeMap;
use std::fmt;

use super::{ConversationState, HandoffField, RoutingTag};
use crate::messages::MessageKind;

const HANDOFF_FIELDS: [HandoffField; 4] = [
    HandoffField::CoordinatorInstructions,
    HandoffField::ResearchSummary,
    HandoffField::DraftText,
    HandoffField::FinalResponse,
];

/// Counts and sizes describing a state, without its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSummary {
    pub routing_tag: RoutingTag,
    pub messages: usize,
    pub by_kind: BTreeMap<&'static str, usize>,
    /// `name (call_id)` of calls that still await a Tool reply.
    pub pending_calls: Vec<String>,
    /// Character count of each handoff field, in stage order.
    pub handoff_chars: Vec<(&'static str, usize)>,
}

impl StateSummary {
    pub fn of(state: &ConversationState) -> Self {
        let mut by_kind = BTreeMap::new();
        for message in state.messages() {
            *by_kind.entry(message.kind().as_str()).or_insert(0) += 1;
        }
        Self {
            routing_tag: state.routing_tag(),
            messages: state.messages().len(),
            by_kind,
            pending_calls: state
                .pending_calls()
                .iter()
                .map(|call| format!("{} ({})", call.name, call.call_id))
                .collect(),
            handoff_chars: HANDOFF_FIELDS
                .iter()
                .map(|field| (field.as_str(), state.handoff().get(*field).chars().count()))
                .collect(),
        }
    }

    pub fn count(&self, kind: MessageKind) -> usize {
        self.by_kind.get(kind.as_str()).copied().unwrap_or(0)
    }
}

impl fmt::Display for StateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "router:   {}", self.routing_tag)?;
        let kinds: Vec<String> = self
            .by_kind
            .iter()
            .map(|(kind, count)| format!("{} {}", count, kind))
            .collect();
        if kinds.is_empty() {
            writeln!(f, "messages: 0")?;
        } else {
            writeln!(f, "messages: {} ({})", self.messages, kinds.join(", "))?;
        }
        if self.pending_calls.is_empty() {
            writeln!(f, "pending:  none")?;
        } else {
            writeln!(f, "pending:  {}", self.pending_calls.join(", "))?;
        }
        for (name, chars) in &self.handoff_chars {
            writeln!(f, "{:<25} {} chars", format!("{}:", name), chars)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Stage;
    use crate::messages::{CapabilityCall, Message};

    #[test]
    fn test_summary_counts() {
        let state = ConversationState::new()
            .with_message(Message::human("go"))
            .with_message(Message::agent_with_calls(
                "",
                vec![
                    CapabilityCall::single("web_search", "query", "a", "c1"),
                    CapabilityCall::single("web_search", "query", "b", "c2"),
                ],
            ))
            .with_message(Message::tool("c1", "web_search", "A"))
            .with_routing_tag(Stage::Research)
            .with_handoff(HandoffField::DraftText, "héllo");

        let summary = StateSummary::of(&state);
        assert_eq!(summary.messages, 3);
        assert_eq!(summary.count(MessageKind::Agent), 1);
        assert_eq!(summary.count(MessageKind::System), 0);
        assert_eq!(summary.pending_calls, vec!["web_search (c2)".to_string()]);
        assert!(summary.handoff_chars.contains(&("draft_text", 5)));

        let text = summary.to_string();
        assert!(text.contains("router:   research"));
        assert!(text.contains("messages: 3 (1 agent, 1 human, 1 tool)"));
        assert!(text.contains("pending:  web_search (c2)"));
    }

    #[test]
    fn test_empty_summary() {
        let text = StateSummary::of(&ConversationState::new()).to_string();
        assert!(text.contains("messages: 0"));
        assert!(text.contains("pending:  none"));
    }
}
