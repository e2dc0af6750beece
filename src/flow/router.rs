//! Transition rules of the orchestration state machine.
//!
//! Routing is a pure function of the node that just ran and the state it
//! produced. It looks at the latest message, the routing tag and the open
//! capability round; nothing else.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agents::Stage;
use crate::capabilities::SAVE;
use crate::messages::Message;
use crate::state::ConversationState;

/// A node of the orchestration graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeId {
    Coordinate,
    Research,
    Draft,
    Edit,
    Dispatch,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::Coordinate => "coordinate",
            NodeId::Research => "research",
            NodeId::Draft => "draft",
            NodeId::Edit => "edit",
            NodeId::Dispatch => "dispatch",
        }
    }

    /// The stage this node runs, or `None` for Dispatch.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            NodeId::Coordinate => Some(Stage::Coordinate),
            NodeId::Research => Some(Stage::Research),
            NodeId::Draft => Some(Stage::Draft),
            NodeId::Edit => Some(Stage::Edit),
            NodeId::Dispatch => None,
        }
    }
}

impl From<Stage> for NodeId {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Coordinate => NodeId::Coordinate,
            Stage::Research => NodeId::Research,
            Stage::Draft => NodeId::Draft,
            Stage::Edit => NodeId::Edit,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the run goes after a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Next {
    Node(NodeId),
    Terminal,
}

impl Next {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Next::Terminal)
    }
}

impl fmt::Display for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Next::Node(node) => write!(f, "{}", node),
            Next::Terminal => f.write_str("terminal"),
        }
    }
}

/// Decides the next hop after each node application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    terminal_capability: String,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(SAVE)
    }
}

impl Router {
    /// Every turn starts at the Coordinator.
    pub const ENTRY: NodeId = NodeId::Coordinate;

    pub fn new(terminal_capability: impl Into<String>) -> Self {
        Self {
            terminal_capability: terminal_capability.into(),
        }
    }

    pub fn terminal_capability(&self) -> &str {
        &self.terminal_capability
    }

    /// The next hop after `from` produced `state`.
    pub fn route(&self, from: NodeId, state: &ConversationState) -> Next {
        let next = match from.stage() {
            Some(stage) => self.after_stage(stage, state),
            None => self.after_dispatch(state),
        };
        debug_assert!(
            possible_next(from).contains(&next),
            "illegal transition {} -> {}",
            from,
            next
        );
        next
    }

    fn after_stage(&self, stage: Stage, state: &ConversationState) -> Next {
        match state.latest_message() {
            Some(message) if message.requests_capabilities() => Next::Node(NodeId::Dispatch),
            // A suppressed Coordinator leaves the terminal capability's Tool
            // reply on top: the conversation is finished.
            Some(Message::Tool { .. }) if stage == Stage::Coordinate => Next::Terminal,
            _ => Next::Node(stage.successor().into()),
        }
    }

    fn after_dispatch(&self, state: &ConversationState) -> Next {
        let tag = state.routing_tag();
        if tag == Stage::Coordinate
            && state.round_is_sole_call(&self.terminal_capability)
            && state.pending_calls().is_empty()
        {
            return Next::Terminal;
        }
        Next::Node(tag.into())
    }
}

/// The static transition graph.
pub fn possible_next(from: NodeId) -> &'static [Next] {
    use NodeId::*;
    match from {
        Coordinate => &[Next::Node(Dispatch), Next::Node(Research), Next::Terminal],
        Research => &[Next::Node(Dispatch), Next::Node(Draft)],
        Draft => &[Next::Node(Dispatch), Next::Node(Edit)],
        Edit => &[Next::Node(Dispatch), Next::Node(Coordinate)],
        Dispatch => &[
            Next::Node(Coordinate),
            Next::Node(Research),
            Next::Node(Draft),
            Next::Node(Edit),
            Next::Terminal,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::CapabilityCall;

    fn search(id: &str) -> CapabilityCall {
        CapabilityCall::single("web_search", "query", "X", id)
    }

    fn save(id: &str) -> CapabilityCall {
        CapabilityCall::single("save", "filename", "greeting", id)
    }

    fn base() -> ConversationState {
        ConversationState::new().with_message(Message::human("draft a two-sentence greeting"))
    }

    #[test]
    fn test_plain_replies_follow_the_cycle() {
        let router = Router::default();
        let state = base().with_message(Message::agent("ok"));
        assert_eq!(router.route(NodeId::Coordinate, &state), Next::Node(NodeId::Research));
        assert_eq!(router.route(NodeId::Research, &state), Next::Node(NodeId::Draft));
        assert_eq!(router.route(NodeId::Draft, &state), Next::Node(NodeId::Edit));
        assert_eq!(router.route(NodeId::Edit, &state), Next::Node(NodeId::Coordinate));
    }

    #[test]
    fn test_calls_go_to_dispatch() {
        let router = Router::default();
        let state = base().with_message(Message::agent_with_calls("", vec![search("c1")]));
        for from in [NodeId::Coordinate, NodeId::Research, NodeId::Draft, NodeId::Edit] {
            assert_eq!(router.route(from, &state), Next::Node(NodeId::Dispatch));
        }
    }

    #[test]
    fn test_dispatch_resumes_issuing_stage() {
        let router = Router::default();
        let state = base()
            .with_message(Message::agent_with_calls("", vec![search("c1")]))
            .with_routing_tag(Stage::Research)
            .with_message(Message::tool("c1", "web_search", "facts"));
        assert_eq!(router.route(NodeId::Dispatch, &state), Next::Node(NodeId::Research));
    }

    #[test]
    fn test_sole_save_terminates_after_dispatch() {
        let router = Router::default();
        let state = base()
            .with_message(Message::agent_with_calls("Saving.", vec![save("s1")]))
            .with_message(Message::tool("s1", "save", "Ready"));
        assert_eq!(router.route(NodeId::Dispatch, &state), Next::Terminal);
    }

    #[test]
    fn test_mixed_round_resumes_coordinator() {
        let router = Router::default();
        let state = base()
            .with_message(Message::agent_with_calls("", vec![search("c1"), save("s1")]))
            .with_message(Message::tool("c1", "web_search", "facts"))
            .with_message(Message::tool("s1", "save", "Ready"));
        assert_eq!(router.route(NodeId::Dispatch, &state), Next::Node(NodeId::Coordinate));
        // The resumed Coordinator is suppressed, leaving the Tool reply on top.
        assert_eq!(router.route(NodeId::Coordinate, &state), Next::Terminal);
    }

    #[test]
    fn test_save_from_worker_stage_does_not_terminate() {
        let router = Router::default();
        let state = base()
            .with_message(Message::agent_with_calls("", vec![save("s1")]))
            .with_routing_tag(Stage::Draft)
            .with_message(Message::tool("s1", "save", "Ready"));
        assert_eq!(router.route(NodeId::Dispatch, &state), Next::Node(NodeId::Draft));
    }

    #[test]
    fn test_custom_terminal_capability() {
        let router = Router::new("finish");
        let state = base()
            .with_message(Message::agent_with_calls(
                "",
                vec![CapabilityCall::single("finish", "filename", "x", "f1")],
            ))
            .with_message(Message::tool("f1", "finish", "done"));
        assert_eq!(router.route(NodeId::Dispatch, &state), Next::Terminal);
    }

    #[test]
    fn test_display() {
        assert_eq!(Next::Node(NodeId::Dispatch).to_string(), "dispatch");
        assert_eq!(Next::Terminal.to_string(), "terminal");
        assert_eq!(NodeId::from(Stage::Edit), NodeId::Edit);
    }
}
