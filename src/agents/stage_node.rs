//! Stage node: one visit of a stage to the conversation.
//!
//! A visit builds the stage's instruction context, makes exactly one think
//! call and appends the reply as an Agent message. The routing tag is set to
//! the stage and the stage's handoff field takes the reply text.
//!
//! Two rules keep visits bounded:
//!
//! - Right after a Tool message the think call runs with capabilities
//!   disabled, so a stage that just received capability results continues in
//!   plain text instead of chaining another call.
//! - The Coordinator does not think at all when the latest Tool message
//!   answers a round that requested the terminal capability. The conversation
//!   is finishing and the state is returned as is.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::capabilities::{CapabilitySpec, SAVE};
use crate::llm::{think_within, CapabilityChoice, CapabilityMode, ThinkProvider, ThinkRequest};
use crate::messages::{normalize_call_ids, Message};
use crate::state::ConversationState;
use crate::utilities::prompts::stage_instructions;

use super::Stage;

/// Executes visits of one stage.
#[derive(Clone)]
pub struct StageNode {
    stage: Stage,
    think: Arc<dyn ThinkProvider>,
    /// Capabilities offered when the think call runs with capabilities enabled.
    capabilities: Vec<CapabilitySpec>,
    choice: CapabilityChoice,
    terminal_capability: String,
    think_timeout: Option<Duration>,
}

impl fmt::Debug for StageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageNode")
            .field("stage", &self.stage)
            .field(
                "capabilities",
                &self.capabilities.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            )
            .field("choice", &self.choice)
            .field("terminal_capability", &self.terminal_capability)
            .field("think_timeout", &self.think_timeout)
            .finish()
    }
}

impl StageNode {
    /// A node with no capabilities and no think timeout.
    pub fn new(stage: Stage, think: Arc<dyn ThinkProvider>) -> Self {
        Self {
            stage,
            think,
            capabilities: Vec::new(),
            choice: CapabilityChoice::default(),
            terminal_capability: SAVE.to_string(),
            think_timeout: None,
        }
    }

    pub fn with_capabilities(mut self, specs: Vec<CapabilitySpec>, choice: CapabilityChoice) -> Self {
        self.capabilities = specs;
        self.choice = choice;
        self
    }

    pub fn with_terminal_capability(mut self, name: impl Into<String>) -> Self {
        self.terminal_capability = name.into();
        self
    }

    pub fn with_think_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.think_timeout = timeout;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn capabilities(&self) -> &[CapabilitySpec] {
        &self.capabilities
    }

    /// Whether this visit should be skipped because the terminal capability
    /// has just been answered.
    pub fn suppresses(&self, state: &ConversationState) -> bool {
        self.stage == Stage::Coordinate && state.answers_capability(&self.terminal_capability)
    }

    /// The capability mode for a visit to `state`.
    pub fn capability_mode(&self, state: &ConversationState) -> CapabilityMode {
        let after_tool = state.latest_message().map_or(false, Message::is_tool);
        if after_tool || self.capabilities.is_empty() {
            CapabilityMode::Disabled
        } else {
            CapabilityMode::Enabled {
                specs: self.capabilities.clone(),
                choice: self.choice,
            }
        }
    }

    /// Run one visit.
    ///
    /// Never fails: a think failure becomes an Agent message describing it,
    /// and the routing tag still advances so the run can move on.
    pub async fn run(&self, state: ConversationState) -> ConversationState {
        if self.suppresses(&state) {
            log::debug!(
                "{} skips thinking: '{}' has been answered",
                self.stage.display_name(),
                self.terminal_capability
            );
            return state;
        }

        let capabilities = self.capability_mode(&state);
        let offered: Vec<String> = match &capabilities {
            CapabilityMode::Enabled { specs, .. } => specs.iter().map(|s| s.name.clone()).collect(),
            CapabilityMode::Disabled => Vec::new(),
        };
        let request = ThinkRequest {
            stage: self.stage,
            instructions: stage_instructions(self.stage, &state, &offered),
            messages: state.messages().to_vec(),
            capabilities,
        };
        let disabled = !request.capabilities_enabled();

        match think_within(self.think.as_ref(), request, self.think_timeout).await {
            Ok(reply) => {
                let calls = if disabled && !reply.capability_calls.is_empty() {
                    log::warn!(
                        "{} returned {} capability call(s) with capabilities disabled; dropping them",
                        self.stage.display_name(),
                        reply.capability_calls.len()
                    );
                    Vec::new()
                } else {
                    normalize_call_ids(reply.capability_calls)
                };
                if !calls.is_empty() {
                    log::debug!(
                        "{} requests capabilities: {:?}",
                        self.stage.display_name(),
                        calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
                    );
                }
                let field = self.stage.writes();
                state
                    .with_message(Message::agent_with_calls(reply.content.clone(), calls))
                    .with_routing_tag(self.stage)
                    .with_handoff(field, reply.content)
            }
            Err(err) => {
                log::warn!("{} think call failed: {}", self.stage.display_name(), err);
                state
                    .with_message(Message::agent(format!(
                        "{} could not complete this step: {}",
                        self.stage.display_name(),
                        err
                    )))
                    .with_routing_tag(self.stage)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{google_scholar_spec, web_search_spec, SaveCapability, CapabilityHandler};
    use crate::llm::{AgentReply, ThinkError};
    use crate::messages::CapabilityCall;
    use crate::state::HandoffField;
    use crate::testing::ScriptedThink;

    fn researcher(think: &Arc<ScriptedThink>) -> StageNode {
        StageNode::new(Stage::Research, think.clone())
            .with_capabilities(vec![web_search_spec(), google_scholar_spec()], CapabilityChoice::Required)
    }

    fn coordinator(think: &Arc<ScriptedThink>) -> StageNode {
        StageNode::new(Stage::Coordinate, think.clone())
            .with_capabilities(vec![SaveCapability::new().spec()], CapabilityChoice::Auto)
    }

    #[tokio::test]
    async fn test_reply_is_appended_and_recorded() {
        let think = Arc::new(ScriptedThink::new());
        think.push(Stage::Research, AgentReply::text("Greetings are short."));
        let state = ConversationState::new().with_message(Message::human("draft a greeting"));

        let next = researcher(&think).run(state).await;

        assert_eq!(next.messages().len(), 2);
        assert_eq!(next.latest_message(), Some(&Message::agent("Greetings are short.")));
        assert_eq!(next.routing_tag(), Stage::Research);
        assert_eq!(next.handoff().get(HandoffField::ResearchSummary), "Greetings are short.");

        let request = think.requests().pop().unwrap();
        assert!(request.capabilities_enabled());
        assert!(request.instructions.contains("web_search, google_scholar"));
    }

    #[tokio::test]
    async fn test_after_tool_message_capabilities_are_disabled() {
        let think = Arc::new(ScriptedThink::new());
        think.push(
            Stage::Research,
            AgentReply::with_calls("", vec![CapabilityCall::single("web_search", "query", "again", "c9")]),
        );
        let state = ConversationState::new()
            .with_message(Message::human("go"))
            .with_message(Message::agent_with_calls(
                "",
                vec![CapabilityCall::single("web_search", "query", "X", "c1")],
            ))
            .with_message(Message::tool("c1", "web_search", "facts"))
            .with_routing_tag(Stage::Research);

        let next = researcher(&think).run(state).await;

        let request = think.requests().pop().unwrap();
        assert_eq!(request.capabilities, CapabilityMode::Disabled);
        assert!(!next.latest_message().unwrap().requests_capabilities());
    }

    #[tokio::test]
    async fn test_empty_call_ids_are_filled() {
        let think = Arc::new(ScriptedThink::new());
        think.push(
            Stage::Research,
            AgentReply::with_calls(
                "",
                vec![
                    CapabilityCall::single("web_search", "query", "a", ""),
                    CapabilityCall::single("web_search", "query", "b", ""),
                ],
            ),
        );
        let next = researcher(&think).run(ConversationState::new().with_message(Message::human("go"))).await;

        let calls = next.latest_message().unwrap().capability_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.call_id.starts_with("call_")));
        assert_ne!(calls[0].call_id, calls[1].call_id);
    }

    #[tokio::test]
    async fn test_think_failure_becomes_agent_message() {
        let think = Arc::new(ScriptedThink::new());
        think.push_error(Stage::Research, ThinkError::provider("rate limited"));
        let state = ConversationState::new()
            .with_message(Message::human("go"))
            .with_handoff(HandoffField::ResearchSummary, "old");

        let next = researcher(&think).run(state).await;

        assert_eq!(next.routing_tag(), Stage::Research);
        assert_eq!(
            next.latest_message().unwrap().content(),
            "Researcher could not complete this step: provider error: rate limited"
        );
        assert_eq!(next.handoff().research_summary, "old");
    }

    #[tokio::test]
    async fn test_think_timeout_becomes_agent_message() {
        let think = Arc::new(ScriptedThink::new().with_delay(Duration::from_secs(5)));
        let node = researcher(&think).with_think_timeout(Some(Duration::from_millis(10)));

        let next = node.run(ConversationState::new().with_message(Message::human("go"))).await;

        assert!(next.latest_message().unwrap().content().contains("timed out"));
        assert_eq!(next.routing_tag(), Stage::Research);
    }

    #[tokio::test]
    async fn test_coordinator_suppressed_after_save() {
        let think = Arc::new(ScriptedThink::new());
        let state = ConversationState::new()
            .with_message(Message::human("save it as greeting"))
            .with_message(Message::agent_with_calls(
                "Saving.",
                vec![CapabilityCall::single("save", "filename", "greeting", "s1")],
            ))
            .with_message(Message::tool("s1", "save", "Ready to save as 'greeting.txt'."));

        let next = coordinator(&think).run(state.clone()).await;

        assert_eq!(next, state);
        assert!(think.requests().is_empty());
    }

    #[tokio::test]
    async fn test_coordinator_continues_after_other_capability() {
        let think = Arc::new(ScriptedThink::new());
        think.push(Stage::Coordinate, AgentReply::text("Please research greetings."));
        let state = ConversationState::new()
            .with_message(Message::human("go"))
            .with_message(Message::agent_with_calls(
                "",
                vec![CapabilityCall::single("lookup", "q", "x", "k1")],
            ))
            .with_message(Message::tool("k1", "lookup", "Capability 'lookup' is unknown."));

        let next = coordinator(&think).run(state).await;

        assert_eq!(think.requests()[0].capabilities, CapabilityMode::Disabled);
        assert_eq!(next.handoff().coordinator_instructions, "Please research greetings.");
    }

    #[test]
    fn test_mode_without_capabilities_is_disabled() {
        let think = Arc::new(ScriptedThink::new());
        let node = StageNode::new(Stage::Edit, think);
        assert_eq!(node.capability_mode(&ConversationState::new()), CapabilityMode::Disabled);
    }
}
