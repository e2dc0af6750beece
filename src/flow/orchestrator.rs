//! The orchestrator: drives a conversation turn through the node graph.
//!
//! Nodes run strictly one after another; each node's output state is the
//! next node's only input. The orchestrator owns no per-conversation data,
//! so one instance can serve any number of concurrent conversations.
//!
//! Two execution modes share the same transition logic:
//!
//! - [`Orchestrator::run`] applies nodes until the terminal state or until
//!   the step budget is spent, and reports which of the two happened.
//! - [`Orchestrator::stream`] yields a [`FlowStep`] after every node. The
//!   caller may stop polling at any point; every yielded state is complete.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

use super::dispatch::DispatchNode;
use super::flow_config::EngineConfig;
use super::flow_events::{FlowStep, RunEvent, RunOutcome};
use super::router::{Next, NodeId, Router};
use crate::agents::{Stage, StageNode};
use crate::capabilities::CapabilityRegistry;
use crate::llm::ThinkProvider;
use crate::messages::Message;
use crate::state::{decode, ConversationState};
use crate::utilities::errors::EngineError;

/// Drives conversation turns.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    /// One node per stage, indexed in `Stage::ALL` order.
    stages: Vec<StageNode>,
    dispatch: DispatchNode,
    router: Router,
    config: EngineConfig,
}

impl Orchestrator {
    /// Build an orchestrator.
    ///
    /// The registry takes the configured capability timeout. Capabilities a
    /// stage policy names but the registry lacks are left out of that stage's
    /// offer (and logged).
    pub fn new(think: Arc<dyn ThinkProvider>, mut registry: CapabilityRegistry, config: EngineConfig) -> Self {
        registry.set_timeout(config.capability_timeout());
        if !registry.contains(&config.terminal_capability) {
            log::warn!(
                "Terminal capability '{}' is not registered; runs can only end by budget",
                config.terminal_capability
            );
        }

        let stages = Stage::ALL
            .iter()
            .map(|&stage| {
                let policy = config.stages.policy(stage);
                StageNode::new(stage, think.clone())
                    .with_capabilities(registry.specs_for(&policy.capabilities), policy.choice)
                    .with_terminal_capability(config.terminal_capability.clone())
                    .with_think_timeout(config.think_timeout())
            })
            .collect();

        Self {
            stages,
            dispatch: DispatchNode::new(Arc::new(registry)),
            router: Router::new(config.terminal_capability.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        self.dispatch.registry()
    }

    pub fn stage_node(&self, stage: Stage) -> &StageNode {
        let index = Stage::ALL.iter().position(|s| *s == stage).unwrap_or(0);
        &self.stages[index]
    }

    /// Prepare the state for a new turn: decode the prior transport state
    /// (`None`, `null` or `{}` start fresh) and append the human input.
    ///
    /// A prior turn that stopped between a stage's calls and their dispatch
    /// leaves those calls open. They are answered here, before the human
    /// message closes the round.
    pub async fn begin_turn(&self, prior: Option<&Value>, input: &str) -> Result<ConversationState, EngineError> {
        let mut state = match prior {
            Some(payload) => decode(payload)?,
            None => ConversationState::new(),
        };
        log::debug!("Beginning turn with {} prior message(s)", state.messages().len());

        let pending = state.pending_calls().len();
        if pending > 0 {
            log::info!("Answering {} call(s) left open by the previous turn", pending);
            state = self.dispatch.run(state).await;
        }
        Ok(state.with_message(Message::human(input)))
    }

    /// Apply one node and decide where to go next.
    pub async fn step(&self, node: NodeId, state: ConversationState) -> FlowStep {
        let state = match node.stage() {
            Some(stage) => self.stage_node(stage).run(state).await,
            None => self.dispatch.run(state).await,
        };
        let next = self.router.route(node, &state);
        log::debug!("{} -> {} ({} messages)", node, next, state.messages().len());
        FlowStep { node, next, state }
    }

    /// Yield the state after every node application, starting at the entry
    /// node. Ends after the step that routes to the terminal state.
    pub fn stream(&self, state: ConversationState) -> BoxStream<'_, FlowStep> {
        stream::unfold(Some((Router::ENTRY, state)), move |cursor| async move {
            let Some((node, state)) = cursor else {
                return None;
            };
            let step = self.step(node, state).await;
            let cursor = match step.next {
                Next::Node(next) => Some((next, step.state.clone())),
                Next::Terminal => None,
            };
            Some((step, cursor))
        })
        .boxed()
    }

    /// Apply nodes until the terminal state or until `budget` node
    /// applications have run.
    pub async fn run(&self, state: ConversationState, budget: usize) -> RunOutcome {
        let mut node = Router::ENTRY;
        let mut state = state;
        let mut steps = 0;

        while steps < budget {
            let step = self.step(node, state).await;
            steps += 1;
            state = step.state;
            match step.next {
                Next::Terminal => {
                    log::info!("Run completed after {} step(s)", steps);
                    return RunOutcome::Completed { state, steps };
                }
                Next::Node(next) => node = next,
            }
        }

        log::warn!("Run did not terminate within {} step(s); next node was {}", budget, node);
        RunOutcome::DidNotTerminate { state, steps, budget }
    }

    /// Decode, append the input and run to completion within the configured
    /// step budget.
    pub async fn run_turn(&self, prior: Option<&Value>, input: &str) -> Result<RunOutcome, EngineError> {
        let state = self.begin_turn(prior, input).await?;
        Ok(self.run(state, self.config.step_budget).await)
    }

    /// Decode, append the input and stream the turn: one `Step` event per
    /// node application, then one `Final` event. Bounded by the configured
    /// step budget.
    pub async fn stream_turn(
        &self,
        prior: Option<&Value>,
        input: &str,
    ) -> Result<BoxStream<'_, RunEvent>, EngineError> {
        let state = self.begin_turn(prior, input).await?;
        let budget = self.config.step_budget;

        let events = stream::unfold(
            Some(TurnCursor::Running {
                node: Router::ENTRY,
                state,
                steps: 0,
            }),
            move |cursor| async move {
                match cursor {
                    None => None,
                    Some(TurnCursor::Running { node, state, steps }) if steps >= budget => {
                        log::warn!("Streamed run did not terminate within {} step(s); next node was {}", budget, node);
                        let outcome = RunOutcome::DidNotTerminate { state, steps, budget };
                        Some((RunEvent::Final(outcome), None))
                    }
                    Some(TurnCursor::Running { node, state, steps }) => {
                        let step = self.step(node, state).await;
                        let steps = steps + 1;
                        let cursor = match step.next {
                            Next::Node(next) => TurnCursor::Running {
                                node: next,
                                state: step.state.clone(),
                                steps,
                            },
                            Next::Terminal => TurnCursor::Finished(RunOutcome::Completed {
                                state: step.state.clone(),
                                steps,
                            }),
                        };
                        Some((RunEvent::Step(step), Some(cursor)))
                    }
                    Some(TurnCursor::Finished(outcome)) => Some((RunEvent::Final(outcome), None)),
                }
            },
        );
        Ok(events.boxed())
    }
}

enum TurnCursor {
    Running {
        node: NodeId,
        state: ConversationState,
        steps: usize,
    },
    Finished(RunOutcome),
}
