//! Orchestration of a conversation turn.
//!
//! The graph has five nodes: the four stages and the capability dispatch
//! node. [`router`] holds the transition rules, [`orchestrator`] drives runs
//! in streaming or run-to-completion mode, [`flow_events`] describes what a
//! run reports and [`flow_config`] configures it.

pub mod dispatch;
pub mod flow_config;
pub mod flow_events;
pub mod orchestrator;
pub mod router;

pub use self::dispatch::DispatchNode;
pub use self::flow_config::{EngineConfig, StagePolicy, StagesConfig};
pub use self::flow_events::{FlowStep, RunEvent, RunOutcome};
pub use self::orchestrator::Orchestrator;
pub use self::router::{possible_next, Next, NodeId, Router};
