//! # draftflow
//!
//! A workflow engine that routes a drafting conversation through four
//! stages (Coordinator, Researcher, Drafter, Editor) and a capability
//! dispatch node.
//!
//! Stages think through a host-supplied [`ThinkProvider`] and may request
//! capabilities (web lookups, saving) from a [`CapabilityRegistry`]. The whole
//! conversation lives in a [`ConversationState`] value that is encoded to a
//! JSON transport form between requests, so the engine keeps no session
//! state of its own.
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(Arc::new(my_model), registry, EngineConfig::default());
//! let outcome = orchestrator.run_turn(prior.as_ref(), "draft a two-sentence greeting").await?;
//! let snapshot = draftflow::state::encode(outcome.state());
//! ```

pub mod agents;
pub mod capabilities;
pub mod flow;
pub mod llm;
pub mod messages;
pub mod state;
pub mod utilities;

#[cfg(test)]
pub(crate) mod testing;

pub use agents::{Stage, StageNode};
pub use capabilities::{CapabilityHandler, CapabilityRegistry, CapabilitySpec};
pub use flow::{EngineConfig, Orchestrator, RunEvent, RunOutcome};
pub use llm::{AgentReply, ThinkError, ThinkProvider, ThinkRequest};
pub use messages::{CapabilityCall, Message};
pub use state::ConversationState;
pub use utilities::errors::{CodecError, EngineError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
