//! Run results and the events a streaming run emits.
//!
//! A streaming turn yields one [`RunEvent::Step`] per node application and a
//! single [`RunEvent::Final`] at the end. `to_transport` renders either as the
//! transport JSON of its state plus an `"event"` discriminator, which is the
//! shape a client resumes from.

use serde_json::{json, Value};

use super::router::{Next, NodeId};
use crate::state::{encode, ConversationState};

/// One node application: which node ran, where the run goes next, and the
/// state it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowStep {
    pub node: NodeId,
    pub next: Next,
    pub state: ConversationState,
}

/// How a run-to-completion ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The run reached the terminal state.
    Completed {
        state: ConversationState,
        steps: usize,
    },
    /// The step budget ran out first. `state` is the last consistent state.
    DidNotTerminate {
        state: ConversationState,
        steps: usize,
        budget: usize,
    },
}

impl RunOutcome {
    pub fn state(&self) -> &ConversationState {
        match self {
            RunOutcome::Completed { state, .. } | RunOutcome::DidNotTerminate { state, .. } => state,
        }
    }

    pub fn into_state(self) -> ConversationState {
        match self {
            RunOutcome::Completed { state, .. } | RunOutcome::DidNotTerminate { state, .. } => state,
        }
    }

    pub fn steps(&self) -> usize {
        match self {
            RunOutcome::Completed { steps, .. } | RunOutcome::DidNotTerminate { steps, .. } => *steps,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    /// Short label used in transport events.
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Completed { .. } => "completed",
            RunOutcome::DidNotTerminate { .. } => "did_not_terminate",
        }
    }
}

/// Events of a streaming turn.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Step(FlowStep),
    Final(RunOutcome),
}

impl RunEvent {
    pub fn state(&self) -> &ConversationState {
        match self {
            RunEvent::Step(step) => &step.state,
            RunEvent::Final(outcome) => outcome.state(),
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, RunEvent::Final(_))
    }

    /// Transport JSON of the event's state with event metadata merged in.
    ///
    /// The result still decodes as a conversation state; the extra keys are
    /// ignored by the codec.
    pub fn to_transport(&self) -> Value {
        let mut payload = encode(self.state());
        let extra = match self {
            RunEvent::Step(step) => json!({
                "event": "step",
                "node": step.node,
                "next": step.next.to_string(),
            }),
            RunEvent::Final(outcome) => json!({
                "event": "final",
                "outcome": outcome.label(),
                "steps": outcome.steps(),
            }),
        };
        if let (Value::Object(target), Value::Object(fields)) = (&mut payload, extra) {
            target.extend(fields);
        }
        payload
    }
}
