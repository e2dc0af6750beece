//! Capability dispatch node.

use std::sync::Arc;

use crate::capabilities::CapabilityRegistry;
use crate::state::ConversationState;

/// Runs the pending capability calls of the latest Agent message.
#[derive(Debug, Clone)]
pub struct DispatchNode {
    registry: Arc<CapabilityRegistry>,
}

impl DispatchNode {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Invoke every unanswered call of the open round, in issue order, and
    /// append one Tool message per call. The routing tag is untouched.
    ///
    /// Calls that already have a Tool reply are skipped, so a state is never
    /// dispatched twice. With nothing pending this is a passthrough.
    pub async fn run(&self, state: ConversationState) -> ConversationState {
        let pending: Vec<_> = state.pending_calls().into_iter().cloned().collect();
        if pending.is_empty() {
            log::debug!("Dispatch called with no pending capability calls");
            return state;
        }

        let mut replies = Vec::with_capacity(pending.len());
        for call in &pending {
            replies.push(self.registry.invoke(call).await);
        }
        state.with_messages(replies)
    }
}
