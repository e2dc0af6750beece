//! The think call: the external text-completion boundary.
//!
//! A stage "thinks" by handing its instruction context and the full message
//! log to a [`ThinkProvider`]. The provider returns one Agent reply which may
//! request capability calls. Providers are supplied by the host; the engine
//! only defines the contract.
//!
//! # Example
//!
//! ```ignore
//! use draftflow::llm::{AgentReply, ThinkError, ThinkProvider, ThinkRequest};
//!
//! #[derive(Debug)]
//! struct MyModel { /* client, model name, ... */ }
//!
//! #[async_trait::async_trait]
//! impl ThinkProvider for MyModel {
//!     async fn think(&self, request: ThinkRequest) -> Result<AgentReply, ThinkError> {
//!         // Send request.prompt_messages() and request.capability_specs()
//!         // to the model, map the answer back to an AgentReply.
//!     }
//! }
//! ```

mod error;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::agents::Stage;
use crate::capabilities::CapabilitySpec;
use crate::messages::{CapabilityCall, Message};

pub use error::ThinkError;

/// How strongly a capabilities-enabled think call should lean on capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityChoice {
    /// The model decides whether to request capabilities.
    #[default]
    Auto,
    /// The model should request at least one capability.
    Required,
}

/// Whether the think call may return capability calls.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityMode {
    /// The listed capabilities may be requested.
    Enabled {
        specs: Vec<CapabilitySpec>,
        choice: CapabilityChoice,
    },
    /// No capability calls may be returned.
    Disabled,
}

/// Input to one think call.
#[derive(Debug, Clone, PartialEq)]
pub struct ThinkRequest {
    /// The stage that is thinking.
    pub stage: Stage,
    /// The stage's instruction context (role description plus handoff fields).
    pub instructions: String,
    /// The full conversation log, in order.
    pub messages: Vec<Message>,
    pub capabilities: CapabilityMode,
}

impl ThinkRequest {
    pub fn capabilities_enabled(&self) -> bool {
        matches!(self.capabilities, CapabilityMode::Enabled { .. })
    }

    /// Specs the model may call; empty in disabled mode.
    pub fn capability_specs(&self) -> &[CapabilitySpec] {
        match &self.capabilities {
            CapabilityMode::Enabled { specs, .. } => specs,
            CapabilityMode::Disabled => &[],
        }
    }

    /// The instruction context as a leading System message, followed by the log.
    pub fn prompt_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(Message::system(self.instructions.clone()));
        messages.extend(self.messages.iter().cloned());
        messages
    }
}

/// Output of one think call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub content: String,
    #[serde(default)]
    pub capability_calls: Vec<CapabilityCall>,
}

impl AgentReply {
    /// A plain text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            capability_calls: Vec::new(),
        }
    }

    /// A reply requesting capability calls.
    pub fn with_calls(content: impl Into<String>, calls: Vec<CapabilityCall>) -> Self {
        Self {
            content: content.into(),
            capability_calls: calls,
        }
    }
}

/// The external text-completion capability.
///
/// Implementations must honour [`CapabilityMode::Disabled`]; the stage node
/// additionally drops any calls returned in that mode.
#[async_trait]
pub trait ThinkProvider: Send + Sync + fmt::Debug {
    /// Produce one Agent reply for the request.
    async fn think(&self, request: ThinkRequest) -> Result<AgentReply, ThinkError>;
}

/// Type alias for a boxed async think function.
pub type ThinkFn =
    Arc<dyn Fn(ThinkRequest) -> BoxFuture<'static, Result<AgentReply, ThinkError>> + Send + Sync>;

/// A think provider backed by a closure.
#[derive(Clone)]
pub struct FnThink {
    func: ThinkFn,
}

impl fmt::Debug for FnThink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnThink").finish_non_exhaustive()
    }
}

impl FnThink {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(ThinkRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<AgentReply, ThinkError>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |request| Box::pin(func(request))),
        }
    }
}

#[async_trait]
impl ThinkProvider for FnThink {
    async fn think(&self, request: ThinkRequest) -> Result<AgentReply, ThinkError> {
        (self.func)(request).await
    }
}

/// Run a think call, converting an overrun of `timeout` into
/// [`ThinkError::Timeout`].
pub async fn think_within(
    provider: &dyn ThinkProvider,
    request: ThinkRequest,
    timeout: Option<Duration>,
) -> Result<AgentReply, ThinkError> {
    let stage = request.stage;
    match timeout {
        Some(limit) => tokio::time::timeout(limit, provider.think(request))
            .await
            .unwrap_or(Err(ThinkError::Timeout { stage, after: limit })),
        None => provider.think(request).await,
    }
}
