//! Capability handler abstractions.
//!
//! A capability is a named external action an agent may request, such as a
//! web lookup. Handlers are opaque and usually I/O bound; the engine only
//! invokes them and relays what they return.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Description of a capability as presented to the think call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    /// The unique name agents use to request the capability.
    pub name: String,
    /// Tells the model how/when/why to use the capability.
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

impl CapabilitySpec {
    /// Create a spec with an explicit parameter schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Create a spec taking one required string argument.
    pub fn with_string_argument(
        name: impl Into<String>,
        description: impl Into<String>,
        argument: &str,
        argument_description: &str,
    ) -> Self {
        Self::new(
            name,
            description,
            json!({
                "type": "object",
                "properties": {
                    argument: {"type": "string", "description": argument_description}
                },
                "required": [argument],
            }),
        )
    }
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityOutput {
    Text(String),
    Structured(Value),
}

impl CapabilityOutput {
    /// Render as Tool message content. Structured results become JSON text.
    pub fn into_content(self) -> String {
        match self {
            CapabilityOutput::Text(text) => text,
            CapabilityOutput::Structured(Value::String(text)) => text,
            CapabilityOutput::Structured(value) => value.to_string(),
        }
    }
}

impl From<String> for CapabilityOutput {
    fn from(s: String) -> Self {
        CapabilityOutput::Text(s)
    }
}

impl From<&str> for CapabilityOutput {
    fn from(s: &str) -> Self {
        CapabilityOutput::Text(s.to_string())
    }
}

impl From<Value> for CapabilityOutput {
    fn from(v: Value) -> Self {
        CapabilityOutput::Structured(v)
    }
}

/// An invocable capability.
#[async_trait]
pub trait CapabilityHandler: Send + Sync + fmt::Debug {
    /// Name, description and argument schema.
    fn spec(&self) -> CapabilitySpec;

    /// Run the capability. Errors are reported back to the requesting agent,
    /// never propagated out of the engine.
    async fn invoke(&self, arguments: Map<String, Value>) -> anyhow::Result<CapabilityOutput>;
}

/// Type alias for a boxed async capability function.
pub type CapabilityFn =
    Arc<dyn Fn(Map<String, Value>) -> BoxFuture<'static, anyhow::Result<CapabilityOutput>> + Send + Sync>;

/// A capability backed by a closure.
#[derive(Clone)]
pub struct FnCapability {
    spec: CapabilitySpec,
    func: CapabilityFn,
}

impl fmt::Debug for FnCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCapability")
            .field("name", &self.spec.name)
            .finish()
    }
}

impl FnCapability {
    /// Wrap an async closure.
    pub fn new<F, Fut>(spec: CapabilitySpec, func: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<CapabilityOutput>> + Send + 'static,
    {
        Self {
            spec,
            func: Arc::new(move |args| Box::pin(func(args))),
        }
    }
}

#[async_trait]
impl CapabilityHandler for FnCapability {
    fn spec(&self) -> CapabilitySpec {
        self.spec.clone()
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> anyhow::Result<CapabilityOutput> {
        (self.func)(arguments).await
    }
}

/// Fetch a required string argument.
pub fn required_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> anyhow::Result<&'a str> {
    match arguments.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => anyhow::bail!("argument '{}' must be a string, got {}", key, other),
        None => anyhow::bail!("missing required argument '{}'", key),
    }
}
