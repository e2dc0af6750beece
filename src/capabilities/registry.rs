//! Capability Registry: maps capability names to handlers.
//!
//! `invoke` is the only way the engine runs a handler, and it always yields
//! exactly one Tool message. Unknown names, handler errors, handler panics
//! and timeouts are all turned into message content the requesting agent
//! can read and recover from.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::{Map, Value};

use super::builtin::SaveCapability;
use super::capability::{CapabilityHandler, CapabilityOutput, CapabilitySpec, FnCapability};
use crate::messages::{CapabilityCall, Message};
use crate::utilities::errors::CapabilityFailure;

/// Registry of invocable capabilities.
///
/// Cloning is cheap; handlers are shared.
#[derive(Debug, Default, Clone)]
pub struct CapabilityRegistry {
    /// Handlers indexed by name. Ordered so listings are stable.
    handlers: BTreeMap<String, Arc<dyn CapabilityHandler>>,

    /// Per-invocation timeout. `None` waits indefinitely.
    timeout: Option<Duration>,
}

impl CapabilityRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in `save` capability.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(SaveCapability::new());
        registry
    }

    /// Register a handler under its spec name, replacing any previous one.
    pub fn register(&mut self, handler: impl CapabilityHandler + 'static) {
        self.register_arc(Arc::new(handler));
    }

    /// Register a shared handler.
    pub fn register_arc(&mut self, handler: Arc<dyn CapabilityHandler>) {
        let name = handler.spec().name;
        if self.handlers.insert(name.clone(), handler).is_some() {
            log::debug!("Replaced capability handler: {}", name);
        }
    }

    /// Register an async closure as a capability.
    pub fn register_fn<F, Fut>(&mut self, spec: CapabilitySpec, func: F)
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<CapabilityOutput>> + Send + 'static,
    {
        self.register(FnCapability::new(spec, func));
    }

    /// Set the per-invocation timeout.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Specs for the given names, in the given order. Names with no handler
    /// are skipped.
    pub fn specs_for(&self, names: &[String]) -> Vec<CapabilitySpec> {
        names
            .iter()
            .filter_map(|name| match self.handlers.get(name) {
                Some(handler) => Some(handler.spec()),
                None => {
                    log::warn!("Capability '{}' is configured but not registered", name);
                    None
                }
            })
            .collect()
    }

    /// Invoke a capability by name.
    pub async fn call(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CapabilityOutput, CapabilityFailure> {
        let handler = self
            .handlers
            .get(name)
            .cloned()
            .ok_or_else(|| CapabilityFailure::Unknown {
                name: name.to_string(),
                available: self.available_names(),
            })?;

        let invocation = AssertUnwindSafe(handler.invoke(arguments)).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, invocation)
                .await
                .map_err(|_| CapabilityFailure::TimedOut {
                    name: name.to_string(),
                    after: limit,
                })?,
            None => invocation.await,
        };

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(CapabilityFailure::Failed {
                name: name.to_string(),
                message: format!("{:#}", err),
            }),
            Err(panic) => Err(CapabilityFailure::Failed {
                name: name.to_string(),
                message: panic_message(panic.as_ref()),
            }),
        }
    }

    /// Answer one capability call with exactly one Tool message.
    pub async fn invoke(&self, call: &CapabilityCall) -> Message {
        log::debug!("Invoking capability {} ({})", call.name, call.call_id);
        let content = match self.call(&call.name, call.arguments.clone()).await {
            Ok(output) => output.into_content(),
            Err(failure) => {
                log::warn!("Capability call {} did not succeed: {}", call.call_id, failure);
                failure.to_string()
            }
        };
        Message::tool(call.call_id.clone(), call.name.clone(), content)
    }

    fn available_names(&self) -> String {
        if self.handlers.is_empty() {
            "none".to_string()
        } else {
            self.names().join(", ")
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".to_string()
    }
}
