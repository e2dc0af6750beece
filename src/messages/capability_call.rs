//! Capability call data structures.
//!
//! Provides the `CapabilityCall` struct an agent embeds in its reply when it
//! wants an external lookup or action performed, plus the id hygiene applied
//! before such a reply enters the conversation log.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Represents one requested capability invocation.
///
/// The `call_id` correlates the request with the Tool message that answers
/// it, so it must be unique within the Agent message that carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityCall {
    /// The name of the capability to invoke.
    pub name: String,
    /// Arguments passed to the capability handler.
    pub arguments: Map<String, Value>,
    /// Identifier echoed back by the answering Tool message.
    pub call_id: String,
}

impl CapabilityCall {
    /// Create a new `CapabilityCall`.
    pub fn new(
        name: impl Into<String>,
        arguments: Map<String, Value>,
        call_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            call_id: call_id.into(),
        }
    }

    /// Create a call with a freshly generated id.
    pub fn with_generated_id(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self::new(name, arguments, generate_call_id())
    }

    /// Convenience constructor for the common single-string-argument shape,
    /// e.g. `{"query": "..."}`.
    pub fn single(
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        call_id: impl Into<String>,
    ) -> Self {
        let mut arguments = Map::new();
        arguments.insert(key.into(), Value::String(value.into()));
        Self::new(name, arguments, call_id)
    }

    /// Get a string argument by key.
    pub fn argument_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Generate a new call id.
pub fn generate_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Make every call id in one Agent reply non-empty and unique.
///
/// Empty ids get a generated id; a repeated id gets a numeric suffix
/// (`c1`, `c1-2`, `c1-3`, ...). Order is preserved.
pub fn normalize_call_ids(calls: Vec<CapabilityCall>) -> Vec<CapabilityCall> {
    let mut seen: HashSet<String> = HashSet::with_capacity(calls.len());
    calls
        .into_iter()
        .map(|mut call| {
            if call.call_id.trim().is_empty() {
                call.call_id = generate_call_id();
            }
            if seen.contains(&call.call_id) {
                let base = call.call_id.clone();
                let mut n = 2;
                while seen.contains(&format!("{}-{}", base, n)) {
                    n += 1;
                }
                log::debug!("Renaming duplicate call id {} to {}-{}", base, base, n);
                call.call_id = format!("{}-{}", base, n);
            }
            seen.insert(call.call_id.clone());
            call
        })
        .collect()
}
