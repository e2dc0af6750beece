//! Error types shared across the engine.
//!
//! Only request-level problems are errors here. Failures of external calls
//! (think calls, capability handlers) never surface as `Err` from the
//! engine; they become messages in the conversation instead.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while decoding a transport snapshot.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload is not valid JSON or does not match the transport shape.
    #[error("Malformed conversation state: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is JSON but not an object.
    #[error("Malformed conversation state: expected a JSON object, found {found}")]
    NotAnObject { found: String },

    /// The payload declares a transport version this build cannot read.
    #[error("Unsupported conversation state version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The message log breaks the call/reply pairing rules.
    #[error("Invalid message history at index {index}: {reason}")]
    InvalidHistory { index: usize, reason: String },
}

/// Request-level errors: the run does not start.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The supplied conversation state could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error while reading configuration or snapshots.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Config(msg.into())
    }
}

impl From<serde_yaml::Error> for EngineError {
    fn from(err: serde_yaml::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// Why a capability call produced no result.
///
/// The `Display` text is what the requesting agent reads in the Tool
/// message, so it is phrased for the agent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityFailure {
    /// No handler is registered under the requested name.
    #[error("Capability '{name}' is unknown. Available capabilities: {available}.")]
    Unknown { name: String, available: String },

    /// The handler returned an error or panicked.
    #[error("Capability '{name}' failed: {message}")]
    Failed { name: String, message: String },

    /// The handler did not finish within the configured timeout.
    #[error("Capability '{name}' timed out after {}s", .after.as_secs_f64())]
    TimedOut { name: String, after: Duration },
}
