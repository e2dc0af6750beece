//! Shared error types and prompt text.

pub mod errors;
pub mod prompts;

pub use errors::{CapabilityFailure, CodecError, EngineError};
