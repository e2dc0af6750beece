//! Capabilities: named external actions agents can request.
//!
//! - [`capability`]: the handler trait, specs and outputs.
//! - [`registry`]: name -> handler lookup with failure wrapping.
//! - [`builtin`]: the terminal `save` capability and well-known lookup specs.

pub mod builtin;
pub mod capability;
pub mod registry;

pub use builtin::{google_scholar_spec, web_search_spec, SaveCapability, GOOGLE_SCHOLAR, SAVE, WEB_SEARCH};
pub use capability::{
    required_str, CapabilityFn, CapabilityHandler, CapabilityOutput, CapabilitySpec, FnCapability,
};
pub use registry::CapabilityRegistry;
