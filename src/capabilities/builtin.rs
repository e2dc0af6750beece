//! Built-in capabilities and well-known capability specs.
//!
//! `save` is the terminal capability: the Coordinator requests it when the
//! user wants to finish, and the run ends once it has been answered. The
//! engine never writes the document itself; the acknowledgement tells the
//! client under which name to persist the current document.
//!
//! The lookup capabilities (`web_search`, `google_scholar`) are provided by
//! the host. Their specs live here so every host presents them to the model
//! the same way.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::capability::{required_str, CapabilityHandler, CapabilityOutput, CapabilitySpec};

static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._ \-]").unwrap());

/// Default name of the terminal capability.
pub const SAVE: &str = "save";

/// Name of the general web lookup capability.
pub const WEB_SEARCH: &str = "web_search";

/// Name of the scholarly-article lookup capability.
pub const GOOGLE_SCHOLAR: &str = "google_scholar";

/// Spec for the general web lookup capability.
pub fn web_search_spec() -> CapabilitySpec {
    CapabilitySpec::with_string_argument(
        WEB_SEARCH,
        "Find general knowledge information using a web search.",
        "query",
        "The search query.",
    )
}

/// Spec for the scholarly-article lookup capability.
pub fn google_scholar_spec() -> CapabilitySpec {
    CapabilitySpec::with_string_argument(
        GOOGLE_SCHOLAR,
        "Search for academic articles. Returns title, authors, abstract and link for each match.",
        "query",
        "The search query.",
    )
}

/// Acknowledges a request to save the current document.
#[derive(Debug, Clone)]
pub struct SaveCapability {
    name: String,
}

impl SaveCapability {
    pub fn new() -> Self {
        Self::named(SAVE)
    }

    /// A save capability registered under a different name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for SaveCapability {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapabilityHandler for SaveCapability {
    fn spec(&self) -> CapabilitySpec {
        CapabilitySpec::with_string_argument(
            self.name.clone(),
            "Save the final document to a text file and finish the conversation.",
            "filename",
            "Name for the text file.",
        )
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> anyhow::Result<CapabilityOutput> {
        let filename = normalize_filename(required_str(&arguments, "filename")?)?;
        log::info!("Save requested as {}", filename);
        Ok(CapabilityOutput::Text(format!(
            "Ready to save as '{}'. Send final content to client to persist.",
            filename
        )))
    }
}

/// Reduce a requested file name to a safe `*.txt` base name.
///
/// Directory components are dropped, characters outside
/// `[A-Za-z0-9._ -]` become `_`, and `.txt` is appended when missing.
pub fn normalize_filename(raw: &str) -> anyhow::Result<String> {
    let base = raw
        .trim()
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        anyhow::bail!("filename '{}' is empty after cleanup", raw);
    }
    if cleaned.to_lowercase().ends_with(".txt") {
        Ok(cleaned.to_string())
    } else {
        Ok(format!("{}.txt", cleaned))
    }
}
