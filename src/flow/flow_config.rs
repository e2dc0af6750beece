//! Engine configuration.
//!
//! Each [`Orchestrator`](super::Orchestrator) owns one `EngineConfig`; there
//! is no process-wide instance. A config can be built in code, loaded from
//! YAML, and adjusted from environment variables:
//!
//! ```yaml
//! step_budget: 40
//! think_timeout_secs: 90
//! capability_timeout_secs: ~     # wait indefinitely
//! stages:
//!   research:
//!     capabilities: [web_search]
//!     choice: auto
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agents::Stage;
use crate::capabilities::{GOOGLE_SCHOLAR, SAVE, WEB_SEARCH};
use crate::llm::CapabilityChoice;
use crate::utilities::errors::EngineError;

pub const ENV_STEP_BUDGET: &str = "DRAFTFLOW_STEP_BUDGET";
pub const ENV_THINK_TIMEOUT: &str = "DRAFTFLOW_THINK_TIMEOUT_SECS";
pub const ENV_CAPABILITY_TIMEOUT: &str = "DRAFTFLOW_CAPABILITY_TIMEOUT_SECS";
pub const ENV_TERMINAL_CAPABILITY: &str = "DRAFTFLOW_TERMINAL_CAPABILITY";

/// Capability policy of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePolicy {
    /// Capability names the stage may request.
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub choice: CapabilityChoice,
}

impl StagePolicy {
    pub fn new(capabilities: &[&str], choice: CapabilityChoice) -> Self {
        Self {
            capabilities: capabilities.iter().map(|s| s.to_string()).collect(),
            choice,
        }
    }

    fn coordinator() -> Self {
        Self::new(&[SAVE], CapabilityChoice::Auto)
    }

    fn worker() -> Self {
        Self::new(&[WEB_SEARCH, GOOGLE_SCHOLAR], CapabilityChoice::Required)
    }
}

fn coordinator_policy() -> StagePolicy {
    StagePolicy::coordinator()
}

fn worker_policy() -> StagePolicy {
    StagePolicy::worker()
}

/// Per-stage capability policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagesConfig {
    #[serde(default = "coordinator_policy")]
    pub coordinate: StagePolicy,
    #[serde(default = "worker_policy")]
    pub research: StagePolicy,
    #[serde(default = "worker_policy")]
    pub draft: StagePolicy,
    #[serde(default = "worker_policy")]
    pub edit: StagePolicy,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            coordinate: StagePolicy::coordinator(),
            research: StagePolicy::worker(),
            draft: StagePolicy::worker(),
            edit: StagePolicy::worker(),
        }
    }
}

impl StagesConfig {
    pub fn policy(&self, stage: Stage) -> &StagePolicy {
        match stage {
            Stage::Coordinate => &self.coordinate,
            Stage::Research => &self.research,
            Stage::Draft => &self.draft,
            Stage::Edit => &self.edit,
        }
    }

    pub fn policy_mut(&mut self, stage: Stage) -> &mut StagePolicy {
        match stage {
            Stage::Coordinate => &mut self.coordinate,
            Stage::Research => &mut self.research,
            Stage::Draft => &mut self.draft,
            Stage::Edit => &mut self.edit,
        }
    }
}

fn default_step_budget() -> usize {
    25
}

fn default_think_timeout() -> Option<u64> {
    Some(120)
}

fn default_capability_timeout() -> Option<u64> {
    Some(60)
}

fn default_terminal_capability() -> String {
    SAVE.to_string()
}

/// Configuration for one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum node applications per turn in run-to-completion mode.
    #[serde(default = "default_step_budget")]
    pub step_budget: usize,
    /// Timeout for each think call, in seconds. `None` waits indefinitely.
    #[serde(default = "default_think_timeout")]
    pub think_timeout_secs: Option<u64>,
    /// Timeout for each capability handler call, in seconds.
    #[serde(default = "default_capability_timeout")]
    pub capability_timeout_secs: Option<u64>,
    /// The capability whose sole request ends a run once answered.
    #[serde(default = "default_terminal_capability")]
    pub terminal_capability: String,
    #[serde(default)]
    pub stages: StagesConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_budget: default_step_budget(),
            think_timeout_secs: default_think_timeout(),
            capability_timeout_secs: default_capability_timeout(),
            terminal_capability: default_terminal_capability(),
            stages: StagesConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        log::debug!("Loaded engine config from {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// Apply `DRAFTFLOW_*` environment variables on top of this config.
    ///
    /// A timeout variable set to `0` or `none` disables that timeout.
    pub fn with_env_overrides(self) -> Result<Self, EngineError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Used by `with_env_overrides`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, EngineError> {
        if let Some(raw) = lookup(ENV_STEP_BUDGET) {
            self.step_budget = raw.trim().parse().map_err(|_| {
                EngineError::config(format!("{} must be a positive integer, got '{}'", ENV_STEP_BUDGET, raw))
            })?;
        }
        if let Some(raw) = lookup(ENV_THINK_TIMEOUT) {
            self.think_timeout_secs = parse_timeout(ENV_THINK_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CAPABILITY_TIMEOUT) {
            self.capability_timeout_secs = parse_timeout(ENV_CAPABILITY_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TERMINAL_CAPABILITY) {
            self.set_terminal_capability(raw.trim());
        }
        self.validate()?;
        Ok(self)
    }

    /// Replace the terminal capability, swapping it into the Coordinator's
    /// policy in place of the previous one.
    pub fn set_terminal_capability(&mut self, name: impl Into<String>) {
        let name = name.into();
        let previous = std::mem::replace(&mut self.terminal_capability, name.clone());
        let coordinator = &mut self.stages.policy_mut(Stage::Coordinate).capabilities;
        coordinator.retain(|c| *c != previous && *c != name);
        coordinator.push(name);
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.step_budget == 0 {
            return Err(EngineError::config("step_budget must be at least 1"));
        }
        if self.terminal_capability.trim().is_empty() {
            return Err(EngineError::config("terminal_capability must not be empty"));
        }
        if !self.stages.coordinate.capabilities.contains(&self.terminal_capability) {
            return Err(EngineError::config(format!(
                "terminal_capability '{}' is not in the coordinate stage's capabilities",
                self.terminal_capability
            )));
        }
        for stage in Stage::ALL {
            let policy = self.stages.policy(stage);
            if let Some(blank) = policy.capabilities.iter().find(|name| name.trim().is_empty()) {
                return Err(EngineError::config(format!(
                    "stage '{}' lists an empty capability name ({:?})",
                    stage, blank
                )));
            }
        }
        Ok(())
    }

    pub fn think_timeout(&self) -> Option<Duration> {
        self.think_timeout_secs.map(Duration::from_secs)
    }

    pub fn capability_timeout(&self) -> Option<Duration> {
        self.capability_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_timeout(key: &str, raw: &str) -> Result<Option<u64>, EngineError> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("none") || value == "0" {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| EngineError::config(format!("{} must be a number of seconds, got '{}'", key, raw)))
}
