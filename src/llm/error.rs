//! Think call error types.

use std::time::Duration;

use thiserror::Error;

use crate::agents::Stage;

/// Error type for think calls.
///
/// A think error never aborts a run: the stage records it as its reply and
/// routing continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ThinkError {
    /// The call did not finish within the configured timeout.
    #[error("think call for {stage} timed out after {}s", .after.as_secs())]
    Timeout { stage: Stage, after: Duration },

    /// The provider reported an error (network, authentication, rate limit).
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider answered but the answer could not be interpreted.
    #[error("malformed think result: {0}")]
    Malformed(String),
}

impl ThinkError {
    /// Create a provider error.
    pub fn provider(msg: impl Into<String>) -> Self {
        ThinkError::Provider(msg.into())
    }

    /// Create a malformed-result error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        ThinkError::Malformed(msg.into())
    }
}

impl From<serde_json::Error> for ThinkError {
    fn from(err: serde_json::Error) -> Self {
        ThinkError::Malformed(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ThinkError::Timeout {
            stage: Stage::Draft,
            after: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "think call for draft timed out after 30s");
        assert_eq!(ThinkError::provider("429").to_string(), "provider error: 429");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(ThinkError::from(json_err), ThinkError::Malformed(_)));
    }
}
