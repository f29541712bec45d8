//! Error types for Reviver.

use std::time::Duration;

use crate::dedup::DedupError;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Stream from {provider} stalled for {timeout:?}")]
    StreamTimeout { provider: String, timeout: Duration },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by content actions.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{0}")]
    EmptyContent(String),

    #[error("Action {action} is disabled")]
    Disabled { action: String },

    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    #[error("Could not parse {what} from model output: {reason}")]
    Unparseable { what: String, reason: String },

    #[error(transparent)]
    Aborted(#[from] DedupError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Result type alias for Reviver.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_dedup_names_the_key() {
        let err = ActionError::from(DedupError::Aborted {
            key: "summarize:text:null".to_string(),
            reason: "operation panicked".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Request summarize:text:null aborted: operation panicked"
        );
    }

    #[test]
    fn top_level_error_wraps_sources() {
        let err = Error::from(ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required environment variable: OPENAI_API_KEY"
        );

        let err = Error::from(LlmError::AuthFailed {
            provider: "openai".to_string(),
        });
        assert!(matches!(err, Error::Llm(LlmError::AuthFailed { .. })));
    }
}
