//! LLM integration for Reviver.
//!
//! Any OpenAI-compatible chat completions endpoint is supported through
//! [`OpenAiProvider`]; callers program against the [`LlmProvider`] trait.

pub mod costs;
pub mod openai;
pub mod provider;

pub use costs::estimate_cost;
pub use openai::OpenAiProvider;
pub use provider::*;

use std::sync::Arc;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub base_url: String,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = OpenAiProvider::new(
        config.api_key.clone(),
        config.base_url.clone(),
        config.model.clone(),
    )?;
    tracing::info!(model = %config.model, base_url = %config.base_url, "Using OpenAI-compatible provider");
    Ok(Arc::new(provider))
}
