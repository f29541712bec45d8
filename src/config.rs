//! Configuration types.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::llm::LlmConfig;
use crate::llm::openai::DEFAULT_BASE_URL;
use crate::model::Action;

/// Which actions are offered and how the overlays behave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviverConfig {
    pub vivify: VivifyConfig,
    pub interceptor: InterceptorConfig,
    pub text_area: TextAreaConfig,
}

/// Actions attached to page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VivifyConfig {
    pub actions: Vec<Action>,
    pub context_menu: bool,
    pub hover_card: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterceptorPosition {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptorConfig {
    pub show_confirmation: bool,
    pub position: InterceptorPosition,
}

/// Writing aids attached to text inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAreaConfig {
    pub suggestions: bool,
    pub auto_complete: bool,
    pub enhancement_actions: Vec<Action>,
}

impl Default for ReviverConfig {
    fn default() -> Self {
        Self {
            vivify: VivifyConfig {
                actions: vec![Action::Summarize, Action::Explain, Action::KeyPoints],
                context_menu: true,
                hover_card: true,
            },
            interceptor: InterceptorConfig {
                show_confirmation: true,
                position: InterceptorPosition::Bottom,
            },
            text_area: TextAreaConfig {
                suggestions: true,
                auto_complete: true,
                enhancement_actions: vec![Action::Rewrite, Action::Suggestions],
            },
        }
    }
}

impl ReviverConfig {
    /// Apply a partial configuration (JSON) over the defaults.
    pub fn with_overrides(overrides: &serde_json::Value) -> Result<Self, ConfigError> {
        let mut merged = serde_json::to_value(Self::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        deep_merge(&mut merged, overrides);
        serde_json::from_value(merged).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load a partial configuration file and merge it over the defaults.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let overrides: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::with_overrides(&overrides)
    }

    /// Whether any surface offers `action`.
    pub fn is_enabled(&self, action: Action) -> bool {
        self.vivify.actions.contains(&action) || self.text_area.enhancement_actions.contains(&action)
    }
}

/// Merge `source` into `target`: objects merge key by key, everything else replaces.
pub fn deep_merge(target: &mut serde_json::Value, source: &serde_json::Value) {
    match (target, source) {
        (serde_json::Value::Object(target), serde_json::Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) if value.is_object() => deep_merge(existing, value),
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

/// Demo server configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub llm: LlmConfig,
    pub port: u16,
    /// Optional partial `ReviverConfig` JSON file.
    pub config_file: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let model = std::env::var("REVIVER_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let port = match std::env::var("REVIVER_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "REVIVER_PORT".to_string(),
                message: format!("not a port number: {raw}"),
            })?,
            Err(_) => 3000,
        };

        let config_file = std::env::var("REVIVER_CONFIG_FILE").ok().map(PathBuf::from);

        Ok(Self {
            llm: LlmConfig {
                api_key: SecretString::from(api_key),
                base_url,
                model,
            },
            port,
            config_file,
        })
    }

    /// The action configuration: defaults, overridden by the config file when set.
    pub async fn reviver_config(&self) -> Result<ReviverConfig, ConfigError> {
        match &self.config_file {
            Some(path) => ReviverConfig::load(path).await,
            None => Ok(ReviverConfig::default()),
        }
    }
}
