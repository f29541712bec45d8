//! Request options and response records for content actions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// A content operation invocable against a block of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Summarize,
    Explain,
    KeyPoints,
    Suggestions,
    Rewrite,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Summarize => "summarize",
            Action::Explain => "explain",
            Action::KeyPoints => "keyPoints",
            Action::Suggestions => "suggestions",
            Action::Rewrite => "rewrite",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summarize" => Ok(Action::Summarize),
            "explain" => Ok(Action::Explain),
            "keyPoints" => Ok(Action::KeyPoints),
            "suggestions" => Ok(Action::Suggestions),
            "rewrite" => Ok(Action::Rewrite),
            other => Err(ActionError::Validation {
                reason: format!("unknown action: {other}"),
            }),
        }
    }
}

// ── Options ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummarizeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl SummarizeOptions {
    pub fn style(&self) -> &str {
        self.style.as_deref().unwrap_or("concise")
    }

    pub fn format(&self) -> &str {
        self.format.as_deref().unwrap_or("paragraph")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

impl ExplainOptions {
    pub fn depth(&self) -> &str {
        self.depth.as_deref().unwrap_or("detailed")
    }

    pub fn audience(&self) -> &str {
        self.audience.as_deref().unwrap_or("general")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_suggestions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
}

impl SuggestionsOptions {
    pub fn max_suggestions(&self) -> u32 {
        self.max_suggestions.unwrap_or(3)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewriteOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl RewriteOptions {
    pub fn style(&self) -> &str {
        self.style.as_deref().unwrap_or("professional")
    }

    pub fn tone(&self) -> &str {
        self.tone.as_deref().unwrap_or("neutral")
    }
}

// ── Structured results ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub point: String,
    /// 1 (minor) to 10 (critical). Fractional scores are allowed.
    pub importance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl KeyPoint {
    pub fn validate(&self) -> Result<(), ActionError> {
        if !(1.0..=10.0).contains(&self.importance) {
            return Err(ActionError::Validation {
                reason: format!(
                    "importance must be between 1 and 10, got {}",
                    self.importance
                ),
            });
        }
        if self.point.trim().is_empty() {
            return Err(ActionError::Validation {
                reason: "key point text is empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggestion: String,
    pub impact: Impact,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
}

/// A suggestion as seen mid-stream: any field may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialSuggestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<Impact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
}

impl PartialSuggestion {
    /// Read whatever fields are already usable; a half-written `impact` is skipped.
    pub fn from_partial(value: &serde_json::Value) -> Self {
        let text = |key: &str| value.get(key).and_then(|v| v.as_str()).map(String::from);
        Self {
            suggestion: text("suggestion"),
            impact: value
                .get("impact")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
            reasoning: text("reasoning"),
            implementation: text("implementation"),
        }
    }

    /// Convert once every required field has arrived.
    pub fn complete(&self) -> Option<Suggestion> {
        Some(Suggestion {
            suggestion: self.suggestion.clone()?,
            impact: self.impact?,
            reasoning: self.reasoning.clone()?,
            implementation: self.implementation.clone(),
        })
    }
}

/// One update of the suggestions stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionsSnapshot {
    #[serde(default)]
    pub suggestions: Vec<PartialSuggestion>,
}

impl SuggestionsSnapshot {
    pub fn from_partial(value: &serde_json::Value) -> Self {
        let suggestions = value
            .get("suggestions")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().map(PartialSuggestion::from_partial).collect())
            .unwrap_or_default();
        Self { suggestions }
    }

    /// Suggestions whose required fields have all arrived.
    pub fn completed(&self) -> Vec<Suggestion> {
        self.suggestions
            .iter()
            .filter_map(PartialSuggestion::complete)
            .collect()
    }
}

/// An alternative version of a text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub title: String,
    pub content: String,
}

// ── Responses ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SummarizeResponse {
    pub fn ok(summary: String) -> Self {
        Self {
            success: true,
            summary: Some(summary),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            summary: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPointsResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<KeyPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KeyPointsResponse {
    pub fn ok(points: Vec<KeyPoint>) -> Self {
        Self {
            success: true,
            points: Some(points),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            points: None,
            error: Some(error.to_string()),
        }
    }
}
