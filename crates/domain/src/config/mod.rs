mod llm;
mod observability;
mod prompt;
mod retrieval;
mod session;

pub use llm::*;
pub use observability::*;
pub use prompt::*;
pub use retrieval::*;
pub use session::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.llm.base_url.is_empty() {
            errors.push(ConfigError::error("llm.base_url", "base_url must not be empty"));
        }
        if self.llm.model.is_empty() {
            errors.push(ConfigError::error("llm.model", "model must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            errors.push(ConfigError::error(
                "llm.temperature",
                "temperature must be within 0.0..=2.0",
            ));
        }
        if self.llm.timeout_ms == 0 {
            errors.push(ConfigError::error("llm.timeout_ms", "timeout must be greater than 0"));
        }
        if std::env::var(&self.llm.api_key_env).is_err() {
            errors.push(ConfigError::warning(
                "llm.api_key_env",
                format!("{} is not set; requests will be sent without auth", self.llm.api_key_env),
            ));
        }

        if self.retrieval.chunk_size == 0 {
            errors.push(ConfigError::error(
                "retrieval.chunk_size",
                "chunk_size must be greater than 0",
            ));
        }
        if self.retrieval.top_k == 0 {
            errors.push(ConfigError::error("retrieval.top_k", "top_k must be greater than 0"));
        }
        if self.retrieval.embedder == EmbedderKind::Hashing && self.retrieval.hashing_dims == 0 {
            errors.push(ConfigError::error(
                "retrieval.hashing_dims",
                "hashing_dims must be greater than 0",
            ));
        }

        // A template loaded from disk is checked by the CLI after reading it.
        if self.prompt.template_path.is_none() {
            if !self.prompt.template.contains(QUERY_PLACEHOLDER) {
                errors.push(ConfigError::error(
                    "prompt.template",
                    format!("template must contain {QUERY_PLACEHOLDER}"),
                ));
            }
            if self.retrieval.enabled && !self.prompt.template.contains(SEARCH_RESULTS_PLACEHOLDER) {
                errors.push(ConfigError::warning(
                    "prompt.template",
                    format!(
                        "retrieval is enabled but the template has no {SEARCH_RESULTS_PLACEHOLDER}; \
                         retrieved chunks will be dropped"
                    ),
                ));
            }
        }

        if self.session.channel_capacity == 0 {
            errors.push(ConfigError::error(
                "session.channel_capacity",
                "channel_capacity must be greater than 0",
            ));
        }

        errors
    }

    /// True when `validate` reports at least one hard error.
    pub fn has_errors(&self) -> bool {
        self.validate()
            .iter()
            .any(|e| e.severity == ConfigSeverity::Error)
    }
}
