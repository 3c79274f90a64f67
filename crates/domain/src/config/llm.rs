use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Generation / embedding backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for an OpenAI-compatible chat/embedding endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL up to and including the version segment,
    /// e.g. `http://localhost:11434/v1`.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Environment variable holding the bearer token. Local servers
    /// typically need none; an unset variable sends no auth header.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Model used when `retrieval.embedder = "remote"`.
    #[serde(default = "d_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            api_key_env: d_api_key_env(),
            model: d_model(),
            embedding_model: d_embedding_model(),
            temperature: d_temperature(),
            max_tokens: None,
            timeout_ms: d_timeout_ms(),
        }
    }
}

fn d_base_url() -> String {
    "http://localhost:11434/v1".into()
}
fn d_api_key_env() -> String {
    "PARLEY_API_KEY".into()
}
fn d_model() -> String {
    "qwen2.5:7b-instruct".into()
}
fn d_embedding_model() -> String {
    "nomic-embed-text".into()
}
fn d_temperature() -> f32 {
    0.7
}
fn d_timeout_ms() -> u64 {
    60_000
}
