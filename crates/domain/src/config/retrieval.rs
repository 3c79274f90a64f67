use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Retrieval
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Augment every generation with retrieved context.
    #[serde(default)]
    pub enabled: bool,
    /// Index `documents_path` when the CLI starts a session.
    #[serde(default)]
    pub index_on_start: bool,
    #[serde(default = "d_documents_path")]
    pub documents_path: PathBuf,
    #[serde(default = "d_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "d_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub embedder: EmbedderKind,
    /// Vector width for the offline hashing embedder.
    #[serde(default = "d_hashing_dims")]
    pub hashing_dims: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            index_on_start: false,
            documents_path: d_documents_path(),
            chunk_size: d_chunk_size(),
            top_k: d_top_k(),
            embedder: EmbedderKind::Hashing,
            hashing_dims: d_hashing_dims(),
        }
    }
}

/// Which embedding backend feeds the document store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Deterministic, offline feature hashing.
    #[default]
    Hashing,
    /// The `/embeddings` endpoint of the configured LLM server.
    Remote,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_documents_path() -> PathBuf {
    PathBuf::from("./documents")
}
fn d_chunk_size() -> usize {
    300
}
fn d_top_k() -> usize {
    4
}
fn d_hashing_dims() -> usize {
    256
}
