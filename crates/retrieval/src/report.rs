use pl_domain::turn::Chunk;
use serde::{Deserialize, Serialize};

/// Per-source summary within an indexing run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceReport {
    /// File path, or `<inline>` for documents without a source.
    pub source: String,
    pub chunks: usize,
    pub chars: usize,
}

/// Summary of what an indexing run added to the store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexReport {
    pub sources: Vec<SourceReport>,
    pub total_chunks: usize,
    pub total_chars: usize,
}

impl IndexReport {
    /// Group chunks by source, keeping first-seen order.
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let mut sources: Vec<SourceReport> = Vec::new();
        for chunk in chunks {
            let source = chunk.source.as_deref().unwrap_or("<inline>");
            let chars = chunk.text.chars().count();
            match sources.iter_mut().find(|s| s.source == source) {
                Some(s) => {
                    s.chunks += 1;
                    s.chars += chars;
                }
                None => sources.push(SourceReport {
                    source: source.to_string(),
                    chunks: 1,
                    chars,
                }),
            }
        }
        let total_chars = sources.iter().map(|s| s.chars).sum();
        Self {
            sources,
            total_chunks: chunks.len(),
            total_chars,
        }
    }
}
