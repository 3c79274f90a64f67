use crate::similarity::rank_descending_by_cosine;
use parking_lot::RwLock;
use pl_domain::error::Result;
use pl_providers::traits::{ScoredChunk, VectorCollection, VectorEntry};

/// Brute-force vector collection held in memory.
///
/// Entries are kept in insertion order; ranking ties resolve to the entry
/// inserted first.
#[derive(Default)]
pub struct InMemoryCollection {
    entries: RwLock<Vec<VectorEntry>>,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VectorCollection for InMemoryCollection {
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<()> {
        let mut guard = self.entries.write();
        for entry in entries {
            match guard.iter_mut().find(|e| e.chunk.id == entry.chunk.id) {
                Some(existing) => *existing = entry,
                None => guard.push(entry),
            }
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let guard = self.entries.read();
        let candidates: Vec<&[f32]> = guard.iter().map(|e| e.embedding.as_slice()).collect();
        let ranked = rank_descending_by_cosine(embedding, &candidates)?;

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(idx, score)| ScoredChunk {
                chunk: guard[idx].chunk.clone(),
                score,
            })
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }
}
