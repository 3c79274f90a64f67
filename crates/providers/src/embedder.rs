//! Offline embedding via feature hashing.
//!
//! Each lowercase alphanumeric token is hashed with SHA-256 into one of
//! `dims` buckets with a ±1 sign taken from the digest, and the resulting
//! bag-of-words vector is L2-normalised. Texts sharing vocabulary land close
//! together under cosine similarity, which is enough for local retrieval
//! without a model server.

use crate::traits::EmbeddingBackend;
use pl_domain::error::{Error, Result};
use sha2::{Digest, Sha256};

pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            return Err(Error::InvalidArgument(
                "hashing embedder needs at least one dimension".into(),
            ));
        }
        Ok(Self { dims })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut idx_bytes = [0u8; 8];
            idx_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(idx_bytes) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait::async_trait]
impl EmbeddingBackend for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn backend_id(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn deterministic_and_normalised() {
        let e = HashingEmbedder::new(64).unwrap();
        let a = e.embed_sync("Paris is the capital of France.");
        let b = e.embed_sync("Paris is the capital of France.");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn case_and_punctuation_insensitive() {
        let e = HashingEmbedder::new(128).unwrap();
        assert_eq!(e.embed_sync("Capital, FRANCE!"), e.embed_sync("capital france"));
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let e = HashingEmbedder::new(256).unwrap();
        let q = e.embed_sync("capital of France");
        let hit = e.embed_sync("Paris is the capital of France.");
        let miss = e.embed_sync("Rust has ownership and borrowing.");
        assert!(dot(&q, &hit) > dot(&q, &miss));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(8).unwrap();
        assert!(e.embed_sync("  ...  ").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn zero_dims_rejected() {
        assert!(HashingEmbedder::new(0).is_err());
    }
}
