use crate::chunking;
use pl_domain::error::{Error, Result};
use pl_domain::trace::TraceEvent;
use pl_domain::turn::{Chunk, Document, DEFAULT_CHUNK_SIZE};
use pl_providers::traits::{DocumentLoader, EmbeddingBackend, VectorCollection, VectorEntry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Chunk → embed → store → rank pipeline over a [`VectorCollection`].
///
/// Concurrent calls are serialized by the collection's own locking; the store
/// holds no mutable state of its own.
pub struct DocumentStore {
    embedder: Arc<dyn EmbeddingBackend>,
    collection: Arc<dyn VectorCollection>,
    chunk_size: usize,
}

impl DocumentStore {
    pub fn new(embedder: Arc<dyn EmbeddingBackend>, collection: Arc<dyn VectorCollection>) -> Self {
        Self {
            embedder,
            collection,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument("chunk_size must be greater than 0".into()));
        }
        self.chunk_size = chunk_size;
        Ok(self)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split, embed and store `documents`. Returns the chunks created, in
    /// document order.
    ///
    /// Identical content indexed twice is stored twice.
    pub async fn index(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        let start = Instant::now();
        let mut entries = Vec::new();

        for doc in documents {
            for text in chunking::split_into_chunks(&doc.text, self.chunk_size) {
                let embedding = self.embed(&text).await?;
                entries.push(VectorEntry {
                    chunk: Chunk {
                        id: uuid::Uuid::new_v4().to_string(),
                        document_id: doc.id.clone(),
                        text,
                        source: doc.source.clone(),
                    },
                    embedding,
                });
            }
        }

        let chunks: Vec<Chunk> = entries.iter().map(|e| e.chunk.clone()).collect();
        if !entries.is_empty() {
            self.collection.upsert(entries).await?;
        }

        TraceEvent::DocumentsIndexed {
            documents: documents.len(),
            chunks: chunks.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();

        Ok(chunks)
    }

    /// Load each path through `loader` and index the results, with the path
    /// recorded as each document's source.
    pub async fn index_files(
        &self,
        loader: &dyn DocumentLoader,
        paths: &[PathBuf],
    ) -> Result<Vec<Chunk>> {
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = loader.load(path).await?;
            documents.push(Document::new(text).with_source(path.display().to_string()));
        }
        self.index(&documents).await
    }

    /// Up to `k` chunks most similar to `query`, best first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        if self.collection.len().await? == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embed(query).await?;
        let hits = self.collection.query(&embedding, k).await?;

        tracing::debug!(
            k,
            returned = hits.len(),
            top_score = hits.first().map(|h| h.score).unwrap_or(0.0),
            "retrieved chunks"
        );
        TraceEvent::ChunksRetrieved {
            query_chars: query.chars().count(),
            requested: k,
            returned: hits.len(),
        }
        .emit();

        Ok(hits.into_iter().map(|h| h.chunk).collect())
    }

    pub async fn clear(&self) -> Result<()> {
        self.collection.clear().await?;
        tracing::info!("document store cleared");
        Ok(())
    }

    pub async fn len(&self) -> Result<usize> {
        self.collection.len().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).await.map_err(|e| match e {
            Error::BackendUnavailable { .. } => e,
            other => Error::backend(self.embedder.backend_id(), other),
        })
    }
}
