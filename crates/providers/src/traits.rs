use pl_domain::error::Result;
use pl_domain::stream::{BoxStream, StreamMode};
use pl_domain::turn::{Chunk, History};
use std::path::{Path, PathBuf};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Result of a non-streaming chat call.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    /// The history the backend would use for the next turn, i.e. the input
    /// history with `(query, response)` appended.
    pub history: History,
}

/// One chunk ready to be stored in a [`VectorCollection`].
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A stored chunk together with its similarity to a query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Collaborator traits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A text generation model.
///
/// Adapters translate the flat `(query, history)` form into whatever wire
/// format the model server speaks.
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a full response and wait for it.
    async fn chat(&self, query: &str, history: &[(String, String)]) -> Result<ChatReply>;

    /// Generate a response as a stream of text chunks.
    ///
    /// How chunks relate to each other is given by [`Self::stream_mode`].
    async fn chat_stream(
        &self,
        query: &str,
        history: &[(String, String)],
    ) -> Result<BoxStream<'static, Result<String>>>;

    fn stream_mode(&self) -> StreamMode {
        StreamMode::Cumulative
    }

    /// Optional post-processing of a finished response, e.g. recording the
    /// boxes a vision model referenced on the source image. `history` ends
    /// with the pair that produced `response`. Returns the path of the
    /// produced artifact, if any.
    async fn draw_annotation(
        &self,
        _response: &str,
        _history: &[(String, String)],
    ) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    /// A unique identifier for this backend instance.
    fn backend_id(&self) -> &str;
}

/// Turns text into a dense vector.
#[async_trait::async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn backend_id(&self) -> &str;
}

/// Extracts plain text from a file on disk.
///
/// Unsupported file types yield an empty string; a missing path is
/// [`pl_domain::error::Error::NotFound`].
#[async_trait::async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<String>;
}

/// A similarity-searchable store of embedded chunks.
#[async_trait::async_trait]
pub trait VectorCollection: Send + Sync {
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<()>;

    /// Up to `k` stored chunks, most similar first. Equal scores keep
    /// insertion order.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    async fn clear(&self) -> Result<()>;

    async fn len(&self) -> Result<usize>;
}
