pub mod annotation;
pub mod embedder;
pub mod loader;
pub mod openai_compat;
pub mod pdf;
pub mod traits;
pub(crate) mod sse;
pub mod util;

// Re-exports for convenience.
pub use annotation::GroundingAnnotator;
pub use embedder::HashingEmbedder;
pub use loader::FsDocumentLoader;
pub use openai_compat::OpenAiCompatBackend;
pub use traits::{
    ChatReply, DocumentLoader, EmbeddingBackend, GenerationBackend, ScoredChunk,
    VectorCollection, VectorEntry,
};
