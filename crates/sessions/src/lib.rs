//! Conversation sessions for parley.
//!
//! Owns the raw interaction log, turns it into backend input, and drives
//! streaming generation with cooperative cancellation, rollback and reset.

pub mod cancel;
pub mod compactor;
pub mod presentation;
pub mod session;

pub use cancel::CancelToken;
pub use compactor::HistoryCompactor;
pub use session::{GenerationSession, Phase, RetrievalContext, StopHandle};
