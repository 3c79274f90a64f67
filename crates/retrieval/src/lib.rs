pub mod augment;
pub mod chunking;
pub mod collection;
pub mod report;
pub mod similarity;
pub mod store;

pub use augment::{augment, PromptAugmentor};
pub use collection::InMemoryCollection;
pub use report::IndexReport;
pub use store::DocumentStore;
