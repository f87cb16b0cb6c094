pub mod embedding;
pub mod ingest;
pub mod memory;
pub mod qdrant;
pub mod snapshot;

pub use embedding::{resolve_model, FastEmbedder};
pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

// Re-export the model enum directly from the dependency.
pub use fastembed::EmbeddingModel;
