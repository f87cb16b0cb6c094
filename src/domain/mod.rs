pub mod document;
pub mod embedder;
pub mod text;
pub mod vector_store;

pub use document::{Document, IndexedRecord, Metric, QueryResult};
pub use embedder::TextEmbedder;
pub use vector_store::{RawScore, ScoredMatch, VectorIndex, VectorStore};
