//! Semantic resume/job matching: normalize free text, embed it into a
//! fixed-dimension vector space, persist it in a vector index and query
//! for nearest neighbors.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::{IndexService, Matcher};
pub use config::{load_config, MatchConfig};
pub use domain::{
    Document, IndexedRecord, Metric, QueryResult, RawScore, ScoredMatch, TextEmbedder,
    VectorIndex, VectorStore,
};
pub use error::MatchError;
pub use fastembed::EmbeddingModel;
pub use infrastructure::{resolve_model, FastEmbedder, MemoryStore, QdrantStore};
