use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::document::{IndexedRecord, Metric};
use crate::error::MatchError;

/// Score as reported by a store backend, before reconciliation.
///
/// Backends disagree on shape: some return a cosine similarity, some a raw
/// distance, some nothing at all. The adapter tags what it actually got and
/// [`RawScore::resolve`] maps all shapes onto one "higher is better" score
/// exactly once, instead of every caller re-deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RawScore {
    /// Already "higher is better" (cosine similarity in [0, 1] or a dot
    /// product); passed through unchanged.
    Similarity(f32),
    /// A distance; converted via `1 - d`. Only meaningful for cosine
    /// distance in [0, 2] — an assumption of the backend, not a protocol
    /// guarantee.
    Distance(f32),
    /// The store returned no score; its rank order is trusted as-is.
    Unscored,
}

impl RawScore {
    pub fn resolve(self) -> Option<f32> {
        match self {
            RawScore::Similarity(s) => Some(s),
            RawScore::Distance(d) => Some(1.0 - d),
            RawScore::Unscored => None,
        }
    }
}

/// One match as returned by a store adapter, in store rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub id: String,
    pub metadata: BTreeMap<String, String>,
    pub raw_score: RawScore,
}

/// A handle to one named index. Obtained from [`VectorStore::get_index`];
/// queries against an index that was deleted after the handle was obtained
/// fail with `IndexNotFound`.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Declared vector length of the index. Records with any other length
    /// are rejected with `DimensionMismatch` before anything is written.
    fn dimension(&self) -> usize;

    fn metric(&self) -> Metric;

    /// Inserts or overwrites records keyed by id.
    async fn upsert(&self, records: &[IndexedRecord]) -> Result<(), MatchError>;

    /// Returns up to `top_k` nearest records under the index metric, best
    /// first. Fewer than `top_k` records in the index is not an error.
    async fn query(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<ScoredMatch>, MatchError>;
}

/// Abstraction over the vector-store service: index lifecycle plus handle
/// lookup. Index existence and schema (dimension, metric) are owned here;
/// writers only ever go through a handle consistent with that schema.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn list_indexes(&self) -> Result<Vec<String>, MatchError>;

    /// Creates an empty, immediately queryable index. Fails with
    /// `IndexAlreadyExists` if the name is taken.
    async fn create_index(
        &self,
        name: &str,
        dimension: usize,
        metric: Metric,
    ) -> Result<(), MatchError>;

    /// Irreversibly removes the index and all its records. Fails with
    /// `IndexNotFound` if absent.
    async fn delete_index(&self, name: &str) -> Result<(), MatchError>;

    async fn get_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>, MatchError>;
}
