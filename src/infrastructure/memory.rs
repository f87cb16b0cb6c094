use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::debug;

use crate::domain::document::{IndexedRecord, Metric};
use crate::domain::vector_store::{RawScore, ScoredMatch, VectorIndex, VectorStore};
use crate::error::MatchError;

#[derive(Debug)]
struct IndexData {
    dimension: usize,
    metric: Metric,
    // Bumped on every create, so a handle obtained before a
    // delete-and-recreate cannot write into the successor index.
    generation: u64,
    // Keyed by record id so upsert overwrites instead of duplicating.
    records: BTreeMap<String, (Vec<f32>, BTreeMap<String, String>)>,
}

type Shared = Arc<RwLock<HashMap<String, IndexData>>>;

/// In-process vector store with brute-force exact scoring.
///
/// Backs the test suite and offline runs; small corpora only. Implements
/// the full index lifecycle contract, including rejection of writes whose
/// vector length disagrees with the declared index dimension.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Shared,
    generations: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, IndexData>>, MatchError> {
        self.inner
            .read()
            .map_err(|_| MatchError::Store("memory store lock poisoned".into()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, IndexData>>, MatchError> {
        self.inner
            .write()
            .map_err(|_| MatchError::Store("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn list_indexes(&self) -> Result<Vec<String>, MatchError> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_index(
        &self,
        name: &str,
        dimension: usize,
        metric: Metric,
    ) -> Result<(), MatchError> {
        if name.is_empty() {
            return Err(MatchError::Store("index name cannot be empty".into()));
        }
        if dimension == 0 {
            return Err(MatchError::Store("index dimension must be at least 1".into()));
        }
        let mut indexes = self.write()?;
        if indexes.contains_key(name) {
            return Err(MatchError::IndexAlreadyExists(name.to_string()));
        }
        debug!("Creating in-memory index '{name}' (dim {dimension}, metric {metric})");
        indexes.insert(
            name.to_string(),
            IndexData {
                dimension,
                metric,
                generation: self.generations.fetch_add(1, Ordering::SeqCst),
                records: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<(), MatchError> {
        let mut indexes = self.write()?;
        if indexes.remove(name).is_none() {
            return Err(MatchError::IndexNotFound(name.to_string()));
        }
        Ok(())
    }

    async fn get_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>, MatchError> {
        let indexes = self.read()?;
        let data = indexes
            .get(name)
            .ok_or_else(|| MatchError::IndexNotFound(name.to_string()))?;
        Ok(Arc::new(MemoryIndex {
            name: name.to_string(),
            dimension: data.dimension,
            metric: data.metric,
            generation: data.generation,
            inner: self.inner.clone(),
        }))
    }
}

struct MemoryIndex {
    name: String,
    dimension: usize,
    metric: Metric,
    generation: u64,
    inner: Shared,
}

impl MemoryIndex {
    /// Resolves the live index data for this handle. A handle outlives
    /// neither a delete nor a delete-and-recreate: both invalidate it, so
    /// writes can never land in a successor index with a different schema.
    fn live<'a>(
        &self,
        indexes: &'a mut HashMap<String, IndexData>,
    ) -> Result<&'a mut IndexData, MatchError> {
        let data = indexes
            .get_mut(&self.name)
            .ok_or_else(|| MatchError::IndexNotFound(self.name.clone()))?;
        if data.generation != self.generation {
            return Err(MatchError::IndexNotFound(self.name.clone()));
        }
        Ok(data)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<(), MatchError> {
        let mut indexes = self
            .inner
            .write()
            .map_err(|_| MatchError::Store("memory store lock poisoned".into()))?;
        let data = self.live(&mut indexes)?;
        // Validate the whole slice against the live index schema, under
        // the write lock, before touching anything: a mismatched record
        // must not leave a partial write behind.
        for record in records {
            if record.vector.len() != data.dimension {
                return Err(MatchError::DimensionMismatch {
                    index: self.name.clone(),
                    expected: data.dimension,
                    actual: record.vector.len(),
                });
            }
        }
        for record in records {
            data.records.insert(
                record.id.clone(),
                (record.vector.clone(), record.metadata.clone()),
            );
        }
        Ok(())
    }

    async fn query(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<ScoredMatch>, MatchError> {
        let indexes = self
            .inner
            .read()
            .map_err(|_| MatchError::Store("memory store lock poisoned".into()))?;
        let data = indexes
            .get(&self.name)
            .filter(|data| data.generation == self.generation)
            .ok_or_else(|| MatchError::IndexNotFound(self.name.clone()))?;
        if vector.len() != data.dimension {
            return Err(MatchError::DimensionMismatch {
                index: self.name.clone(),
                expected: data.dimension,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(f32, ScoredMatch)> = data
            .records
            .iter()
            .map(|(id, (v, metadata))| {
                let (order_key, raw_score) = match self.metric {
                    Metric::Cosine => {
                        let s = cosine_similarity(&vector, v);
                        (s, RawScore::Similarity(s))
                    }
                    Metric::Dot => {
                        let s = dot(&vector, v);
                        (s, RawScore::Similarity(s))
                    }
                    // Euclidean is a distance: smaller is better, so rank
                    // by the negated value.
                    Metric::Euclid => {
                        let d = euclidean(&vector, v);
                        (-d, RawScore::Distance(d))
                    }
                };
                (
                    order_key,
                    ScoredMatch {
                        id: id.clone(),
                        metadata: metadata.clone(),
                        raw_score,
                    },
                )
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(_, m)| m).collect())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, vector: Vec<f32>, category: &str) -> IndexedRecord {
        IndexedRecord::new(id, vector).with_metadata("category", category)
    }

    #[tokio::test]
    async fn lifecycle_create_list_delete() {
        let store = MemoryStore::new();
        store.create_index("resumes", 3, Metric::Cosine).await.unwrap();
        assert_eq!(store.list_indexes().await.unwrap(), vec!["resumes"]);

        let err = store.create_index("resumes", 3, Metric::Cosine).await.unwrap_err();
        assert!(matches!(err, MatchError::IndexAlreadyExists(name) if name == "resumes"));

        store.delete_index("resumes").await.unwrap();
        assert!(store.list_indexes().await.unwrap().is_empty());

        let err = store.delete_index("resumes").await.unwrap_err();
        assert!(matches!(err, MatchError::IndexNotFound(_)));
        // `Arc<dyn VectorIndex>` has no Debug impl, so drop the Ok side
        // before unwrapping the error.
        let err = store.get_index("resumes").await.map(|_| ()).unwrap_err();
        assert!(matches!(err, MatchError::IndexNotFound(_)));
    }

    #[tokio::test]
    async fn self_match_is_top_match() {
        let store = MemoryStore::new();
        store.create_index("idx", 3, Metric::Cosine).await.unwrap();
        let index = store.get_index("idx").await.unwrap();
        index
            .upsert(&[
                record("r1", vec![1.0, 0.0, 0.0], "CHEF"),
                record("r2", vec![0.0, 1.0, 0.0], "ENGINEERING"),
            ])
            .await
            .unwrap();

        let results = index.query(vec![1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "r1");
        let top = results[0].raw_score.resolve().unwrap();
        let second = results[1].raw_score.resolve().unwrap();
        assert!((top - 1.0).abs() < 1e-5, "self match should score ~1.0");
        assert!(top > second);
        assert_eq!(
            results[0].metadata.get("category").map(String::as_str),
            Some("CHEF")
        );
    }

    #[tokio::test]
    async fn returns_all_records_when_fewer_than_top_k() {
        let store = MemoryStore::new();
        store.create_index("idx", 2, Metric::Cosine).await.unwrap();
        let index = store.get_index("idx").await.unwrap();
        index
            .upsert(&[
                record("a", vec![1.0, 0.0], "X"),
                record("b", vec![0.0, 1.0], "Y"),
                record("c", vec![0.5, 0.5], "Z"),
            ])
            .await
            .unwrap();

        let results = index.query(vec![1.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let store = MemoryStore::new();
        store.create_index("idx", 2, Metric::Cosine).await.unwrap();
        let index = store.get_index("idx").await.unwrap();

        index.upsert(&[record("a", vec![1.0, 0.0], "OLD")]).await.unwrap();
        index.upsert(&[record("a", vec![0.0, 1.0], "NEW")]).await.unwrap();

        let results = index.query(vec![0.0, 1.0], 10).await.unwrap();
        assert_eq!(results.len(), 1, "same id must not duplicate");
        assert_eq!(
            results[0].metadata.get("category").map(String::as_str),
            Some("NEW")
        );
        assert!((results[0].raw_score.resolve().unwrap() - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn dimension_mismatch_leaves_no_partial_write() {
        let store = MemoryStore::new();
        store.create_index("idx", 3, Metric::Cosine).await.unwrap();
        let index = store.get_index("idx").await.unwrap();

        let err = index
            .upsert(&[
                record("ok", vec![1.0, 0.0, 0.0], "X"),
                record("bad", vec![1.0, 0.0], "Y"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MatchError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));

        // The valid record ahead of the bad one must not have been written.
        let results = index.query(vec![1.0, 0.0, 0.0], 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn euclid_index_reports_distance_scores() {
        let store = MemoryStore::new();
        store.create_index("idx", 2, Metric::Euclid).await.unwrap();
        let index = store.get_index("idx").await.unwrap();
        index
            .upsert(&[
                record("near", vec![0.1, 0.0], "X"),
                record("far", vec![5.0, 5.0], "Y"),
            ])
            .await
            .unwrap();

        let results = index.query(vec![0.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].id, "near");
        assert!(matches!(results[0].raw_score, RawScore::Distance(_)));
        let d_near = match results[0].raw_score {
            RawScore::Distance(d) => d,
            _ => unreachable!(),
        };
        assert!((d_near - 0.1).abs() < 1e-5);
    }

    #[tokio::test]
    async fn query_with_wrong_dimension_fails() {
        let store = MemoryStore::new();
        store.create_index("idx", 3, Metric::Cosine).await.unwrap();
        let index = store.get_index("idx").await.unwrap();
        let err = index.query(vec![1.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, MatchError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn stale_handle_cannot_write_into_a_recreated_index() {
        let store = MemoryStore::new();
        store.create_index("idx", 3, Metric::Cosine).await.unwrap();
        let old_handle = store.get_index("idx").await.unwrap();

        store.delete_index("idx").await.unwrap();
        store.create_index("idx", 2, Metric::Cosine).await.unwrap();

        // The old handle must not be able to smuggle 3-length vectors
        // into the recreated 2-dimension index.
        let err = old_handle
            .upsert(&[record("r1", vec![0.1, 0.2, 0.3], "X")])
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::IndexNotFound(_)));
        let err = old_handle.query(vec![1.0, 0.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, MatchError::IndexNotFound(_)));

        let new_handle = store.get_index("idx").await.unwrap();
        let results = new_handle.query(vec![1.0, 0.0], 10).await.unwrap();
        assert!(results.is_empty(), "recreated index must contain no stale records");
        new_handle
            .upsert(&[record("r2", vec![1.0, 0.0], "Y")])
            .await
            .unwrap();
        assert_eq!(new_handle.query(vec![1.0, 0.0], 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_handle_after_delete_reports_index_not_found() {
        let store = MemoryStore::new();
        store.create_index("idx", 2, Metric::Cosine).await.unwrap();
        let index = store.get_index("idx").await.unwrap();
        store.delete_index("idx").await.unwrap();

        let err = index.query(vec![1.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, MatchError::IndexNotFound(_)));
    }
}
