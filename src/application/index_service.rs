use std::sync::Arc;

use log::{info, warn};

use crate::domain::document::{IndexedRecord, Metric};
use crate::domain::vector_store::{VectorIndex, VectorStore};
use crate::error::MatchError;
use crate::infrastructure::snapshot::Snapshot;

/// Owns the lifecycle of named indexes and pushes corpus vectors into them
/// in bounded-size batches.
pub struct IndexService {
    store: Arc<dyn VectorStore>,
}

impl IndexService {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    pub async fn list_indexes(&self) -> Result<Vec<String>, MatchError> {
        self.store.list_indexes().await
    }

    pub async fn create_index(
        &self,
        name: &str,
        dimension: usize,
        metric: Metric,
    ) -> Result<(), MatchError> {
        self.store.create_index(name, dimension, metric).await
    }

    pub async fn delete_index(&self, name: &str) -> Result<(), MatchError> {
        self.store.delete_index(name).await
    }

    pub async fn get_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>, MatchError> {
        self.store.get_index(name).await
    }

    /// Idempotent-recreate flow used before a full corpus reload: drop the
    /// index if it exists, then create it fresh with the declared schema.
    /// Guarantees no vectors from a previous dimensionality or metric
    /// linger. A racing `IndexAlreadyExists` from the create step is
    /// treated as benign in this flow only.
    pub async fn recreate_index(
        &self,
        name: &str,
        dimension: usize,
        metric: Metric,
    ) -> Result<Arc<dyn VectorIndex>, MatchError> {
        if self.store.list_indexes().await?.iter().any(|n| n == name) {
            info!("Deleting existing index '{name}' before recreate");
            self.store.delete_index(name).await?;
        }

        match self.store.create_index(name, dimension, metric).await {
            Ok(()) => info!("Created index '{name}' (dim {dimension}, metric {metric})"),
            Err(MatchError::IndexAlreadyExists(_)) => {
                warn!("Index '{name}' already exists, continuing");
            }
            Err(e) => return Err(e),
        }
        self.store.get_index(name).await
    }

    /// Re-populates `name` from a persisted embedding snapshot without
    /// re-embedding: the index is recreated with the schema the snapshot
    /// was built under, then every record is upserted in batches. The
    /// caller is expected to have validated the snapshot manifest against
    /// its live configuration first (see
    /// [`validate_manifest`](crate::infrastructure::snapshot::validate_manifest)).
    pub async fn rebuild_from_snapshot(
        &self,
        name: &str,
        snapshot: &Snapshot,
        batch_size: usize,
    ) -> Result<usize, MatchError> {
        let index = self
            .recreate_index(name, snapshot.manifest.dimension, snapshot.manifest.metric)
            .await?;
        self.upsert_all(index.as_ref(), &snapshot.records, batch_size)
            .await
    }

    /// Upserts `records` in contiguous batches of at most `batch_size`,
    /// logging cumulative progress after each batch.
    pub async fn upsert_all(
        &self,
        index: &dyn VectorIndex,
        records: &[IndexedRecord],
        batch_size: usize,
    ) -> Result<usize, MatchError> {
        let total = records.len();
        self.upsert_all_with_progress(index, records, batch_size, |done| {
            info!("Upserted {done} / {total} records into '{}'", index.name());
        })
        .await
    }

    /// Like [`upsert_all`](Self::upsert_all), with the cumulative count
    /// reported to `on_progress` after each completed batch.
    ///
    /// Every record's dimension is validated before the first batch goes
    /// out, so a `DimensionMismatch` never leaves a partial write. A batch
    /// failure is surfaced as `UpsertBatchFailed` with the offset of the
    /// first record of the failing batch; completed batches stay written
    /// and the caller may resume from that offset.
    pub async fn upsert_all_with_progress(
        &self,
        index: &dyn VectorIndex,
        records: &[IndexedRecord],
        batch_size: usize,
        mut on_progress: impl FnMut(usize) + Send,
    ) -> Result<usize, MatchError> {
        if batch_size == 0 {
            return Err(MatchError::Store("batch_size must be at least 1".into()));
        }

        let expected = index.dimension();
        for record in records {
            if record.vector.len() != expected {
                return Err(MatchError::DimensionMismatch {
                    index: index.name().to_string(),
                    expected,
                    actual: record.vector.len(),
                });
            }
        }

        let mut done = 0usize;
        for (batch_no, batch) in records.chunks(batch_size).enumerate() {
            let offset = batch_no * batch_size;
            index
                .upsert(batch)
                .await
                .map_err(|e| MatchError::UpsertBatchFailed {
                    index: index.name().to_string(),
                    offset,
                    reason: e.to_string(),
                })?;
            done += batch.len();
            on_progress(done);
        }
        Ok(done)
    }
}
