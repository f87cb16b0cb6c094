use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use qdrant_client;
use self::qdrant_client::qdrant::value::Kind as QdrantValueKind;
use self::qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use self::qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointId, PointStruct, SearchPoints, UpsertPointsBuilder,
    VectorParams, Vectors, WithPayloadSelector, WithVectorsSelector,
};
use self::qdrant_client::{Payload, Qdrant};

use crate::domain::document::{IndexedRecord, Metric};
use crate::domain::vector_store::{RawScore, ScoredMatch, VectorIndex, VectorStore};
use crate::error::MatchError;

mod payload {
    use super::*;

    /// Payload stored next to every point. The record id travels here
    /// because qdrant point ids are constrained to integers and UUIDs.
    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct RecordPayload {
        pub record_id: String,
        pub metadata: BTreeMap<String, String>,
    }
}
pub use self::payload::RecordPayload;

/// Vector store adapter backed by a qdrant instance. Collections map 1:1
/// onto indexes.
pub struct QdrantStore {
    client: Arc<Qdrant>,
}

impl QdrantStore {
    pub fn new(client: Qdrant) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Connects to a qdrant server at `url` (e.g. `http://localhost:6334`).
    pub fn connect(url: &str) -> Result<Self, MatchError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| MatchError::Store(format!("failed to build qdrant client: {e}")))?;
        Ok(Self::new(client))
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, MatchError> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| MatchError::Store(format!("failed to check collection '{name}': {e}")))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn list_indexes(&self) -> Result<Vec<String>, MatchError> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| MatchError::Store(format!("failed to list collections: {e}")))?;
        Ok(response.collections.into_iter().map(|c| c.name).collect())
    }

    async fn create_index(
        &self,
        name: &str,
        dimension: usize,
        metric: Metric,
    ) -> Result<(), MatchError> {
        if self.collection_exists(name).await? {
            return Err(MatchError::IndexAlreadyExists(name.to_string()));
        }

        info!("Creating collection '{name}' (dim {dimension}, metric {metric})");
        let vector_params = VectorParams {
            size: dimension as u64,
            distance: metric_to_distance(metric).into(),
            hnsw_config: None,
            quantization_config: None,
            on_disk: None,
            multivector_config: None,
            datatype: None,
        };
        let builder = CreateCollectionBuilder::new(name.to_string()).vectors_config(vector_params);

        self.client
            .create_collection(builder)
            .await
            .map(|_| ())
            .map_err(|e| MatchError::Store(format!("failed to create collection '{name}': {e}")))
    }

    async fn delete_index(&self, name: &str) -> Result<(), MatchError> {
        if !self.collection_exists(name).await? {
            return Err(MatchError::IndexNotFound(name.to_string()));
        }
        info!("Deleting collection '{name}'");
        self.client
            .delete_collection(name.to_string())
            .await
            .map(|_| ())
            .map_err(|e| MatchError::Store(format!("failed to delete collection '{name}': {e}")))
    }

    async fn get_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>, MatchError> {
        // Missing collection and transport failure are different errors;
        // only the former is IndexNotFound.
        if !self.collection_exists(name).await? {
            return Err(MatchError::IndexNotFound(name.to_string()));
        }
        let info = self
            .client
            .collection_info(name)
            .await
            .map_err(|e| MatchError::Store(format!("failed to describe collection '{name}': {e}")))?;

        let params = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .ok_or_else(|| {
                MatchError::Store(format!("collection '{name}' has no vector config"))
            })?;
        let (dimension, distance) = match params {
            VectorsConfigKind::Params(p) => (p.size as usize, p.distance()),
            VectorsConfigKind::ParamsMap(_) => {
                return Err(MatchError::Store(format!(
                    "collection '{name}' uses named vectors, which this pipeline does not"
                )))
            }
        };

        Ok(Arc::new(QdrantIndex {
            client: self.client.clone(),
            name: name.to_string(),
            dimension,
            metric: distance_to_metric(distance)?,
        }))
    }
}

struct QdrantIndex {
    client: Arc<Qdrant>,
    name: String,
    dimension: usize,
    metric: Metric,
}

#[async_trait]
impl VectorIndex for QdrantIndex {
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
        if records.is_empty() {
            return Ok(());
        }
        // Reject the whole slice before sending anything, so a bad record
        // cannot cause a partial write.
        for record in records {
            if record.vector.len() != self.dimension {
                return Err(MatchError::DimensionMismatch {
                    index: self.name.clone(),
                    expected: self.dimension,
                    actual: record.vector.len(),
                });
            }
        }

        let mut points = Vec::with_capacity(records.len());
        for record in records {
            let payload_value = serde_json::to_value(RecordPayload {
                record_id: record.id.clone(),
                metadata: record.metadata.clone(),
            })
            .map_err(|e| {
                MatchError::Store(format!("failed to serialize payload for '{}': {e}", record.id))
            })?;
            let payload = Payload::try_from(payload_value).map_err(|e| {
                MatchError::Store(format!("failed to convert payload for '{}': {e}", record.id))
            })?;

            points.push(PointStruct {
                id: Some(point_id_for(&record.id)),
                vectors: Some(Vectors::from(record.vector.clone())),
                payload: payload.into(),
            });
        }

        debug!("Upserting {} points into '{}'", points.len(), self.name);
        let builder = UpsertPointsBuilder::new(self.name.clone(), points).wait(true);
        self.client
            .upsert_points(builder)
            .await
            .map(|_| ())
            .map_err(|e| MatchError::Store(format!("qdrant upsert failed: {e}")))
    }

    async fn query(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<ScoredMatch>, MatchError> {
        if vector.len() != self.dimension {
            return Err(MatchError::DimensionMismatch {
                index: self.name.clone(),
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let request = SearchPoints {
            collection_name: self.name.clone(),
            vector,
            limit: top_k as u64,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(
                    qdrant_client::qdrant::with_payload_selector::SelectorOptions::Enable(true),
                ),
            }),
            with_vectors: Some(WithVectorsSelector {
                selector_options: Some(
                    qdrant_client::qdrant::with_vectors_selector::SelectorOptions::Enable(false),
                ),
            }),
            ..Default::default()
        };

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| MatchError::Store(format!("qdrant search failed: {e}")))?;

        // Store rank order is preserved; only the score shape is resolved.
        let matches = response
            .result
            .into_iter()
            .filter_map(|point| {
                let score = point.score;
                let json = payload_to_json(point.payload)?;
                match serde_json::from_value::<RecordPayload>(json) {
                    Ok(payload) => Some(ScoredMatch {
                        id: payload.record_id,
                        metadata: payload.metadata,
                        // qdrant reports similarity under cosine/dot,
                        // already "higher is better".
                        raw_score: RawScore::Similarity(score),
                    }),
                    Err(e) => {
                        warn!("Skipping search result with malformed payload: {e}");
                        None
                    }
                }
            })
            .collect();
        Ok(matches)
    }
}

/// Deterministic point id per record id, so re-upserting the same record
/// overwrites instead of duplicating.
fn point_id_for(record_id: &str) -> PointId {
    PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes()).to_string())
}

fn metric_to_distance(metric: Metric) -> Distance {
    match metric {
        Metric::Cosine => Distance::Cosine,
        Metric::Dot => Distance::Dot,
        Metric::Euclid => Distance::Euclid,
    }
}

fn distance_to_metric(distance: Distance) -> Result<Metric, MatchError> {
    match distance {
        Distance::Cosine => Ok(Metric::Cosine),
        Distance::Dot => Ok(Metric::Dot),
        Distance::Euclid => Ok(Metric::Euclid),
        other => Err(MatchError::Store(format!(
            "unsupported qdrant distance {other:?}"
        ))),
    }
}

/// Converts a qdrant payload map back into a `serde_json::Value`. Nested
/// lists and structs are not stored by this pipeline and come back as null.
fn payload_to_json(
    payload: std::collections::HashMap<String, qdrant_client::qdrant::Value>,
) -> Option<serde_json::Value> {
    let mut map = serde_json::Map::new();
    for (key, value) in payload {
        map.insert(key, qdrant_value_to_json(value));
    }
    Some(serde_json::Value::Object(map))
}

fn qdrant_value_to_json(value: qdrant_client::qdrant::Value) -> serde_json::Value {
    match value.kind {
        Some(QdrantValueKind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(QdrantValueKind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(QdrantValueKind::IntegerValue(i)) => serde_json::Value::Number(i.into()),
        Some(QdrantValueKind::StringValue(s)) => serde_json::Value::String(s),
        Some(QdrantValueKind::StructValue(s)) => {
            let mut map = serde_json::Map::new();
            for (k, v) in s.fields {
                map.insert(k, qdrant_value_to_json(v));
            }
            serde_json::Value::Object(map)
        }
        Some(QdrantValueKind::ListValue(list)) => serde_json::Value::Array(
            list.values.into_iter().map(qdrant_value_to_json).collect(),
        ),
        _ => serde_json::Value::Null,
    }
}
