use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A corpus entry before embedding: one resume (or any free-text document).
/// `id` must be unique within the corpus and is immutable once embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub category: String,
}

/// A vector plus its metadata, ready to be written into an index.
///
/// Metadata carries at minimum `category`; provenance tags such as `source`
/// may be added by the caller. All records in one index share the same
/// vector length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: BTreeMap<String, String>,
}

impl IndexedRecord {
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Similarity metric an index is declared with. All queries against the
/// index are scored under this metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Dot,
    Euclid,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::Dot => write!(f, "dot"),
            Metric::Euclid => write!(f, "euclid"),
        }
    }
}

/// One ranked match returned to the caller. `rank` is 1-based and
/// contiguous; `score` is normalized to "higher is better" or absent when
/// the store reported none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub rank: usize,
    pub id: String,
    pub score: Option<f32>,
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Metric::Cosine).unwrap(), "\"cosine\"");
        let m: Metric = serde_json::from_str("\"euclid\"").unwrap();
        assert_eq!(m, Metric::Euclid);
    }

    #[test]
    fn record_builder_sets_metadata() {
        let rec = IndexedRecord::new("r1", vec![0.1, 0.2])
            .with_metadata("category", "HR")
            .with_metadata("source", "test");
        assert_eq!(rec.metadata.get("category").map(String::as_str), Some("HR"));
        assert_eq!(rec.metadata.get("source").map(String::as_str), Some("test"));
    }
}
