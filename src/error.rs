use thiserror::Error;

/// Errors surfaced by the matching pipeline.
///
/// Structural errors (missing index, dimension mismatch) are fatal to the
/// current operation and carry enough context (index name, batch offset,
/// expected vs. actual dimension) to diagnose without re-running.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("failed to encode input batch: {0}")]
    EncodingError(String),

    #[error("index '{0}' already exists")]
    IndexAlreadyExists(String),

    #[error("index '{0}' not found")]
    IndexNotFound(String),

    /// A single batch failed during a bulk upsert. `offset` is the position
    /// of the first record of the failing batch; earlier batches were
    /// already written and are not rolled back.
    #[error("upsert into '{index}' failed at batch starting at record {offset}: {reason}")]
    UpsertBatchFailed {
        index: String,
        offset: usize,
        reason: String,
    },

    #[error("vector dimension {actual} does not match index '{index}' dimension {expected}")]
    DimensionMismatch {
        index: String,
        expected: usize,
        actual: usize,
    },

    #[error("query text is empty or top_k is zero")]
    EmptyQuery,

    #[error("embedding snapshot invalid: {0}")]
    SnapshotInvalid(String),

    /// Transport or backend failure inside a vector-store adapter.
    #[error("vector store error: {0}")]
    Store(String),
}
