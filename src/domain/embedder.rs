use crate::error::MatchError;

/// Abstraction over the embedding backend.
///
/// A single embedder instance guarantees that every vector it produces has
/// the same dimensionality, and that corpus and query texts are encoded by
/// the same model. The `normalize` flag must be given the same value when
/// building the index and when embedding queries; both sides of this crate
/// read it from the one [`MatchConfig`](crate::config::MatchConfig), so the
/// invariant holds by construction.
pub trait TextEmbedder: Send + Sync {
    /// Encodes `texts` into vectors, preserving order: output `i`
    /// corresponds to input `i`. `batch_size` bounds how many texts are fed
    /// to the model per call. With `normalize` set, every output vector has
    /// unit L2 norm.
    ///
    /// Fails with `EncodingError` on an empty input or a zero batch size,
    /// or when the backend cannot encode the batch (the whole batch is
    /// aborted, never partially returned).
    fn embed(
        &self,
        texts: &[String],
        batch_size: usize,
        normalize: bool,
    ) -> Result<Vec<Vec<f32>>, MatchError>;

    /// Convenience for embedding a single query text.
    fn embed_one(&self, text: &str, normalize: bool) -> Result<Vec<f32>, MatchError> {
        let mut vectors = self.embed(&[text.to_string()], 1, normalize)?;
        vectors
            .pop()
            .ok_or_else(|| MatchError::EncodingError("backend returned no vector".into()))
    }

    /// Fixed output dimensionality of the loaded model.
    fn dimension(&self) -> usize;
}
