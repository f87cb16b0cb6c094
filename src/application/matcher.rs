use std::sync::Arc;

use log::info;

use crate::domain::document::QueryResult;
use crate::domain::embedder::TextEmbedder;
use crate::domain::text::normalize;
use crate::domain::vector_store::VectorStore;
use crate::error::MatchError;

/// Embeds a job description and ranks the corpus against it.
///
/// The embedder and the `normalize` flag here must be the same ones the
/// index was built with; both sides read them from one `MatchConfig`, which
/// is what keeps corpus and query vectors comparable.
pub struct Matcher {
    embedder: Arc<dyn TextEmbedder>,
    store: Arc<dyn VectorStore>,
    index_name: String,
    normalize_vectors: bool,
}

impl Matcher {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        store: Arc<dyn VectorStore>,
        index_name: impl Into<String>,
        normalize_vectors: bool,
    ) -> Self {
        Self {
            embedder,
            store,
            index_name: index_name.into(),
            normalize_vectors,
        }
    }

    /// Returns the `min(top_k, index size)` best matches for `query_text`,
    /// best first, with 1-based contiguous ranks. Store rank order is
    /// preserved; only the score shape is reconciled.
    ///
    /// Fails with `EmptyQuery` on blank query text or `top_k == 0`, before
    /// any model or store call is made.
    pub async fn top_matches(
        &self,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<QueryResult>, MatchError> {
        let cleaned = normalize(query_text);
        if cleaned.is_empty() || top_k == 0 {
            return Err(MatchError::EmptyQuery);
        }

        let query_vector = self.embedder.embed_one(&cleaned, self.normalize_vectors)?;
        let index = self.store.get_index(&self.index_name).await?;
        let matches = index.query(query_vector, top_k).await?;

        info!(
            "Query against '{}' returned {} matches",
            self.index_name,
            matches.len()
        );
        Ok(matches
            .into_iter()
            .enumerate()
            .map(|(i, m)| QueryResult {
                rank: i + 1,
                id: m.id,
                score: m.raw_score.resolve(),
                metadata: m.metadata,
            })
            .collect())
    }
}
