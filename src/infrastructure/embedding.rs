use std::path::PathBuf;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use log::{debug, info};

use crate::domain::embedder::TextEmbedder;
use crate::error::MatchError;

/// Generates text embeddings through a pre-initialized fastembed model.
///
/// One instance pins one model, so every vector it produces has the same
/// dimensionality. The same instance (or at least the same configured model
/// name) must be used for corpus and query embedding.
pub struct FastEmbedder {
    model: TextEmbedding,
    model_name: String,
    dimension: usize,
}

impl FastEmbedder {
    /// Initializes the embedding model, downloading it into `cache_dir` on
    /// first use (default cache location when `None`).
    ///
    /// Fails with `ModelUnavailable` when the backend cannot be loaded.
    pub fn new(model: EmbeddingModel, cache_dir: Option<PathBuf>) -> Result<Self, MatchError> {
        let dimension = model_dimension(&model).ok_or_else(|| {
            MatchError::ModelUnavailable(format!("unknown dimension for model {model:?}"))
        })?;
        let model_name = format!("{model:?}");

        let mut opts = InitOptions::new(model);
        if let Some(dir) = cache_dir {
            opts = opts.with_cache_dir(dir);
        }
        let model = TextEmbedding::try_new(opts)
            .map_err(|e| MatchError::ModelUnavailable(e.to_string()))?;

        info!("Loaded embedding model {model_name} (dimension {dimension})");
        Ok(Self {
            model,
            model_name,
            dimension,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl TextEmbedder for FastEmbedder {
    fn embed(
        &self,
        texts: &[String],
        batch_size: usize,
        normalize: bool,
    ) -> Result<Vec<Vec<f32>>, MatchError> {
        validate_embed_args(texts, batch_size)?;

        debug!(
            "Embedding {} texts (batch_size {batch_size}, normalize {normalize})",
            texts.len()
        );
        let mut vectors = self
            .model
            .embed(texts.to_vec(), Some(batch_size))
            .map_err(|e| MatchError::EncodingError(e.to_string()))?;

        if vectors.len() != texts.len() {
            return Err(MatchError::EncodingError(format!(
                "backend returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        for v in &vectors {
            if v.len() != self.dimension {
                return Err(MatchError::EncodingError(format!(
                    "backend returned a {}-length vector, expected {}",
                    v.len(),
                    self.dimension
                )));
            }
        }

        if normalize {
            for v in &mut vectors {
                l2_normalize(v);
            }
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Shared precondition check: non-empty input, batch size at least one.
pub(crate) fn validate_embed_args(texts: &[String], batch_size: usize) -> Result<(), MatchError> {
    if texts.is_empty() {
        return Err(MatchError::EncodingError("no texts to embed".into()));
    }
    if batch_size == 0 {
        return Err(MatchError::EncodingError(
            "batch_size must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Scales `v` to unit L2 norm in place. Zero vectors are left untouched.
pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn model_dimension(model: &EmbeddingModel) -> Option<usize> {
    TextEmbedding::list_supported_models()
        .iter()
        .find(|m| &m.model == model)
        .map(|m| m.dim)
}

/// Resolves a configured model name to a fastembed model. Only models the
/// pipeline has been validated with are accepted.
pub fn resolve_model(name: &str) -> Result<EmbeddingModel, MatchError> {
    match name {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
            Ok(EmbeddingModel::AllMiniLML12V2)
        }
        "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(MatchError::ModelUnavailable(format!(
            "unsupported embedding model '{other}'"
        ))),
    }
}
