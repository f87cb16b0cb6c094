use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::domain::document::Metric;

const SNAPSHOT_FILENAME: &str = "resume_embeddings.jsonl";

/// Pipeline configuration. One instance is handed to every component, so
/// the index build and the query side cannot drift apart on model name,
/// metric or normalization mode.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MatchConfig {
    /// Embedding model name, resolved via
    /// [`resolve_model`](crate::infrastructure::embedding::resolve_model).
    pub model_name: String,
    /// Name of the vector index holding the resume corpus.
    pub index_name: String,
    /// Default number of matches returned per query.
    pub top_k: usize,
    /// Batch size fed to the embedding model.
    pub batch_size: usize,
    /// Batch size for vector-store upserts.
    pub upsert_batch_size: usize,
    pub metric: Metric,
    /// Unit-normalize vectors on both the corpus and the query side.
    /// Required for cosine scores to be meaningful.
    pub normalize: bool,
    pub qdrant_url: String,
    #[serde(default)]
    pub embedding_cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        let dirs = ProjectDirs::from("dev", "resume-match", "resume-match");
        let cache_dir = dirs.as_ref().map(|d| d.cache_dir().to_path_buf());
        Self {
            model_name: "all-MiniLM-L6-v2".to_string(),
            index_name: "resumes_index".to_string(),
            top_k: 5,
            batch_size: 32,
            upsert_batch_size: 100,
            metric: Metric::Cosine,
            normalize: true,
            qdrant_url: "http://localhost:6334".to_string(),
            embedding_cache_dir: cache_dir.clone(),
            snapshot_path: cache_dir.map(|d| d.join(SNAPSHOT_FILENAME)),
        }
    }
}

/// Loads configuration in layers: built-in defaults, then
/// `resume_match.toml` (or the file named by `RESUME_MATCH_CONFIG_PATH`),
/// then `RESUME_MATCH_*` environment variables.
pub fn load_config() -> Result<MatchConfig> {
    let config_path = std::env::var("RESUME_MATCH_CONFIG_PATH")
        .unwrap_or_else(|_| "resume_match.toml".to_string());

    let figment = Figment::new()
        .merge(Serialized::defaults(MatchConfig::default()))
        .merge(Toml::file(&config_path))
        .merge(Env::prefixed("RESUME_MATCH_"));

    let config: MatchConfig = figment.extract().context("failed to extract MatchConfig")?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &MatchConfig) -> Result<()> {
    if config.index_name.is_empty() {
        anyhow::bail!("index_name cannot be empty");
    }
    if config.top_k == 0 {
        anyhow::bail!("top_k must be at least 1");
    }
    if config.batch_size == 0 || config.upsert_batch_size == 0 {
        anyhow::bail!("batch sizes must be at least 1");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_the_reference_pipeline() {
        Jail::expect_with(|_jail| {
            let config = load_config().expect("default config must load");
            assert_eq!(config.model_name, "all-MiniLM-L6-v2");
            assert_eq!(config.index_name, "resumes_index");
            assert_eq!(config.top_k, 5);
            assert_eq!(config.batch_size, 32);
            assert_eq!(config.upsert_batch_size, 100);
            assert_eq!(config.metric, Metric::Cosine);
            assert!(config.normalize);
            Ok(())
        });
    }

    #[test]
    fn toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "resume_match.toml",
                r#"
index_name = "staging_resumes"
top_k = 10
metric = "dot"
                "#,
            )?;
            let config = load_config().expect("toml config must load");
            assert_eq!(config.index_name, "staging_resumes");
            assert_eq!(config.top_k, 10);
            assert_eq!(config.metric, Metric::Dot);
            // Untouched keys keep their defaults.
            assert_eq!(config.batch_size, 32);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_toml() {
        Jail::expect_with(|jail| {
            jail.create_file("resume_match.toml", "top_k = 10\n")?;
            jail.set_env("RESUME_MATCH_TOP_K", "3");
            jail.set_env("RESUME_MATCH_QDRANT_URL", "http://qdrant.internal:6334");
            let config = load_config().expect("env config must load");
            assert_eq!(config.top_k, 3);
            assert_eq!(config.qdrant_url, "http://qdrant.internal:6334");
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("RESUME_MATCH_TOP_K", "0");
            assert!(load_config().is_err());
            Ok(())
        });
    }
}
