use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use resume_match::infrastructure::embedding::resolve_model;
use resume_match::infrastructure::ingest::load_resumes;
use resume_match::infrastructure::snapshot::{
    read_snapshot, validate_manifest, write_snapshot, SnapshotManifest,
};
use resume_match::{
    FastEmbedder, IndexService, IndexedRecord, MatchConfig, QdrantStore, TextEmbedder,
};

const SOURCE_TAG: &str = "kaggle_resume_dataset";

fn usage() -> ! {
    eprintln!("Usage: build_index <resumes_csv>");
    eprintln!("       build_index --from-snapshot [snapshot_jsonl]");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = resume_match::load_config()?;

    let store = Arc::new(QdrantStore::connect(&config.qdrant_url)?);
    let service = IndexService::new(store);

    let (total, dimension) = match args.get(1).map(String::as_str) {
        Some("--from-snapshot") if args.len() <= 3 => {
            let path = args
                .get(2)
                .map(PathBuf::from)
                .or_else(|| config.snapshot_path.clone())
                .context("no snapshot path given and none configured")?;
            restore_index(&service, &config, &path).await?
        }
        Some(corpus) if args.len() == 2 => {
            build_index(&service, &config, &PathBuf::from(corpus)).await?
        }
        _ => usage(),
    };

    println!(
        "Stored {total} resume embeddings in index '{}' (dim {dimension}, metric {})",
        config.index_name, config.metric
    );
    Ok(())
}

/// Full build: embed the CSV corpus, persist the snapshot, recreate the
/// index and upsert everything.
async fn build_index(
    service: &IndexService,
    config: &MatchConfig,
    corpus_path: &PathBuf,
) -> Result<(usize, usize)> {
    log::info!("Building index '{}' from {corpus_path:?}", config.index_name);

    let documents = load_resumes(corpus_path)?;
    anyhow::ensure!(!documents.is_empty(), "corpus {corpus_path:?} is empty");

    let model = resolve_model(&config.model_name)?;
    let embedder = FastEmbedder::new(model, config.embedding_cache_dir.clone())?;

    let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
    log::info!("Embedding {} resumes...", texts.len());
    let vectors = embedder.embed(&texts, config.batch_size, config.normalize)?;

    let records: Vec<IndexedRecord> = documents
        .iter()
        .zip(vectors)
        .map(|(doc, vector)| {
            IndexedRecord::new(doc.id.clone(), vector)
                .with_metadata("category", doc.category.clone())
                .with_metadata("source", SOURCE_TAG)
        })
        .collect();

    if let Some(snapshot_path) = &config.snapshot_path {
        let manifest = SnapshotManifest {
            model: config.model_name.clone(),
            dimension: embedder.dimension(),
            normalized: config.normalize,
            metric: config.metric,
        };
        write_snapshot(snapshot_path, &manifest, &records)
            .with_context(|| format!("failed to write snapshot {snapshot_path:?}"))?;
    }

    let index = service
        .recreate_index(&config.index_name, embedder.dimension(), config.metric)
        .await?;
    let total = service
        .upsert_all(index.as_ref(), &records, config.upsert_batch_size)
        .await?;
    Ok((total, embedder.dimension()))
}

/// Restore: re-populate the index from persisted embeddings without
/// re-embedding (no model load). The snapshot manifest must agree with
/// the live configuration, otherwise corpus and query vectors would come
/// from different embedding setups.
async fn restore_index(
    service: &IndexService,
    config: &MatchConfig,
    snapshot_path: &PathBuf,
) -> Result<(usize, usize)> {
    log::info!(
        "Restoring index '{}' from snapshot {snapshot_path:?}",
        config.index_name
    );

    let snapshot = read_snapshot(snapshot_path)?;
    validate_manifest(&snapshot.manifest, &config.model_name, config.normalize)?;
    anyhow::ensure!(
        snapshot.manifest.metric == config.metric,
        "snapshot was built under metric '{}', configured metric is '{}'",
        snapshot.manifest.metric,
        config.metric
    );

    let total = service
        .rebuild_from_snapshot(&config.index_name, &snapshot, config.upsert_batch_size)
        .await?;
    Ok((total, snapshot.manifest.dimension))
}
