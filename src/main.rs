use std::env;
use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};

use resume_match::infrastructure::embedding::resolve_model;
use resume_match::{FastEmbedder, Matcher, QdrantStore};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: resume-match <job_description_file | ->");
        std::process::exit(1);
    }

    let job_text = if args[1] == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read job description from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&args[1])
            .with_context(|| format!("failed to read job description from {}", args[1]))?
    };

    let config = resume_match::load_config()?;

    let model = resolve_model(&config.model_name)?;
    let embedder = Arc::new(FastEmbedder::new(model, config.embedding_cache_dir.clone())?);
    let store = Arc::new(QdrantStore::connect(&config.qdrant_url)?);
    let matcher = Matcher::new(embedder, store, config.index_name.clone(), config.normalize);

    log::info!("Searching top {} matching resumes...", config.top_k);
    let results = matcher.top_matches(&job_text, config.top_k).await?;

    println!("\nTop Matching Resumes:\n");
    for result in &results {
        let category = result
            .metadata
            .get("category")
            .map(String::as_str)
            .unwrap_or("N/A");
        match result.score {
            Some(score) => println!(
                "{}. Resume ID: {} | Similarity: {score:.4} | Category: {category}",
                result.rank, result.id
            ),
            None => println!(
                "{}. Resume ID: {} | Category: {category}",
                result.rank, result.id
            ),
        }
    }
    Ok(())
}
