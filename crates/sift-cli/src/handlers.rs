//! Command handlers.

use anyhow::{Context as _, Result};
use sift_core::{IndexLocation, IndexManifest, ScoredChunk, SiftConfig};
use sift_retrieval::{ConfiguredEmbedder, FileStorage, Retriever};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::cli::{ChunkFormat, Cli, Commands};

/// Dispatch a parsed command line.
///
/// # Errors
/// Returns an error if configuration, indexing or retrieval fails
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Index {
            input,
            location,
            format,
        } => handle_index(&config, &input, format, &location).await,
        Commands::Query {
            query,
            location,
            top_k,
            scores,
            json,
        } => {
            let top_k = top_k.unwrap_or(config.retrieval.default_top_k);
            handle_query(&config, &query, top_k, &location, scores, json).await
        }
        Commands::Info { location } => handle_info(&config, &location).await,
        Commands::Config => {
            print_text(&config.to_toml()?);
            Ok(())
        }
    }
}

/// Resolve the effective configuration: file, then environment, then flags.
fn load_config(cli: &Cli) -> Result<SiftConfig> {
    let config = if let Some(path) = &cli.config {
        SiftConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        SiftConfig::load_or_create().unwrap_or_else(|error| {
            warn!("Failed to load config: {error}. Using defaults.");
            SiftConfig::default()
        })
    };

    let mut config = config.with_env_overrides();
    if let Some(backend) = cli.backend {
        config.embedding.backend = backend.into();
    }
    if let Some(store) = &cli.store {
        config.storage.root.clone_from(store);
    }
    config.validate()?;
    Ok(config)
}

fn open_retriever(config: &SiftConfig) -> Result<Retriever<ConfiguredEmbedder>> {
    let provider = ConfiguredEmbedder::from_config(&config.embedding)?;
    Ok(Retriever::new(provider, FileStorage::new(&config.storage.root)))
}

async fn handle_index(
    config: &SiftConfig,
    input: &Path,
    format: ChunkFormat,
    location: &IndexLocation,
) -> Result<()> {
    let contents = fs::read_to_string(input)
        .with_context(|| format!("Failed to read chunks from {}", input.display()))?;
    let chunks = parse_chunks(&contents, format)
        .with_context(|| format!("Failed to parse chunks from {}", input.display()))?;
    info!("Read {} chunks from {}", chunks.len(), input.display());

    let retriever = open_retriever(config)?;
    retriever.prepare().await?;
    let manifest = retriever.reindex(chunks, location).await?;

    print_text(&format!(
        "Indexed {} chunks at '{}' (dimension {}, model '{}')",
        manifest.count, manifest.location, manifest.dimension, manifest.model
    ));
    Ok(())
}

async fn handle_query(
    config: &SiftConfig,
    query: &str,
    top_k: usize,
    location: &IndexLocation,
    scores: bool,
    json: bool,
) -> Result<()> {
    let retriever = open_retriever(config)?;
    let results = retriever.query_scored(query, top_k, location).await?;

    if json {
        print_text(&serde_json::to_string_pretty(&results)?);
    } else {
        print_text(&render_results(&results, scores, config.retrieval.preview_chars));
    }
    Ok(())
}

async fn handle_info(config: &SiftConfig, location: &IndexLocation) -> Result<()> {
    let retriever = open_retriever(config)?;
    let manifest = retriever.describe(location).await?;
    print_text(&render_manifest(&manifest, &retriever.storage().location_dir(location)));
    Ok(())
}

/// Split input file contents into chunks.
fn parse_chunks(contents: &str, format: ChunkFormat) -> Result<Vec<String>> {
    match format {
        ChunkFormat::Lines => Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()),
        ChunkFormat::Json => {
            serde_json::from_str(contents).context("Expected a JSON array of strings")
        }
    }
}

fn render_results(results: &[ScoredChunk], scores: bool, preview_chars: usize) -> String {
    if results.is_empty() {
        return "No matching chunks".to_owned();
    }

    results
        .iter()
        .map(|scored| {
            let line = format!(
                "[Chunk {}] {}",
                scored.chunk.ordinal,
                scored.chunk.preview(preview_chars)
            );
            if scores {
                format!("{line} (distance {:.4})", scored.distance)
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_manifest(manifest: &IndexManifest, dir: &Path) -> String {
    format!(
        "Location:  {}\nModel:     {}\nDimension: {}\nChunks:    {}\nPath:      {}",
        manifest.location,
        manifest.model,
        manifest.dimension,
        manifest.count,
        dir.display()
    )
}

#[allow(clippy::print_stdout, reason = "Command output")]
fn print_text(text: &str) {
    println!("{text}");
}
