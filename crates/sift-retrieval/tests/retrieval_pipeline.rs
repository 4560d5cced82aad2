//! End-to-end tests for reindexing and querying through file storage
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use sift_core::{EmbeddingBackend, EmbeddingConfig, Error, IndexLocation};
use sift_retrieval::{ConfiguredEmbedder, FileStorage, HashingEmbedder, IndexStorage as _, Retriever};
use std::fs;
use tempfile::TempDir;
use tokio::task::JoinSet;

fn hashing_retriever(temp: &TempDir) -> Retriever<HashingEmbedder> {
    Retriever::new(
        HashingEmbedder::new(256).expect("valid dimensions"),
        FileStorage::new(temp.path()),
    )
}

fn location(key: &str) -> IndexLocation {
    IndexLocation::new(key).expect("valid location")
}

fn generation(prefix: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|ordinal| format!("{prefix} clause number {ordinal} about hospital cover"))
        .collect()
}

#[tokio::test]
async fn test_index_survives_new_retriever() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let policy = location("policy");
    let chunks = vec![
        "Pre-existing conditions are covered after 36 months.".to_owned(),
        "Cataract surgery has a 24 month waiting period.".to_owned(),
        "Ambulance charges are reimbursed up to 2000.".to_owned(),
    ];

    hashing_retriever(&temp)
        .reindex(chunks.clone(), &policy)
        .await
        .expect("reindex should succeed");

    // A fresh process would only have the files on disk.
    let reopened = hashing_retriever(&temp);
    let results = reopened
        .query("cataract surgery waiting period", 1, &policy)
        .await
        .expect("query should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].ordinal, 1);
    assert_eq!(results[0].text, chunks[1]);
    assert_eq!(results[0].label(), format!("[Chunk 1] {}", chunks[1]));
}

#[tokio::test]
async fn test_configured_hashing_backend() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let config = EmbeddingConfig {
        backend: EmbeddingBackend::Hashing,
        dimensions: 64,
        ..EmbeddingConfig::default()
    };
    let retriever = Retriever::new(
        ConfiguredEmbedder::from_config(&config).expect("valid config"),
        FileStorage::new(temp.path()),
    );
    retriever.prepare().await.expect("hashing needs no model");

    let manifest = retriever
        .reindex(generation("alpha", 4), &location("configured"))
        .await
        .expect("reindex should succeed");
    assert_eq!(manifest.dimension, 64);
    assert_eq!(manifest.count, 4);
}

#[tokio::test]
async fn test_tampered_chunk_file_is_reported_not_served() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let retriever = hashing_retriever(&temp);
    let policy = location("policy");
    retriever
        .reindex(generation("alpha", 3), &policy)
        .await
        .expect("reindex should succeed");

    let chunks_path = retriever
        .storage()
        .location_dir(&policy)
        .join("chunks.json");
    fs::write(&chunks_path, r#"["stale chunk from an older build"]"#)
        .expect("Failed to overwrite chunks");

    let error = retriever
        .query("hospital cover", 2, &policy)
        .await
        .expect_err("mismatched artifacts must not be served");
    assert!(matches!(error, Error::CorruptIndex { .. }), "got {error}");

    // Recovery is a caller-driven reindex.
    retriever
        .reindex(generation("beta", 2), &policy)
        .await
        .expect("reindex should succeed");
    assert_eq!(
        retriever
            .storage()
            .load(&policy)
            .await
            .expect("load should succeed")
            .chunks()
            .len(),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_never_see_mixed_generations() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let retriever = hashing_retriever(&temp);
    let policy = location("shared");
    retriever
        .reindex(generation("alpha", 6), &policy)
        .await
        .expect("initial reindex should succeed");

    let mut tasks = JoinSet::new();

    let writer = retriever.clone();
    let writer_location = policy.clone();
    tasks.spawn(async move {
        for round in 0..20 {
            let chunks = if round % 2 == 0 {
                generation("beta", 2)
            } else {
                generation("alpha", 6)
            };
            writer
                .reindex(chunks, &writer_location)
                .await
                .expect("reindex should succeed");
        }
    });

    for _ in 0..8 {
        let reader = retriever.clone();
        let reader_location = policy.clone();
        tasks.spawn(async move {
            for _ in 0..20 {
                let results = reader
                    .query("hospital cover clause", 10, &reader_location)
                    .await
                    .expect("query should succeed");

                let prefix = results[0].text.split(' ').next().unwrap_or_default().to_owned();
                let expected = if prefix == "alpha" { 6 } else { 2 };
                assert_eq!(results.len(), expected, "result size must match one generation");
                for chunk in &results {
                    assert!(chunk.text.starts_with(&prefix), "mixed generations: {results:?}");
                    assert_eq!(
                        chunk.text,
                        format!("{prefix} clause number {} about hospital cover", chunk.ordinal)
                    );
                }
            }
        });
    }

    while let Some(outcome) = tasks.join_next().await {
        outcome.expect("task panicked");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_separate_retrievers_on_one_root_stay_consistent() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let policy = location("shared");
    hashing_retriever(&temp)
        .reindex(generation("alpha", 4), &policy)
        .await
        .expect("initial reindex should succeed");

    let mut tasks = JoinSet::new();

    // Equal-sized generations so only the pairing can tell them apart.
    for prefix in ["alpha", "beta"] {
        let writer = hashing_retriever(&temp);
        let writer_location = policy.clone();
        tasks.spawn(async move {
            for _ in 0..15 {
                writer
                    .reindex(generation(prefix, 4), &writer_location)
                    .await
                    .expect("reindex should succeed");
            }
        });
    }

    for _ in 0..6 {
        let reader = hashing_retriever(&temp);
        let reader_location = policy.clone();
        tasks.spawn(async move {
            for _ in 0..20 {
                let results = reader
                    .query("hospital cover clause", 4, &reader_location)
                    .await
                    .expect("query should succeed");

                assert_eq!(results.len(), 4);
                let prefix = results[0].text.split(' ').next().unwrap_or_default().to_owned();
                for chunk in &results {
                    assert_eq!(
                        chunk.text,
                        format!("{prefix} clause number {} about hospital cover", chunk.ordinal),
                        "mixed generations: {results:?}"
                    );
                }
            }
        });
    }

    while let Some(outcome) = tasks.join_next().await {
        outcome.expect("task panicked");
    }
}
