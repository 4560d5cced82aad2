//! Core types for the sift retrieval system.
//!
//! This crate provides the shared error type, configuration, and the data
//! types exchanged between the embedding, indexing and query layers.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Test allows"
    )
)]

/// Configuration loading and defaults.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Synchronization helpers.
pub mod sync;
/// Chunk, location and search result types.
pub mod types;

pub use config::{EmbeddingBackend, EmbeddingConfig, RetrievalConfig, SiftConfig, StorageConfig};
pub use error::{Error, Result};
pub use sync::IgnoreLock;
pub use types::{Embedding, IndexLocation, IndexManifest, Neighbor, RetrievedChunk, ScoredChunk};
