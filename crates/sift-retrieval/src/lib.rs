//! Semantic retrieval over an embedded chunk collection.
//!
//! Chunks are embedded by an [`EmbeddingProvider`], loaded into a brute-force
//! L2 [`FlatIndex`], and persisted through an [`IndexStorage`] together with
//! the chunk sequence. A [`Retriever`] ties the pieces together for
//! reindexing and querying a named location.
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

pub mod embedding;
pub mod index;
pub mod pipeline;
pub mod storage;

pub use embedding::{ConfiguredEmbedder, EmbeddingProvider, HashingEmbedder, OllamaEmbeddingClient};
pub use index::FlatIndex;
pub use pipeline::Retriever;
pub use storage::{FileStorage, IndexSnapshot, IndexStorage, LocationLocks};
