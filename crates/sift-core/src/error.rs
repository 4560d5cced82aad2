use core::result::Result as CoreResult;
use std::io::Error as IoError;
use std::path::PathBuf;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for sift operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur while embedding, indexing or querying.
#[derive(Debug, Error)]
pub enum Error {
    /// The embedding model could not be reached, or an input was rejected.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The requested number of results was zero.
    #[error("Invalid top-k: {0} (must be at least 1)")]
    InvalidTopK(usize),

    /// No index has been built for this location yet.
    #[error("No index found at location '{location}'; run a reindex before querying")]
    IndexNotFound {
        /// Storage location that was queried
        location: String,
    },

    /// The persisted artifacts are unreadable or disagree with each other.
    #[error("Corrupt index at location '{location}': {reason}")]
    CorruptIndex {
        /// Storage location that was loaded
        location: String,
        /// What failed validation
        reason: String,
    },

    /// A vector does not have the dimension the index was built with.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the index
        expected: usize,
        /// Dimension of the offending vector
        actual: usize,
    },

    /// The index was built with a different embedding model.
    #[error(
        "Index at location '{location}' was built with model '{indexed}' but the active model is '{active}'"
    )]
    ModelMismatch {
        /// Storage location that was loaded
        location: String,
        /// Model recorded in the index
        indexed: String,
        /// Model of the active provider
        active: String,
    },

    /// A storage location key is malformed.
    #[error("Invalid index location: {0}")]
    InvalidLocation(String),

    /// A reindex was requested with no chunks.
    #[error("Cannot build an index from an empty chunk sequence")]
    EmptyChunkSequence,

    /// A storage read or write failed.
    #[error("Storage {operation} failed for {}: {source}", .path.display())]
    Storage {
        /// Operation being performed
        operation: &'static str,
        /// File or directory involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: IoError,
    },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an I/O error with the storage operation and path it came from.
    pub fn storage(operation: &'static str, path: impl Into<PathBuf>, source: IoError) -> Self {
        Self::Storage {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Build a [`Error::CorruptIndex`] for a location.
    pub fn corrupt(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptIndex {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Determines whether this error came from the storage layer and may
    /// go away on its own (disk full, permissions fixed).
    ///
    /// Nothing in sift retries automatically; this is for callers.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Io(_))
    }
}
