//! Persistence of an index together with its chunk sequence.

mod file;
mod locks;

pub use file::FileStorage;
pub use locks::LocationLocks;

use sift_core::types::{IndexLocation, IndexManifest};
use sift_core::{Error, Result};
use std::future::Future;

use crate::index::FlatIndex;

/// An index and the chunk sequence it was built from.
///
/// Vector `i` of `index` always corresponds to `chunks[i]`; construction
/// refuses pairs whose lengths differ.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    model: String,
    index: FlatIndex,
    chunks: Vec<String>,
}

impl IndexSnapshot {
    /// Pair an index with its chunks.
    ///
    /// # Errors
    /// Returns [`Error::CorruptIndex`] if the vector count and chunk count differ
    pub fn new(
        location: &IndexLocation,
        model: impl Into<String>,
        index: FlatIndex,
        chunks: Vec<String>,
    ) -> Result<Self> {
        if index.len() != chunks.len() {
            return Err(Error::corrupt(
                location.as_str(),
                format!(
                    "index holds {} vectors but chunk sequence has {} entries",
                    index.len(),
                    chunks.len()
                ),
            ));
        }
        Ok(Self {
            model: model.into(),
            index,
            chunks,
        })
    }

    /// Embedding model the vectors came from.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The vector index.
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// The chunk sequence, in ordinal order.
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Text of the chunk at `ordinal`.
    pub fn chunk(&self, ordinal: usize) -> Option<&str> {
        self.chunks.get(ordinal).map(String::as_str)
    }

    /// Summary for `location`.
    pub fn manifest(&self, location: &IndexLocation) -> IndexManifest {
        IndexManifest {
            location: location.clone(),
            model: self.model.clone(),
            dimension: self.index.dimension(),
            count: self.index.len(),
        }
    }
}

/// Durable home for index snapshots, keyed by location.
///
/// Both artifacts are always written and read together; implementations
/// must validate the count invariant on load rather than hand back a
/// mismatched pair. A load never observes a half-finished persist of the
/// same location, whichever handle performed it.
pub trait IndexStorage: Send + Sync {
    /// Replace whatever is stored at `location` with `snapshot`.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if the write fails
    fn persist(
        &self,
        location: &IndexLocation,
        snapshot: IndexSnapshot,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Read the snapshot stored at `location`.
    ///
    /// # Errors
    /// Returns [`Error::IndexNotFound`] if either artifact is missing and
    /// [`Error::CorruptIndex`] if they cannot be decoded or disagree
    fn load(&self, location: &IndexLocation) -> impl Future<Output = Result<IndexSnapshot>> + Send;
}
