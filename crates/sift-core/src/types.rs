use core::fmt::{Display, Formatter, Result as FmtResult};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single embedding vector
pub type Embedding = Vec<f32>;

/// Longest location key accepted by [`IndexLocation::new`].
const MAX_LOCATION_LEN: usize = 128;

/// Named storage location holding one index and its chunk sequence.
///
/// Keys are restricted to ASCII letters, digits, `-`, `_` and `.` (not
/// leading) so that a key always maps to a single directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IndexLocation(String);

impl IndexLocation {
    /// Validate and wrap a location key.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLocation`] if the key is empty, too long,
    /// starts with `.` or contains characters outside the allowed set.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();

        if key.is_empty() {
            return Err(Error::InvalidLocation("location key is empty".to_owned()));
        }
        if key.len() > MAX_LOCATION_LEN {
            return Err(Error::InvalidLocation(format!(
                "location key is longer than {MAX_LOCATION_LEN} characters"
            )));
        }
        if key.starts_with('.') {
            return Err(Error::InvalidLocation(format!(
                "location key '{key}' must not start with '.'"
            )));
        }
        if let Some(bad) = key
            .chars()
            .find(|character| !(character.is_ascii_alphanumeric() || "-_.".contains(*character)))
        {
            return Err(Error::InvalidLocation(format!(
                "location key '{key}' contains unsupported character {bad:?}"
            )));
        }

        Ok(Self(key))
    }

    /// The raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IndexLocation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(&self.0)
    }
}

impl FromStr for IndexLocation {
    type Err = Error;

    fn from_str(key: &str) -> Result<Self> {
        Self::new(key)
    }
}

impl TryFrom<String> for IndexLocation {
    type Error = Error;

    fn try_from(key: String) -> Result<Self> {
        Self::new(key)
    }
}

impl From<IndexLocation> for String {
    fn from(location: IndexLocation) -> Self {
        location.0
    }
}

/// One nearest-neighbor hit: the chunk ordinal and its L2 distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Zero-based position of the chunk in the indexed sequence
    pub ordinal: usize,
    /// Euclidean distance to the query vector
    pub distance: f32,
}

/// A chunk returned by a query, identified by its ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Zero-based position of the chunk in the indexed sequence
    pub ordinal: usize,
    /// Chunk text
    pub text: String,
}

impl RetrievedChunk {
    /// Clause label handed to downstream consumers: `[Chunk 3] text`.
    pub fn label(&self) -> String {
        format!("[Chunk {}] {}", self.ordinal, self.text)
    }

    /// Short preview of the chunk text.
    ///
    /// Truncates on character boundaries and appends `...` when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        if self.text.chars().count() > max_chars {
            let truncated: String = self.text.chars().take(max_chars).collect();
            format!("{truncated}...")
        } else {
            self.text.clone()
        }
    }
}

/// A retrieved chunk together with its distance, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Chunk identity and text
    #[serde(flatten)]
    pub chunk: RetrievedChunk,
    /// Euclidean distance to the query vector
    pub distance: f32,
}

/// Summary of a persisted index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Location the index lives under
    pub location: IndexLocation,
    /// Embedding model the vectors were produced with
    pub model: String,
    /// Vector dimension
    pub dimension: usize,
    /// Number of vectors (equal to the number of chunks)
    pub count: usize,
}
