//! Exact nearest-neighbor index over embeddings.

use core::cmp::Ordering;
use sift_core::types::{Embedding, Neighbor};
use sift_core::{Error, Result};
use tracing::debug;

/// Brute-force L2 index.
///
/// Vectors are stored contiguously; vector `i` occupies
/// `data[i * dimension..(i + 1) * dimension]` and belongs to chunk ordinal `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index over `embeddings`, preserving their order as ordinals.
    ///
    /// # Errors
    /// Returns [`Error::EmptyChunkSequence`] for no input,
    /// [`Error::DimensionMismatch`] for ragged input, and [`Error::Embedding`]
    /// for zero-length or non-finite vectors
    pub fn build(embeddings: Vec<Embedding>) -> Result<Self> {
        let dimension = embeddings
            .first()
            .map(Vec::len)
            .ok_or(Error::EmptyChunkSequence)?;
        if dimension == 0 {
            return Err(Error::Embedding("cannot index zero-length vectors".to_owned()));
        }

        let mut data = Vec::with_capacity(dimension * embeddings.len());
        for (ordinal, embedding) in embeddings.into_iter().enumerate() {
            if embedding.len() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            if embedding.iter().any(|value| !value.is_finite()) {
                return Err(Error::Embedding(format!(
                    "vector {ordinal} contains non-finite values"
                )));
            }
            data.extend(embedding);
        }

        Ok(Self { dimension, data })
    }

    /// Rebuild an index from its raw parts, as persisted.
    ///
    /// Returns `None` if `data` is not a whole number of `dimension`-sized vectors.
    pub fn from_raw(dimension: usize, data: Vec<f32>) -> Option<Self> {
        (dimension > 0 && data.len() % dimension == 0).then_some(Self { dimension, data })
    }

    /// Split into `(dimension, data)`, the inverse of [`FlatIndex::from_raw`].
    pub fn into_raw(self) -> (usize, Vec<f32>) {
        (self.dimension, self.data)
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Contiguous vector storage.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Vector stored for `ordinal`.
    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        let start = ordinal.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.data.get(start..end)
    }

    /// Find the `top_k` vectors closest to `query` by Euclidean distance.
    ///
    /// Results are ascending by distance, ties broken by ascending ordinal.
    /// Asking for more results than there are vectors returns all of them.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTopK`] if `top_k` is zero and
    /// [`Error::DimensionMismatch`] if the query has the wrong length
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>> {
        if top_k == 0 {
            return Err(Error::InvalidTopK(top_k));
        }
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f32, usize)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, vector)| (squared_l2(query, vector), ordinal))
            .collect();

        if top_k < scored.len() {
            scored.select_nth_unstable_by(top_k - 1, by_distance_then_ordinal);
            scored.truncate(top_k);
        }
        scored.sort_unstable_by(by_distance_then_ordinal);

        debug!(
            "Searched {} vectors, returning {} neighbors",
            self.len(),
            scored.len()
        );

        Ok(scored
            .into_iter()
            .map(|(squared, ordinal)| Neighbor {
                ordinal,
                distance: squared.sqrt(),
            })
            .collect())
    }
}

fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(lhs, rhs)| {
            let diff = lhs - rhs;
            diff * diff
        })
        .sum()
}

fn by_distance_then_ordinal(left: &(f32, usize), right: &(f32, usize)) -> Ordering {
    left.0.total_cmp(&right.0).then(left.1.cmp(&right.1))
}
