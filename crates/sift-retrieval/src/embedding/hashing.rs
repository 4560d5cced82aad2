//! Deterministic token-hashing embeddings.
//!
//! Each lower-cased alphanumeric token is hashed with FNV-1a into one of
//! `dimensions` buckets with a hash-derived sign, and the resulting vector is
//! L2-normalized. Texts that share vocabulary end up close under L2, which is
//! enough for offline use and tests; it carries no notion of synonyms.

use sift_core::types::Embedding;
use sift_core::{Error, Result};

use super::{EmbeddingProvider, validate_texts};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Offline embedding provider based on the hashing trick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimensions` components.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `dimensions` is zero
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::Config(
                "hashing embedder needs at least one dimension".to_owned(),
            ));
        }
        Ok(Self { dimensions })
    }

    /// Vector dimension.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_text(&self, text: &str) -> Result<Embedding> {
        let mut vector = vec![0.0f32; self.dimensions];
        let mut tokens = 0usize;

        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
            tokens += 1;
        }

        if tokens == 0 {
            return Err(Error::Embedding(format!(
                "no word tokens left after preprocessing {text:?}"
            )));
        }

        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        // All tokens can cancel out through signed collisions.
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        Ok(vector)
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn model_id(&self) -> String {
        format!("hashing-{}", self.dimensions)
    }

    async fn ensure_model_available(&self) -> Result<()> {
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        validate_texts(&[text])?;
        self.embed_text(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        validate_texts(texts)?;
        texts.iter().map(|text| self.embed_text(text)).collect()
    }
}

/// Lower-cased alphanumeric runs.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|character: char| !character.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// 64-bit FNV-1a digest of `bytes`.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}
