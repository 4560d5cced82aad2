//! Text embedding providers.

mod hashing;
mod ollama;

pub(crate) use hashing::fnv1a;
pub use hashing::HashingEmbedder;
pub use ollama::OllamaEmbeddingClient;

use sift_core::{EmbeddingBackend, EmbeddingConfig, Error, Result};
use sift_core::types::Embedding;
use std::future::Future;

/// Trait for generating embeddings from text
///
/// Implementations must be deterministic for a given model: the same text
/// always maps to the same vector, and every vector has the same dimension.
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the model producing the vectors.
    ///
    /// Recorded alongside persisted indexes so a query is never compared
    /// against vectors from a different model.
    fn model_id(&self) -> String;

    /// Ensure the embedding model is available
    ///
    /// # Errors
    /// Returns an error if the model is not available or cannot be loaded
    fn ensure_model_available(&self) -> impl Future<Output = Result<()>> + Send;

    /// Generate embedding for text
    ///
    /// # Errors
    /// Returns an error if the text is empty or embedding generation fails
    fn embed(&self, text: &str) -> impl Future<Output = Result<Embedding>> + Send;

    /// Embed multiple texts, returning one vector per input in input order
    ///
    /// # Errors
    /// Returns an error if any text is empty or any embedding generation fails
    fn embed_batch(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Embedding>>> + Send;
}

/// Reject inputs that have no content to embed.
///
/// # Errors
/// Returns [`Error::Embedding`] naming the first blank input
pub(crate) fn validate_texts<T: AsRef<str>>(texts: &[T]) -> Result<()> {
    match texts.iter().position(|text| text.as_ref().trim().is_empty()) {
        Some(position) => Err(Error::Embedding(format!(
            "input {position} is empty; only non-blank text can be embedded"
        ))),
        None => Ok(()),
    }
}

/// Check a provider response: one vector per input, uniform dimension, finite values.
///
/// # Errors
/// Returns [`Error::Embedding`] describing the first violation
pub(crate) fn validate_vectors(vectors: &[Embedding], expected_count: usize) -> Result<()> {
    if vectors.len() != expected_count {
        return Err(Error::Embedding(format!(
            "expected {expected_count} embeddings, model returned {}",
            vectors.len()
        )));
    }

    let Some(dimension) = vectors.first().map(Vec::len) else {
        return Ok(());
    };
    if dimension == 0 {
        return Err(Error::Embedding("model returned empty vectors".to_owned()));
    }

    for (position, vector) in vectors.iter().enumerate() {
        if vector.len() != dimension {
            return Err(Error::Embedding(format!(
                "embedding {position} has dimension {}, expected {dimension}",
                vector.len()
            )));
        }
        if vector.iter().any(|value| !value.is_finite()) {
            return Err(Error::Embedding(format!(
                "embedding {position} contains non-finite values"
            )));
        }
    }

    Ok(())
}

/// Embedding provider selected from configuration.
#[derive(Debug)]
pub enum ConfiguredEmbedder {
    /// Ollama-served sentence embeddings
    Ollama(OllamaEmbeddingClient),
    /// Offline token hashing
    Hashing(HashingEmbedder),
}

impl ConfiguredEmbedder {
    /// Build the provider named by `config.backend`.
    ///
    /// # Errors
    /// Returns an error if the configuration is unusable (zero dimensions or batch size)
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        match config.backend {
            EmbeddingBackend::Ollama => Ok(Self::Ollama(OllamaEmbeddingClient::from_config(
                config,
            )?)),
            EmbeddingBackend::Hashing => Ok(Self::Hashing(HashingEmbedder::new(
                config.dimensions,
            )?)),
        }
    }
}

impl EmbeddingProvider for ConfiguredEmbedder {
    fn model_id(&self) -> String {
        match self {
            Self::Ollama(client) => client.model_id(),
            Self::Hashing(embedder) => embedder.model_id(),
        }
    }

    async fn ensure_model_available(&self) -> Result<()> {
        match self {
            Self::Ollama(client) => client.ensure_model_available().await,
            Self::Hashing(embedder) => embedder.ensure_model_available().await,
        }
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        match self {
            Self::Ollama(client) => client.embed(text).await,
            Self::Hashing(embedder) => embedder.embed(text).await,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        match self {
            Self::Ollama(client) => client.embed_batch(texts).await,
            Self::Hashing(embedder) => embedder.embed_batch(texts).await,
        }
    }
}
