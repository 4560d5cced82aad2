//! Embedding functionality using Ollama.

use core::fmt::{Debug, Formatter, Result as FmtResult};
use ollama_rs::Ollama;
use ollama_rs::error::OllamaError;
use ollama_rs::generation::embeddings::request::GenerateEmbeddingsRequest;
use sift_core::types::Embedding;
use sift_core::{EmbeddingConfig, Error, Result};
use tokio::process::Command;
use tracing::{debug, info};

use super::{EmbeddingProvider, validate_texts, validate_vectors};

/// Ollama embedding client
pub struct OllamaEmbeddingClient {
    ollama: Ollama,
    model: String,
    batch_size: usize,
}

impl OllamaEmbeddingClient {
    /// Create a client for `model` served at `host:port`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `batch_size` is zero
    pub fn new(host: &str, port: u16, model: impl Into<String>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Config(
                "embedding batch size must be at least 1".to_owned(),
            ));
        }
        #[allow(deprecated, reason = "Ollama::new is the host/port constructor this client uses")]
        Ok(Self {
            ollama: Ollama::new(host, port),
            model: model.into(),
            batch_size,
        })
    }

    /// Create a client from the embedding section of the configuration.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `batch_size` is zero
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Self::new(&config.host, config.port, config.model.clone(), config.batch_size)
    }

    fn map_error(&self, error: &OllamaError) -> Error {
        let error_str = format!("{error:?}");
        if error_str.contains("model") && error_str.contains("not found") {
            Error::Embedding(format!(
                "Embedding model '{}' not found. Run: ollama pull {}",
                self.model, self.model
            ))
        } else {
            Error::Embedding(format!("Embedding generation failed: {error}"))
        }
    }
}

impl Debug for OllamaEmbeddingClient {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter
            .debug_struct("OllamaEmbeddingClient")
            .field("model", &self.model)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl EmbeddingProvider for OllamaEmbeddingClient {
    fn model_id(&self) -> String {
        self.model.clone()
    }

    async fn ensure_model_available(&self) -> Result<()> {
        // Check if Ollama is running by trying to list models
        let models = self.ollama.list_local_models().await.map_err(|error| {
            Error::Embedding(format!(
                "Failed to connect to Ollama: {error}.\n\nPlease ensure Ollama is installed and running:\n  - Install from: https://ollama.ai\n  - Start with: ollama serve"
            ))
        })?;

        let model_available = models.iter().any(|model| model.name.contains(&self.model));
        if model_available {
            return Ok(());
        }

        info!("Embedding model '{}' not found, pulling it", self.model);
        info!("    Running: ollama pull {}", self.model);

        let status = Command::new("ollama")
            .args(["pull", &self.model])
            .status()
            .await
            .map_err(|error| {
                Error::Embedding(format!(
                    "Failed to run 'ollama pull {}': {}. Is Ollama installed?",
                    self.model, error
                ))
            })?;

        if !status.success() {
            return Err(Error::Embedding(format!(
                "Failed to pull model '{}'. Check Ollama is running.",
                self.model
            )));
        }

        info!("Pulled embedding model '{}'", self.model);
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut vectors = self.embed_batch(&[text.to_owned()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("No embeddings returned".to_owned()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::default());
        }
        validate_texts(texts)?;

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(
                "Requesting {} embeddings from '{}' ({} done)",
                batch.len(),
                self.model,
                vectors.len()
            );
            let request = GenerateEmbeddingsRequest::new(self.model.clone(), batch.to_vec().into());
            let response = self
                .ollama
                .generate_embeddings(request)
                .await
                .map_err(|error| self.map_error(&error))?;
            validate_vectors(&response.embeddings, batch.len())?;
            vectors.extend(response.embeddings);
        }

        // Sub-batches are validated separately; dimensions must also agree across them.
        validate_vectors(&vectors, texts.len())?;
        Ok(vectors)
    }
}
