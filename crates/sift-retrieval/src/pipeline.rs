//! Indexing and query pipelines.

use sift_core::types::{IndexLocation, IndexManifest, RetrievedChunk, ScoredChunk};
use sift_core::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::index::FlatIndex;
use crate::storage::{FileStorage, IndexSnapshot, IndexStorage};

/// Reindexes and queries chunk collections stored by location.
///
/// Holds one embedding provider for its whole lifetime, so indexing and
/// querying always embed with the same model. Cloning is cheap and clones
/// share the provider and storage.
pub struct Retriever<E: EmbeddingProvider, S: IndexStorage = FileStorage> {
    /// Embedding provider
    provider: Arc<E>,
    /// Artifact storage
    storage: Arc<S>,
}

impl<E: EmbeddingProvider, S: IndexStorage> Clone for Retriever<E, S> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<E: EmbeddingProvider, S: IndexStorage> Retriever<E, S> {
    /// Create a retriever from a provider and a storage backend.
    pub fn new(provider: E, storage: S) -> Self {
        Self {
            provider: Arc::new(provider),
            storage: Arc::new(storage),
        }
    }

    /// The embedding provider.
    pub fn provider(&self) -> &E {
        &self.provider
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Check the embedding model can be used before doing any work.
    ///
    /// # Errors
    /// Returns [`Error::Embedding`] if the model is unavailable
    pub async fn prepare(&self) -> Result<()> {
        info!("Checking embedding model '{}'...", self.provider.model_id());
        self.provider.ensure_model_available().await
    }

    /// Replace the index at `location` with one built from `chunks`.
    ///
    /// All chunks are embedded in one batch call. Chunk order becomes
    /// ordinal identity. Embedding happens before anything is written;
    /// storage swaps the artifact pair in one step.
    ///
    /// # Errors
    /// Returns [`Error::EmptyChunkSequence`] for no chunks, [`Error::Embedding`]
    /// if any chunk cannot be embedded, or a storage error if persisting fails
    pub async fn reindex(
        &self,
        chunks: Vec<String>,
        location: &IndexLocation,
    ) -> Result<IndexManifest> {
        if chunks.is_empty() {
            return Err(Error::EmptyChunkSequence);
        }

        info!("Embedding {} chunks for '{}'", chunks.len(), location);
        let embeddings = self.provider.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "provider returned {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let index = FlatIndex::build(embeddings)?;
        let snapshot = IndexSnapshot::new(location, self.provider.model_id(), index, chunks)?;
        let manifest = snapshot.manifest(location);

        self.storage.persist(location, snapshot).await?;

        info!(
            "Indexed {} chunks at '{}' (dimension {}, model '{}')",
            manifest.count, location, manifest.dimension, manifest.model
        );
        Ok(manifest)
    }

    /// Load the snapshot stored at `location`.
    ///
    /// # Errors
    /// Returns [`Error::IndexNotFound`] or [`Error::CorruptIndex`] from storage
    pub async fn load(&self, location: &IndexLocation) -> Result<IndexSnapshot> {
        self.storage.load(location).await
    }

    /// Describe the index stored at `location`.
    ///
    /// # Errors
    /// Returns [`Error::IndexNotFound`] or [`Error::CorruptIndex`] from storage
    pub async fn describe(&self, location: &IndexLocation) -> Result<IndexManifest> {
        Ok(self.load(location).await?.manifest(location))
    }

    /// Return the `top_k` chunks nearest to `text`, best first.
    ///
    /// # Errors
    /// See [`Retriever::query_scored`]
    pub async fn query(
        &self,
        text: &str,
        top_k: usize,
        location: &IndexLocation,
    ) -> Result<Vec<RetrievedChunk>> {
        Ok(self
            .query_scored(text, top_k, location)
            .await?
            .into_iter()
            .map(|scored| scored.chunk)
            .collect())
    }

    /// Like [`Retriever::query`], keeping the L2 distance of each result.
    ///
    /// The persisted pair is loaded once; embedding and search run on the
    /// loaded copy.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTopK`] if `top_k` is zero, [`Error::IndexNotFound`]
    /// if nothing was indexed at `location`, [`Error::ModelMismatch`] if the
    /// index came from another model, and [`Error::Embedding`] if `text`
    /// cannot be embedded
    pub async fn query_scored(
        &self,
        text: &str,
        top_k: usize,
        location: &IndexLocation,
    ) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Err(Error::InvalidTopK(top_k));
        }

        let snapshot = self.load(location).await?;
        let active = self.provider.model_id();
        if snapshot.model() != active {
            return Err(Error::ModelMismatch {
                location: location.to_string(),
                indexed: snapshot.model().to_owned(),
                active,
            });
        }

        let query = self.provider.embed(text).await?;
        let neighbors = snapshot.index().search(&query, top_k)?;
        debug!(
            "Query against '{}' matched {} of {} chunks",
            location,
            neighbors.len(),
            snapshot.chunks().len()
        );

        neighbors
            .into_iter()
            .map(|neighbor| {
                let text = snapshot.chunk(neighbor.ordinal).ok_or_else(|| {
                    Error::corrupt(
                        location.as_str(),
                        format!("no chunk for ordinal {}", neighbor.ordinal),
                    )
                })?;
                Ok(ScoredChunk {
                    chunk: RetrievedChunk {
                        ordinal: neighbor.ordinal,
                        text: text.to_owned(),
                    },
                    distance: neighbor.distance,
                })
            })
            .collect()
    }
}
