//! Configuration for storage, embedding and retrieval settings.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete sift configuration.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    /// Where persisted indexes live
    pub storage: StorageConfig,
    /// Embedding provider selection
    pub embedding: EmbeddingConfig,
    /// Query defaults
    pub retrieval: RetrievalConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one sub-directory per index location
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let root = dirs::home_dir()
            .map_or_else(|| PathBuf::from(".sift"), |home| home.join(".sift"))
            .join("indexes");
        Self { root }
    }
}

/// Which embedding implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Sentence embeddings served by a local Ollama instance
    #[default]
    Ollama,
    /// Deterministic token hashing, no model server required
    Hashing,
}

/// Embedding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider backend
    pub backend: EmbeddingBackend,
    /// Model name passed to the backend
    pub model: String,
    /// Ollama host URL (scheme and host, no port)
    pub host: String,
    /// Ollama port
    pub port: u16,
    /// Maximum number of texts per embedding request
    pub batch_size: usize,
    /// Vector dimension for the hashing backend
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Ollama,
            model: "all-minilm".to_owned(),
            host: "http://localhost".to_owned(),
            port: 11434,
            batch_size: 50,
            dimensions: 384,
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks returned when the caller does not specify one
    pub default_top_k: usize,
    /// Characters of chunk text shown in previews
    pub preview_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            preview_chars: 300,
        }
    }
}

impl SiftConfig {
    /// Get the default config directory path (`~/.sift`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".sift"))
    }

    /// Get the default config file path (`~/.sift/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location (`~/.sift/config.toml`)
    /// If the config doesn't exist, creates it with default values
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or fails validation
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|error| Error::Config(format!("Failed to read config: {error}")))?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        tracing::debug!(
            "Loaded config from {}: backend={:?}, model={}, storage={}",
            path.display(),
            config.embedding.backend,
            config.embedding.model,
            config.storage.root.display()
        );

        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                Error::Config(format!("Failed to create config directory: {error}"))
            })?;
        }

        let header = "# sift configuration file\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{}", self.to_toml()?))
            .map_err(|error| Error::Config(format!("Failed to write config: {error}")))?;

        Ok(())
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    /// Returns an error if serialization fails
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|error| Error::Config(format!("Failed to serialize config: {error}")))
    }

    /// Apply `SIFT_FOLDER`, `EMBEDDING_MODEL` and `OLLAMA_HOST` from the environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// - `SIFT_FOLDER`: storage root becomes `{SIFT_FOLDER}/indexes`
    /// - `EMBEDDING_MODEL`: embedding model name
    /// - `OLLAMA_HOST`: `http://host[:port]`
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(folder) = lookup("SIFT_FOLDER") {
            self.storage.root = PathBuf::from(folder).join("indexes");
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(host) = lookup("OLLAMA_HOST") {
            let (base, port) = split_host_port(&host);
            self.embedding.host = base;
            if let Some(port) = port {
                self.embedding.port = port;
            }
        }
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.embedding.batch_size == 0 {
            return Err(Error::Config("embedding.batch_size must be at least 1".to_owned()));
        }
        if self.embedding.dimensions == 0 {
            return Err(Error::Config("embedding.dimensions must be at least 1".to_owned()));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(Error::Config("embedding.model must not be empty".to_owned()));
        }
        if self.retrieval.default_top_k == 0 {
            return Err(Error::Config(
                "retrieval.default_top_k must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Split `http://host:port` into (`http://host`, port).
fn split_host_port(url: &str) -> (String, Option<u16>) {
    let authority_start = url.find("://").map_or(0, |idx| idx + 3);
    if let Some(colon) = url[authority_start..].rfind(':') {
        let split_at = authority_start + colon;
        if let Ok(port) = url[split_at + 1..].trim_end_matches('/').parse::<u16>() {
            return (url[..split_at].to_owned(), Some(port));
        }
    }
    (url.trim_end_matches('/').to_owned(), None)
}
