//! Directory-per-location file storage.
//!
//! Each location is a directory under the storage root holding two files:
//! `index.bin` (bincode: format version, model id, dimension, count, chunk
//! digest, flat vector payload) and `chunks.json` (JSON array of chunk
//! strings). New artifacts are staged under unique names next to the old
//! ones and renamed into place while the location's write lock is held.

use bincode::config::standard as bincode_config;
use bincode::error::DecodeError;
use bincode::{Decode, Encode, decode_from_slice, encode_to_vec};
use sift_core::types::IndexLocation;
use sift_core::{Error, Result};
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf, absolute};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs as async_fs;
use tokio::task::{JoinError, spawn_blocking};
use tracing::{debug, info, warn};

use super::locks::LocationLocks;
use super::{IndexSnapshot, IndexStorage};
use crate::embedding::fnv1a;
use crate::index::FlatIndex;

const INDEX_FILE: &str = "index.bin";
const CHUNKS_FILE: &str = "chunks.json";

/// Upper bound on the encoded header, which is read before any payload
/// length is trusted.
const HEADER_LIMIT: usize = 64 * 1024;

/// Distinguishes staged files written by concurrent persists in one process.
static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk index artifact.
#[derive(Debug, Encode, Decode)]
struct IndexArtifact {
    version: u32,
    model: String,
    dimension: u64,
    count: u64,
    chunk_digest: u64,
    vectors: Vec<f32>,
}

impl IndexArtifact {
    /// Format version identifier
    const VERSION: u32 = 1;
}

/// Leading fields of [`IndexArtifact`]: version, model, dimension, count, chunk digest.
type ArtifactHeader = (u32, String, u64, u64, u64);

/// Stores each location as a directory of two artifacts under a root.
///
/// Every handle in the process shares one lock registry, so handles
/// created separately over the same root still exclude each other.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    locks: Arc<LocationLocks>,
}

impl FileStorage {
    /// Create storage rooted at `root`. The directory is created lazily on first persist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: LocationLocks::shared(),
        }
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the artifacts for `location`.
    pub fn location_dir(&self, location: &IndexLocation) -> PathBuf {
        self.root.join(location.as_str())
    }

    /// Lock registry key for `location`; relative roots are resolved so
    /// different spellings of one directory share a lock.
    fn lock_key(&self, location: &IndexLocation) -> PathBuf {
        let dir = self.location_dir(location);
        absolute(&dir).unwrap_or(dir)
    }
}

impl IndexStorage for FileStorage {
    async fn persist(&self, location: &IndexLocation, snapshot: IndexSnapshot) -> Result<()> {
        let dir = self.location_dir(location);
        async_fs::create_dir_all(&dir)
            .await
            .map_err(|error| Error::storage("create directory", &dir, error))?;

        let index_path = dir.join(INDEX_FILE);
        let chunks_path = dir.join(CHUNKS_FILE);
        let stage = format!(
            "{}-{}.tmp",
            process::id(),
            STAGE_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let staged_index = dir.join(format!("{INDEX_FILE}.{stage}"));
        let staged_chunks = dir.join(format!("{CHUNKS_FILE}.{stage}"));

        let encode_path = index_path.clone();
        let (index_bytes, chunk_bytes) =
            spawn_blocking(move || encode_snapshot(snapshot, &encode_path))
                .await
                .map_err(|error| join_error(&error))??;

        let guard = self.locks.write(&self.lock_key(location)).await;
        let outcome = async {
            write_file(&staged_index, &index_bytes).await?;
            write_file(&staged_chunks, &chunk_bytes).await?;
            rename_file(&staged_chunks, &chunks_path).await?;
            rename_file(&staged_index, &index_path).await
        }
        .await;
        drop(guard);

        if let Err(error) = outcome {
            discard_staged(&[&staged_index, &staged_chunks]).await;
            return Err(error);
        }

        info!(
            "Persisted index for '{}' to {} ({} + {} bytes)",
            location,
            dir.display(),
            index_bytes.len(),
            chunk_bytes.len()
        );
        Ok(())
    }

    async fn load(&self, location: &IndexLocation) -> Result<IndexSnapshot> {
        let dir = self.location_dir(location);
        let guard = self.locks.read(&self.lock_key(location)).await;
        let index_bytes = read_artifact(&dir.join(INDEX_FILE), location).await?;
        let chunk_bytes = read_artifact(&dir.join(CHUNKS_FILE), location).await?;
        drop(guard);

        let owned_location = location.clone();
        let snapshot =
            spawn_blocking(move || decode_artifacts(&owned_location, &index_bytes, &chunk_bytes))
                .await
                .map_err(|error| join_error(&error))??;

        debug!(
            "Loaded index for '{}': {} vectors of dimension {}",
            location,
            snapshot.index().len(),
            snapshot.index().dimension()
        );
        Ok(snapshot)
    }
}

fn encode_snapshot(snapshot: IndexSnapshot, index_path: &Path) -> Result<(Vec<u8>, Vec<u8>)> {
    let IndexSnapshot {
        model,
        index,
        chunks,
    } = snapshot;
    let count = index.len() as u64;
    let (dimension, vectors) = index.into_raw();
    let chunk_bytes = serde_json::to_vec(&chunks)?;

    let artifact = IndexArtifact {
        version: IndexArtifact::VERSION,
        model,
        dimension: dimension as u64,
        count,
        chunk_digest: fnv1a(&chunk_bytes),
        vectors,
    };
    let index_bytes = encode_to_vec(&artifact, bincode_config()).map_err(|error| {
        Error::storage(
            "encode",
            index_path,
            IoError::other(format!("Failed to serialize index: {error}")),
        )
    })?;

    Ok((index_bytes, chunk_bytes))
}

/// Check every length in the index artifact against the bytes actually
/// present, so decoding never allocates for lengths the file cannot hold.
fn check_artifact_lengths(location: &str, index_bytes: &[u8]) -> Result<()> {
    let unreadable = |error: DecodeError| {
        Error::corrupt(location, format!("index artifact is unreadable: {error}"))
    };

    let header_config = bincode_config().with_limit::<HEADER_LIMIT>();
    let ((version, ..), header_len): (ArtifactHeader, usize) =
        decode_from_slice(index_bytes, header_config).map_err(unreadable)?;

    if version != IndexArtifact::VERSION {
        return Err(Error::corrupt(
            location,
            format!(
                "unsupported index format version {version} (expected {})",
                IndexArtifact::VERSION
            ),
        ));
    }

    let payload = index_bytes.get(header_len..).unwrap_or_default();
    let (values, prefix_len): (u64, usize) =
        decode_from_slice(payload, bincode_config()).map_err(unreadable)?;
    let available = payload.len().saturating_sub(prefix_len);
    let needed = usize::try_from(values)
        .ok()
        .and_then(|len| len.checked_mul(size_of::<f32>()));
    if needed != Some(available) {
        return Err(Error::corrupt(
            location,
            format!("vector payload declares {values} values but {available} bytes follow"),
        ));
    }

    Ok(())
}

fn decode_artifacts(
    location: &IndexLocation,
    index_bytes: &[u8],
    chunk_bytes: &[u8],
) -> Result<IndexSnapshot> {
    let key = location.as_str();
    check_artifact_lengths(key, index_bytes)?;
    let (artifact, _): (IndexArtifact, usize) = decode_from_slice(index_bytes, bincode_config())
        .map_err(|error| Error::corrupt(key, format!("index artifact is unreadable: {error}")))?;

    let declared = (artifact.dimension as usize).checked_mul(artifact.count as usize);
    if declared != Some(artifact.vectors.len()) {
        return Err(Error::corrupt(
            key,
            format!(
                "header declares {} vectors of dimension {} but payload holds {} values",
                artifact.count,
                artifact.dimension,
                artifact.vectors.len()
            ),
        ));
    }

    let index = FlatIndex::from_raw(artifact.dimension as usize, artifact.vectors)
        .ok_or_else(|| Error::corrupt(key, "index dimension is zero"))?;

    let chunks: Vec<String> = serde_json::from_slice(chunk_bytes).map_err(|error| {
        Error::corrupt(key, format!("chunk sequence is unreadable: {error}"))
    })?;

    let snapshot = IndexSnapshot::new(location, artifact.model, index, chunks)?;
    if fnv1a(chunk_bytes) != artifact.chunk_digest {
        return Err(Error::corrupt(
            key,
            "chunk sequence was not written with this index",
        ));
    }

    Ok(snapshot)
}

async fn read_artifact(path: &Path, location: &IndexLocation) -> Result<Vec<u8>> {
    match async_fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(error) if error.kind() == ErrorKind::NotFound => Err(Error::IndexNotFound {
            location: location.to_string(),
        }),
        Err(error) => Err(Error::storage("read", path, error)),
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    async_fs::write(path, bytes)
        .await
        .map_err(|error| Error::storage("write", path, error))
}

async fn rename_file(from: &Path, to: &Path) -> Result<()> {
    async_fs::rename(from, to)
        .await
        .map_err(|error| Error::storage("rename", to, error))
}

/// Remove staged files left by a failed persist.
async fn discard_staged(paths: &[&Path]) {
    for path in paths {
        let Err(error) = async_fs::remove_file(path).await else {
            continue;
        };
        if error.kind() != ErrorKind::NotFound {
            warn!("Failed to remove staged file {}: {error}", path.display());
        }
    }
}

fn join_error(error: &JoinError) -> Error {
    Error::Io(IoError::other(format!("Task join error: {error}")))
}
