//! Per-location reader/writer locks.

use sift_core::IgnoreLock as _;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Registry of one reader/writer lock per location directory.
///
/// Persisting a location takes its write lock; loading it takes a read
/// lock, so a load never observes a half-replaced artifact pair. Different
/// locations never contend. Entries nobody holds are dropped the next time
/// a lock is handed out.
#[derive(Debug, Default)]
pub struct LocationLocks {
    locks: Mutex<HashMap<PathBuf, Arc<RwLock<()>>>>,
}

impl LocationLocks {
    /// Registry shared by every storage handle in the process.
    pub fn shared() -> Arc<Self> {
        static SHARED: LazyLock<Arc<LocationLocks>> = LazyLock::new(Arc::default);
        Arc::clone(&SHARED)
    }

    /// Acquire shared access to the location stored at `dir`.
    pub async fn read(&self, dir: &Path) -> OwnedRwLockReadGuard<()> {
        self.lock_for(dir).read_owned().await
    }

    /// Acquire exclusive access to the location stored at `dir`.
    pub async fn write(&self, dir: &Path) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(dir).write_owned().await
    }

    /// Number of locations currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.lock_ignore_poison().len()
    }

    fn lock_for(&self, dir: &Path) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock_ignore_poison();
        // Held guards and pending waiters each own a clone.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(dir.to_path_buf()).or_default())
    }
}
