//! Synchronization utilities for handling poisoned locks.

use std::sync::{Mutex, MutexGuard};

/// Extension trait for `Mutex` that ignores lock poisoning.
///
/// The registries guarded this way only ever hold plain maps, so a panic
/// in another thread cannot leave them half-updated.
pub trait IgnoreLock<T> {
    /// Lock the mutex, ignoring any poison error.
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T>;
}

impl<T> IgnoreLock<T> for Mutex<T> {
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
