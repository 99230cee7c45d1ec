//! Per-Key Lock Table
//!
//! Serializes writers (put / invalidate) that target the same storage key.
//! Readers never take these locks.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

// == Key Locks ==
/// Table of async mutexes keyed by serialized storage key.
#[derive(Debug, Default)]
pub struct KeyLocks {
    table: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive write access to one key. Dropping it releases the key.
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    // == Acquire ==
    /// Waits until no other writer holds `key`.
    pub async fn acquire(&self, key: &str) -> KeyGuard<'_> {
        let mutex = self
            .table
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = mutex.lock_owned().await;
        KeyGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of keys with a live lock entry.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the table itself still references an idle mutex.
        self.locks
            .table
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
