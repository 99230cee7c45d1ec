//! Cache Store Module
//!
//! Key-addressed response storage combining a storage backend, per-key
//! write serialization and approximate lookup.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use crate::cache::fuzzy::{self, FuzzyMatch};
use crate::cache::{
    CacheCounters, CacheEntry, CacheStats, FormatTag, FsBackend, KeyLocks, MatchKind,
    StorageBackend, StorageKey,
};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Response store addressed by [`StorageKey`].
pub struct CacheStore {
    /// Byte storage
    backend: Arc<dyn StorageBackend>,
    /// Writer serialization per key
    locks: KeyLocks,
    /// Lookup and write statistics
    counters: CacheCounters,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store over an arbitrary backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            locks: KeyLocks::new(),
            counters: CacheCounters::new(),
        }
    }

    /// Opens a filesystem-backed store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let backend = FsBackend::open(dir).await?;
        Ok(Self::new(Arc::new(backend)))
    }

    // == Get ==
    /// Exact lookup.
    ///
    /// Probes the key under every stored extension in classifier priority
    /// order and returns the first regular file found.
    pub async fn get(&self, key: &StorageKey) -> Result<Option<CacheEntry>> {
        for path in key.candidate_paths() {
            if let Some(body) = self.read_if_present(&path).await? {
                return Ok(Some(CacheEntry::new(path, body, MatchKind::Exact)));
            }
        }
        Ok(None)
    }

    // == Put ==
    /// Stores `body` under `key` with the extension of `format`.
    ///
    /// Variants of the key under other extensions are removed so the next
    /// exact lookup cannot observe a stale format.
    pub async fn put(&self, key: &StorageKey, format: FormatTag, body: Bytes) -> Result<()> {
        let target = key.with_extension(format);
        let _guard = self.locks.acquire(key.as_str()).await;

        self.backend.write_atomic(&target, body).await?;
        for path in key.candidate_paths().filter(|path| *path != target) {
            self.backend.delete(&path).await?;
        }

        self.counters.record_write();
        debug!("Wrote cache entry {}", target);
        Ok(())
    }

    // == Invalidate ==
    /// Removes every artifact stored under `key`.
    ///
    /// Returns false, not an error, when nothing was stored.
    pub async fn invalidate(&self, key: &StorageKey) -> Result<bool> {
        let _guard = self.locks.acquire(key.as_str()).await;

        let mut removed = false;
        for path in key.candidate_paths() {
            removed |= self.backend.delete(&path).await?;
        }

        if removed {
            self.counters.record_invalidation();
            info!("Invalidated cache entry {}", key);
        }
        Ok(removed)
    }

    // == Nearest Match ==
    /// Finds the stored sibling closest to `key`, if one clears the threshold.
    pub async fn nearest_match(&self, key: &StorageKey) -> Result<Option<FuzzyMatch>> {
        let target = key.with_extension(FormatTag::Json);
        fuzzy::nearest_match(self.backend.as_ref(), &target).await
    }

    // == Lookup ==
    /// Exact lookup, falling back to the fuzzy matcher when `fuzzy` is set.
    ///
    /// Updates hit and miss statistics.
    pub async fn lookup(&self, key: &StorageKey, fuzzy: bool) -> Result<Option<CacheEntry>> {
        if let Some(entry) = self.get(key).await? {
            self.counters.record_hit();
            return Ok(Some(entry));
        }

        if fuzzy {
            if let Some(found) = self.nearest_match(key).await? {
                if let Some(body) = self.read_if_present(&found.path).await? {
                    self.counters.record_fuzzy_hit();
                    let matched = MatchKind::Fuzzy { ratio: found.ratio };
                    return Ok(Some(CacheEntry::new(found.path, body, matched)));
                }
            }
        }

        self.counters.record_miss();
        Ok(None)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Live counters, for outcomes recorded outside the store.
    pub fn counters(&self) -> &CacheCounters {
        &self.counters
    }

    /// Reads `path` if a regular file is there; a concurrent removal is a miss.
    async fn read_if_present(&self, path: &str) -> Result<Option<Bytes>> {
        if !self.backend.exists(path).await? {
            return Ok(None);
        }
        match self.backend.read(path).await {
            Ok(body) => Ok(Some(body)),
            Err(CacheError::Storage(err)) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}
