//! Storage Backend Module
//!
//! Hierarchical, path-addressable byte storage used by the cache store.

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};

/// File name prefix of artifacts that are still being written.
pub const PARTIAL_PREFIX: &str = ".partial-";

// == Storage Backend Trait ==
/// Byte storage addressed by relative, `/`-separated paths.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// True only if a regular file exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Reads the whole artifact at `path`.
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Writes `data` so readers see either the previous artifact or all of `data`.
    async fn write_atomic(&self, path: &str, data: Bytes) -> Result<()>;

    /// Removes the artifact at `path`; returns false if nothing was there.
    async fn delete(&self, path: &str) -> Result<bool>;

    /// Lists the regular files sharing the parent directory of `path`,
    /// returned as storage paths sorted by file name.
    async fn list_siblings(&self, path: &str) -> Result<Vec<String>>;
}

// == Filesystem Backend ==
/// Filesystem backend rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    // == Constructor ==
    /// Opens a backend at `root`, creating the directory if needed and
    /// sweeping partial artifacts left behind by an interrupted writer.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let backend = Self { root: root.into() };
        fs::create_dir_all(&backend.root).await?;

        let removed = backend.sweep_partials().await?;
        if removed > 0 {
            warn!("Removed {} partial cache artifacts under {:?}", removed, backend.root);
        }

        Ok(backend)
    }

    /// Resolves a storage path below the root.
    ///
    /// Empty segments are skipped; `..` and absolute components are rejected.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        let mut depth = 0usize;

        for component in Path::new(path).components() {
            match component {
                Component::Normal(segment) => {
                    resolved.push(segment);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(CacheError::InvalidKey(path.to_string()));
                }
            }
        }

        if depth == 0 {
            return Err(CacheError::InvalidKey(path.to_string()));
        }
        Ok(resolved)
    }

    /// Removes empty directories from `dir` up to, not including, the root.
    async fn prune_empty_ancestors(&self, mut dir: PathBuf) {
        while dir != self.root && dir.starts_with(&self.root) {
            // Fails on non-empty directories, which ends the walk.
            if fs::remove_dir(&dir).await.is_err() {
                break;
            }
            debug!("Pruned empty cache directory {:?}", dir);
            if !dir.pop() {
                break;
            }
        }
    }

    async fn sweep_partials(&self) -> Result<usize> {
        let mut removed = 0;
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if entry.file_name().to_string_lossy().starts_with(PARTIAL_PREFIX) {
                    fs::remove_file(entry.path()).await?;
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }
}

/// Writes into a temp file beside `target` and renames it into place.
fn write_then_rename(target: &Path, data: &[u8]) -> io::Result<()> {
    let dir = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "storage path has no parent"))?;

    std::fs::create_dir_all(dir)?;
    let mut partial = match tempfile::Builder::new().prefix(PARTIAL_PREFIX).tempfile_in(dir) {
        Ok(file) => file,
        // A concurrent invalidation may prune the directory before the temp file lands.
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            std::fs::create_dir_all(dir)?;
            tempfile::Builder::new().prefix(PARTIAL_PREFIX).tempfile_in(dir)?
        }
        Err(err) => return Err(err),
    };

    partial.write_all(data)?;
    partial.as_file().sync_all()?;
    partial.persist(target).map_err(|err| err.error)?;
    Ok(())
}

#[async_trait]
impl StorageBackend for FsBackend {
    async fn exists(&self, path: &str) -> Result<bool> {
        let resolved = self.resolve(path)?;
        match fs::metadata(&resolved).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn read(&self, path: &str) -> Result<Bytes> {
        let resolved = self.resolve(path)?;
        let data = fs::read(&resolved).await?;
        Ok(Bytes::from(data))
    }

    async fn write_atomic(&self, path: &str, data: Bytes) -> Result<()> {
        let resolved = self.resolve(path)?;
        tokio::task::spawn_blocking(move || write_then_rename(&resolved, &data))
            .await
            .map_err(|err| CacheError::Internal(format!("storage writer panicked: {}", err)))??;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let resolved = self.resolve(path)?;
        match fs::remove_file(&resolved).await {
            Ok(()) => {
                if let Some(parent) = resolved.parent() {
                    self.prune_empty_ancestors(parent.to_path_buf()).await;
                }
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_siblings(&self, path: &str) -> Result<Vec<String>> {
        let resolved = self.resolve(path)?;
        let Some(dir) = resolved.parent() else {
            return Ok(Vec::new());
        };
        // Storage-path prefix of the directory, as given by the caller.
        let prefix = match path.rfind('/') {
            Some(idx) => &path[..=idx],
            None => "",
        };

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(PARTIAL_PREFIX) {
                continue;
            }
            names.push(name);
        }
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| format!("{}{}", prefix, name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn backend() -> (TempDir, FsBackend) {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::open(dir.path()).await.unwrap();
        (dir, backend)
    }

    #[tokio::test]
    async fn test_write_read_exists() {
        let (_dir, backend) = backend().await;

        assert!(!backend.exists("A/B/c.json").await.unwrap());
        backend
            .write_atomic("A/B/c.json", Bytes::from_static(b"{\"x\":1}"))
            .await
            .unwrap();

        assert!(backend.exists("A/B/c.json").await.unwrap());
        assert_eq!(backend.read("A/B/c.json").await.unwrap(), Bytes::from_static(b"{\"x\":1}"));
    }

    #[tokio::test]
    async fn test_exists_false_for_directory() {
        let (_dir, backend) = backend().await;
        backend
            .write_atomic("A/B/c.json", Bytes::from_static(b"1"))
            .await
            .unwrap();

        assert!(!backend.exists("A/B").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let (_dir, backend) = backend().await;
        backend.write_atomic("k.json", Bytes::from_static(b"old")).await.unwrap();
        backend.write_atomic("k.json", Bytes::from_static(b"new")).await.unwrap();

        assert_eq!(backend.read("k.json").await.unwrap(), Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn test_delete_prunes_empty_ancestors() {
        let (dir, backend) = backend().await;
        backend
            .write_atomic("A/B/C/d.json", Bytes::from_static(b"1"))
            .await
            .unwrap();
        backend
            .write_atomic("A/keep.json", Bytes::from_static(b"2"))
            .await
            .unwrap();

        assert!(backend.delete("A/B/C/d.json").await.unwrap());
        assert!(!dir.path().join("A/B").exists());
        assert!(dir.path().join("A/keep.json").exists());
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let (_dir, backend) = backend().await;
        assert!(!backend.delete("nope/missing.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_parent_components() {
        let (_dir, backend) = backend().await;

        let result = backend.read("A/../../etc/passwd").await;
        assert!(matches!(result, Err(CacheError::InvalidKey(_))));

        let result = backend.write_atomic("/abs.json", Bytes::new()).await;
        assert!(matches!(result, Err(CacheError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_empty_segments_are_skipped() {
        let (_dir, backend) = backend().await;
        backend
            .write_atomic("A/B//items.json", Bytes::from_static(b"1"))
            .await
            .unwrap();

        assert!(backend.exists("A/B/items.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_siblings_sorted_files_only() {
        let (_dir, backend) = backend().await;
        for name in ["D/b.json", "D/a.json", "D/sub/x.json"] {
            backend.write_atomic(name, Bytes::from_static(b"1")).await.unwrap();
        }

        let siblings = backend.list_siblings("D/zzz.json").await.unwrap();
        assert_eq!(siblings, vec!["D/a.json".to_string(), "D/b.json".to_string()]);
    }

    #[tokio::test]
    async fn test_list_siblings_missing_dir() {
        let (_dir, backend) = backend().await;
        assert!(backend.list_siblings("none/x.json").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_sweeps_partials() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("A")).unwrap();
        std::fs::write(dir.path().join("A").join(".partial-abc"), b"torn").unwrap();
        std::fs::write(dir.path().join("A").join("kept.json"), b"ok").unwrap();

        let backend = FsBackend::open(dir.path()).await.unwrap();

        assert!(!dir.path().join("A/.partial-abc").exists());
        assert!(backend.exists("A/kept.json").await.unwrap());
    }
}
