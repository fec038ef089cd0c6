//! Filesystem-backed blob storage
//!
//! [`BlobStore`] is the seam the index talks to; [`FsBlobStore`] is the implementation used
//! by the binary. Every `get` re-reads from disk, nothing is cached.
//!
//! # Write Path
//!
//! `put` never writes the destination file in place. Bytes go to a temporary file created
//! in the destination directory, are synced, and the temporary file is then renamed over
//! the physical name. A reader therefore sees either the previous blob or the new one,
//! never a truncated mix, and a failed `put` leaves nothing behind under the physical name.

use crate::constants::TEMP_FILE_PREFIX;
use crate::{StorageError, StorageResult};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

/// Durable byte storage keyed by physical name.
pub trait BlobStore: Send + Sync {
    /// Creates the storage root if it is absent. Called once at startup.
    fn ensure_root(&self) -> StorageResult<()>;

    /// Writes `bytes` under `physical_name`, replacing any existing blob.
    ///
    /// On error the caller must not consider the blob stored.
    fn put(&self, physical_name: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Reads the full byte sequence stored under `physical_name`.
    ///
    /// Returns [`StorageError::NotFound`] if nothing is stored there.
    fn get(&self, physical_name: &str) -> StorageResult<Vec<u8>>;

    /// Removes the blob. Returns `Ok(false)` if it was already absent.
    fn delete(&self, physical_name: &str) -> StorageResult<bool>;
}

/// Blob store rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`. No I/O happens until [`BlobStore::ensure_root`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a physical name to an absolute location under the root.
    ///
    /// Only plain relative paths are accepted: no root, prefix, `.` or `..` components.
    fn resolve(&self, physical_name: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(physical_name);
        let mut components = relative.components().peekable();

        if components.peek().is_none() {
            return Err(StorageError::InvalidName(physical_name.to_owned()));
        }
        if !components.all(|c| matches!(c, Component::Normal(_))) {
            return Err(StorageError::InvalidName(physical_name.to_owned()));
        }

        Ok(self.root.join(relative))
    }

    /// Removes now-empty shard directories between `path` and the root.
    ///
    /// Failures are ignored: a non-empty or busy directory simply stays.
    fn prune_empty_parents(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.root.as_path() || !dir.starts_with(&self.root) {
                break;
            }
            if fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

impl BlobStore for FsBlobStore {
    fn ensure_root(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| StorageError::io(&self.root, e))?;

        if !self.root.is_dir() {
            return Err(StorageError::io(
                &self.root,
                std::io::Error::new(ErrorKind::Other, "blob root is not a directory"),
            ));
        }

        Ok(())
    }

    fn put(&self, physical_name: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.resolve(physical_name)?;
        let parent = path.parent().unwrap_or(self.root.as_path());

        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;

        let mut incoming = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(parent)
            .map_err(|e| StorageError::io(parent, e))?;

        incoming
            .write_all(bytes)
            .and_then(|()| incoming.as_file().sync_all())
            .map_err(|e| StorageError::io(incoming.path(), e))?;

        incoming
            .persist(&path)
            .map_err(|e| StorageError::io(&path, e.error))?;

        tracing::debug!(physical_name, size = bytes.len(), "blob written");
        Ok(())
    }

    fn get(&self, physical_name: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(physical_name)?;

        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(physical_name.to_owned()),
            _ => StorageError::io(&path, e),
        })
    }

    fn delete(&self, physical_name: &str) -> StorageResult<bool> {
        let path = self.resolve(physical_name)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                self.prune_empty_parents(&path);
                tracing::debug!(physical_name, "blob deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }
}
