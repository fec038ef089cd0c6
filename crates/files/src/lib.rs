//! Locker Blob Storage
//!
//! This crate owns the physical bytes of every file kept in the locker. It knows nothing
//! about owners, logical names or checksums: callers hand it an opaque *physical name* and
//! a byte sequence, and it keeps that sequence durable under a single root directory.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//! └── secure_files/         # blob root
//!     └── ab/
//!         └── cd/
//!             └── abcd12…   # one file per physical name
//! ```
//!
//! Physical names are relative paths chosen by the index. The store only checks that they
//! stay inside the root.
//!
//! ## Example Usage
//!
//! ```no_run
//! use locker_files::{BlobStore, FsBlobStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FsBlobStore::new("locker_data/secure_files");
//! store.ensure_root()?;
//! store.put("ab/cd/abcd", b"hello")?;
//! assert_eq!(store.get("ab/cd/abcd")?, b"hello");
//! # Ok(())
//! # }
//! ```

mod blobs;
mod constants;

pub use blobs::{BlobStore, FsBlobStore};
pub use constants::BLOBS_FOLDER_NAME;

use std::path::PathBuf;

/// Errors that can occur during blob operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The physical name does not exist under the root
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// The physical name is empty, absolute, or escapes the root
    #[error("Invalid physical name: {0}")]
    InvalidName(String),

    /// Any other filesystem failure (disk full, permission denied, ...)
    #[error("I/O error at {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoFailure {
            path: path.into(),
            source,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
