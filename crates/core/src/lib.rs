//! # Locker Core
//!
//! Core business logic for the digital locker.
//!
//! This crate contains:
//! - [`LockerIndex`]: the owner-scoped file index, brokering every store, retrieve, list and
//!   delete over a [`BlobStore`]
//! - Index persistence behind the [`IndexStore`] trait, with a versioned JSON-lines file
//!   backend and an in-memory backend
//! - [`LockerConfig`] resolved once at startup
//! - Principal registration and authentication behind [`AuthenticationProvider`]
//!
//! **No presentation concerns**: this crate never prints and never exits. Front-ends translate
//! [`LockerError`] and [`AuthError`] into messages.
//!
//! ## Example Usage
//!
//! ```no_run
//! use locker_core::{FsBlobStore, JsonLinesIndexStore, LockerConfig, LockerIndex};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LockerConfig::from_override(None)?;
//! let index = LockerIndex::open(
//!     FsBlobStore::new(config.blobs_dir()),
//!     JsonLinesIndexStore::new(config.index_path()),
//! )?;
//!
//! let record = index.store("alice", "notes.txt", b"hello")?;
//! assert_eq!(record.size_bytes, 5);
//! assert_eq!(index.read_bytes("alice", "notes.txt")?, b"hello");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod constants;
mod error;
mod index;
mod persistence;
mod stored_file;

pub use auth::{AuthError, AuthenticationProvider, FileAuthProvider, PrincipalId};
pub use config::{ConfigError, LockerConfig};
pub use error::{LockerError, LockerResult, PersistError, PersistResult};
pub use index::LockerIndex;
pub use persistence::{IndexStore, JsonLinesIndexStore, MemoryIndexStore};
pub use stored_file::StoredFile;

pub use locker_files::{BlobStore, FsBlobStore, StorageError};
pub use locker_types::{LogicalName, Sha256Hash};

/// The locker as wired up by the binary: blobs on the local filesystem, index in a
/// JSON-lines file.
pub type FsLocker = LockerIndex<FsBlobStore, JsonLinesIndexStore>;

/// Opens the filesystem-backed locker described by `config`.
pub fn open_fs_locker(config: &LockerConfig) -> LockerResult<FsLocker> {
    LockerIndex::open(
        FsBlobStore::new(config.blobs_dir()),
        JsonLinesIndexStore::new(config.index_path()),
    )
}
