use locker_files::StorageError;
use locker_types::TextError;

/// Failures surfaced by [`crate::LockerIndex`].
///
/// Raw I/O errors never leak past the index: they arrive wrapped in a [`StorageError`] or are
/// folded into [`LockerError::Corrupted`], so callers only branch on these four cases.
#[derive(Debug, thiserror::Error)]
pub enum LockerError {
    #[error("invalid file name: {0}")]
    InvalidName(String),
    #[error("file not found: {owner}/{name}")]
    NotFound { owner: String, name: String },
    #[error("locker is corrupted: {0}")]
    Corrupted(String),
    #[error("storage failure: {0}")]
    StorageFailure(#[source] StorageError),
}

impl LockerError {
    pub(crate) fn not_found(owner: &str, name: &str) -> Self {
        Self::NotFound {
            owner: owner.to_owned(),
            name: name.to_owned(),
        }
    }
}

impl From<TextError> for LockerError {
    fn from(err: TextError) -> Self {
        Self::InvalidName(err.to_string())
    }
}

impl From<PersistError> for LockerError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::Io { path, source } => {
                Self::StorageFailure(StorageError::IoFailure { path, source })
            }
            corrupt @ (PersistError::Corrupt { .. } | PersistError::Serialization(_)) => {
                Self::Corrupted(corrupt.to_string())
            }
        }
    }
}

pub type LockerResult<T> = std::result::Result<T, LockerError>;

/// Failures of an [`crate::IndexStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to access index file {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("index is corrupt at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
    #[error("failed to serialize index record: {0}")]
    Serialization(serde_json::Error),
}

pub type PersistResult<T> = std::result::Result<T, PersistError>;
