//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Nothing in this crate reads environment variables; the binary
//! does that and hands the result over as a [`LockerConfig`].

use crate::constants::{BLOBS_FOLDER_NAME, DEFAULT_DATA_DIR, INDEX_FILENAME, USERS_FILENAME};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("data directory cannot be empty")]
    EmptyDataDir,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct LockerConfig {
    data_dir: PathBuf,
}

impl LockerConfig {
    /// Create a new `LockerConfig` rooted at `data_dir`.
    pub fn new(data_dir: PathBuf) -> Result<Self, ConfigError> {
        if data_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }

        Ok(Self { data_dir })
    }

    /// Resolve the data directory from an optional override value.
    ///
    /// `None` or a blank value falls back to [`DEFAULT_DATA_DIR`] relative to the working
    /// directory.
    pub fn from_override(value: Option<String>) -> Result<Self, ConfigError> {
        let dir = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        Self::new(PathBuf::from(dir))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join(BLOBS_FOLDER_NAME)
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILENAME)
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join(USERS_FILENAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_live_under_data_dir() {
        let config = LockerConfig::new(PathBuf::from("/srv/locker")).unwrap();

        assert_eq!(config.blobs_dir(), PathBuf::from("/srv/locker/secure_files"));
        assert_eq!(
            config.index_path(),
            PathBuf::from("/srv/locker/file_index.jsonl")
        );
        assert_eq!(config.users_path(), PathBuf::from("/srv/locker/users.json"));
    }

    #[test]
    fn blank_override_uses_default() {
        let config = LockerConfig::from_override(Some("   ".into())).unwrap();
        assert_eq!(config.data_dir(), Path::new(DEFAULT_DATA_DIR));

        let config = LockerConfig::from_override(None).unwrap();
        assert_eq!(config.data_dir(), Path::new(DEFAULT_DATA_DIR));
    }

    #[test]
    fn empty_data_dir_is_rejected() {
        assert!(matches!(
            LockerConfig::new(PathBuf::new()),
            Err(ConfigError::EmptyDataDir)
        ));
    }
}
