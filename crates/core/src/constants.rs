//! Constants used throughout the locker core crate.
//!
//! Path and filename constants live here so that the binary and the tests agree on the
//! on-disk layout.

pub use locker_files::BLOBS_FOLDER_NAME;

/// Default directory for locker data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "locker_data";

/// Filename for the persisted file index.
pub const INDEX_FILENAME: &str = "file_index.jsonl";

/// Filename for registered users.
pub const USERS_FILENAME: &str = "users.json";

/// Format tag written in the first line of the index file.
pub const INDEX_FORMAT: &str = "locker-index";

/// Current version of the index record format.
pub const INDEX_FORMAT_VERSION: u32 = 1;
