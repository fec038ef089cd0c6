/// Name of the directory holding blobs under the locker data directory.
pub const BLOBS_FOLDER_NAME: &str = "secure_files";

/// Prefix used for in-flight temporary files next to their final location.
pub(crate) const TEMP_FILE_PREFIX: &str = ".incoming-";
