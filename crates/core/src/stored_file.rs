//! Metadata record for one stored upload.

use chrono::{DateTime, Utc};
use locker_types::{LogicalName, Sha256Hash};

/// Metadata for a file held in the locker.
///
/// A record only exists once the bytes it describes are durably written under
/// `physical_name`. After that, everything except `logical_name` is fixed for the lifetime of
/// the record; re-storing the same logical name replaces the whole record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct StoredFile {
    /// Name the owner refers to the file by
    pub logical_name: LogicalName,

    /// Principal that owns the file
    pub owner_id: String,

    /// Location of the bytes, relative to the blob root
    pub physical_name: String,

    /// Size of the stored bytes
    pub size_bytes: u64,

    /// SHA-256 of the stored bytes, computed once at ingestion
    pub checksum: Sha256Hash,

    /// UTC timestamp when the upload was accepted
    pub uploaded_at: DateTime<Utc>,

    /// Best-effort media type, guessed from the name and then from the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl StoredFile {
    /// Builds the record for `bytes` about to be stored under `physical_name`.
    pub(crate) fn new(
        owner_id: &str,
        logical_name: LogicalName,
        physical_name: String,
        bytes: &[u8],
    ) -> Self {
        let content_type = detect_content_type(&logical_name, bytes);

        Self {
            owner_id: owner_id.to_owned(),
            physical_name,
            size_bytes: bytes.len() as u64,
            checksum: Sha256Hash::digest(bytes),
            uploaded_at: Utc::now(),
            content_type,
            logical_name,
        }
    }

    /// File type shown in listings: the name suffix, or `"unknown"`.
    pub fn extension(&self) -> &str {
        self.logical_name.extension().unwrap_or("unknown")
    }
}

/// Derives the physical name for an owner's logical name.
///
/// The name is the SHA-256 of `owner ‖ 0x00 ‖ logical_name`, sharded two levels deep
/// (`ab/cd/abcd…`). The separator byte keeps `("a_b", "c")` and `("a", "b_c")` apart, and the
/// result is deterministic so a re-store lands on the same blob.
pub(crate) fn physical_name_for(owner_id: &str, logical_name: &LogicalName) -> String {
    let mut key = Vec::with_capacity(owner_id.len() + 1 + logical_name.as_str().len());
    key.extend_from_slice(owner_id.as_bytes());
    key.push(0);
    key.extend_from_slice(logical_name.as_str().as_bytes());

    let hash = Sha256Hash::digest(&key);
    let hex = hash.as_str();
    format!("{}/{}/{}", &hex[0..2], &hex[2..4], hex)
}

fn detect_content_type(logical_name: &LogicalName, bytes: &[u8]) -> Option<String> {
    mime_guess::from_path(logical_name.as_str())
        .first_raw()
        .map(str::to_owned)
        .or_else(|| infer::get(bytes).map(|kind| kind.mime_type().to_owned()))
}
