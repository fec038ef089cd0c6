//! Human-readable rendering of locker records.

use chrono::{DateTime, Utc};
use locker_core::StoredFile;

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Formats a byte count as `B`, `KB`, `MB` or `GB` with one decimal above bytes.
pub fn format_file_size(bytes: u64) -> String {
    let size = bytes as f64;
    if size < KIB {
        format!("{bytes} B")
    } else if size < MIB {
        format!("{:.1} KB", size / KIB)
    } else if size < GIB {
        format!("{:.1} MB", size / MIB)
    } else {
        format!("{:.1} GB", size / GIB)
    }
}

fn format_timestamp(at: &DateTime<Utc>, with_seconds: bool) -> String {
    if with_seconds {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Renders the owner's files as a fixed-width table.
pub fn file_table(files: &[StoredFile]) -> String {
    let mut out = format!(
        "{:<20} {:<10} {:<15} {:<20}\n",
        "File Name", "Type", "Size", "Upload Date"
    );
    out.push_str(&"-".repeat(65));
    out.push('\n');

    for file in files {
        out.push_str(&format!(
            "{:<20} {:<10} {:<15} {:<20}\n",
            file.logical_name.as_str(),
            file.extension(),
            format_file_size(file.size_bytes),
            format_timestamp(&file.uploaded_at, false),
        ));
    }

    out
}

/// Renders the detail view of a single file.
pub fn file_details(file: &StoredFile) -> String {
    format!(
        "File Name: {}\nFile Type: {}\nMedia Type: {}\nFile Size: {}\nUpload Date: {}\nChecksum: {}\n",
        file.logical_name,
        file.extension(),
        file.content_type.as_deref().unwrap_or("unknown"),
        format_file_size(file.size_bytes),
        format_timestamp(&file.uploaded_at, true),
        file.checksum,
    )
}
