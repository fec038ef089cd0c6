//! Durable storage for the file index.
//!
//! The index is persisted as a whole after every mutation. [`JsonLinesIndexStore`] writes a
//! versioned, line-oriented file:
//!
//! ```text
//! {"format":"locker-index","version":1,"records":2}
//! {"logical_name":"notes.txt","owner_id":"alice",...}
//! {"logical_name":"report.pdf","owner_id":"bob",...}
//! ```
//!
//! The header carries the record count, so a file cut short on a line boundary is detected
//! just like a torn line is. Saves go to a temporary file that is renamed over the index, so
//! the file on disk is always one complete snapshot.

use crate::constants::{INDEX_FORMAT, INDEX_FORMAT_VERSION};
use crate::error::{PersistError, PersistResult};
use crate::StoredFile;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Backend that loads and saves the complete set of index records.
pub trait IndexStore: Send + Sync {
    /// Loads every record in persisted order. A backend with nothing saved yet returns an
    /// empty list.
    fn load(&self) -> PersistResult<Vec<StoredFile>>;

    /// Replaces the persisted state with `records`.
    fn save(&self, records: &[StoredFile]) -> PersistResult<()>;
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct IndexHeader {
    format: String,
    version: u32,
    records: usize,
}

/// Index persisted as JSON lines in a single file.
#[derive(Debug, Clone)]
pub struct JsonLinesIndexStore {
    path: PathBuf,
}

impl JsonLinesIndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl IndexStore for JsonLinesIndexStore {
    fn load(&self) -> PersistResult<Vec<StoredFile>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut lines = BufReader::new(file).lines();

        let header_line = match lines.next() {
            Some(line) => line.map_err(|e| self.io_error(e))?,
            // An empty file is what a crash between create and first write leaves behind
            None => return Ok(Vec::new()),
        };
        let header: IndexHeader =
            serde_json::from_str(&header_line).map_err(|e| PersistError::Corrupt {
                line: 1,
                reason: format!("unreadable header: {e}"),
            })?;

        if header.format != INDEX_FORMAT {
            return Err(PersistError::Corrupt {
                line: 1,
                reason: format!("unexpected format tag {:?}", header.format),
            });
        }
        if header.version != INDEX_FORMAT_VERSION {
            return Err(PersistError::Corrupt {
                line: 1,
                reason: format!("unsupported index version {}", header.version),
            });
        }

        // The declared count is checked after reading, never trusted for allocation
        let mut records = Vec::new();
        for (offset, line) in lines.enumerate() {
            let line_no = offset + 2;
            let line = line.map_err(|e| self.io_error(e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: StoredFile =
                serde_json::from_str(&line).map_err(|e| PersistError::Corrupt {
                    line: line_no,
                    reason: e.to_string(),
                })?;
            records.push(record);
        }

        if records.len() != header.records {
            return Err(PersistError::Corrupt {
                line: records.len() + 1,
                reason: format!(
                    "header declares {} records but {} were found",
                    header.records,
                    records.len()
                ),
            });
        }

        Ok(records)
    }

    fn save(&self, records: &[StoredFile]) -> PersistResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let incoming = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        let mut writer = BufWriter::new(incoming);

        let header = IndexHeader {
            format: INDEX_FORMAT.to_string(),
            version: INDEX_FORMAT_VERSION,
            records: records.len(),
        };
        serde_json::to_writer(&mut writer, &header).map_err(PersistError::Serialization)?;
        writer.write_all(b"\n").map_err(|e| self.io_error(e))?;

        for record in records {
            serde_json::to_writer(&mut writer, record).map_err(PersistError::Serialization)?;
            writer.write_all(b"\n").map_err(|e| self.io_error(e))?;
        }

        let incoming = writer
            .into_inner()
            .map_err(|e| self.io_error(e.into_error()))?;
        incoming
            .as_file()
            .sync_all()
            .map_err(|e| self.io_error(e))?;
        incoming
            .persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        Ok(())
    }
}

/// In-process index backend.
///
/// Keeps the last saved snapshot in memory. [`MemoryIndexStore::fail_saves`] makes every
/// subsequent save fail, which is how callers exercise the "bytes written, index not saved"
/// path.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    records: Mutex<Vec<StoredFile>>,
    fail_saves: AtomicBool,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Returns the last successfully saved snapshot.
    pub fn snapshot(&self) -> Vec<StoredFile> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl IndexStore for MemoryIndexStore {
    fn load(&self) -> PersistResult<Vec<StoredFile>> {
        Ok(self.snapshot())
    }

    fn save(&self, records: &[StoredFile]) -> PersistResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistError::Io {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::new(ErrorKind::Other, "save disabled"),
            });
        }

        *self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = records.to_vec();
        Ok(())
    }
}
