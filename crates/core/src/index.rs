//! The locker index: owner-scoped file metadata brokered over a blob store.
//!
//! [`LockerIndex`] is the only component that decides physical names and the only one that
//! mutates the owner → files mapping. Every operation takes an owner id that the caller has
//! already authenticated.
//!
//! # Ordering guarantees
//!
//! - `store` writes bytes first and publishes the record second. A failed blob write leaves
//!   the index untouched, so a record is never visible without its bytes.
//! - `delete` unpublishes the record first, then removes the bytes, then persists.
//! - The index is persisted in full after every mutation. If that save fails the mutation
//!   still stands in memory and the failure is logged; the next successful save catches the
//!   file up. There is no rollback.
//!
//! # Concurrency
//!
//! Mutations for one owner are serialised by a per-owner mutex; different owners proceed in
//! parallel and only meet on the short write lock over the owner map and on the persist
//! lock. Reads take a snapshot under the read lock. Saves hold the persist lock while they
//! snapshot and write, so a later save always carries a state at least as new as an earlier
//! one and the file converges on the in-memory index.

use crate::error::{LockerError, LockerResult};
use crate::persistence::IndexStore;
use crate::stored_file::{physical_name_for, StoredFile};
use locker_files::{BlobStore, StorageError};
use locker_types::{LogicalName, Sha256Hash};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type OwnerFiles = BTreeMap<String, Vec<StoredFile>>;

/// Owner-scoped file index backed by a [`BlobStore`] and persisted through an [`IndexStore`].
pub struct LockerIndex<B, S> {
    blobs: B,
    store: S,
    owners: RwLock<OwnerFiles>,
    owner_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    persist_lock: Mutex<()>,
}

impl<B, S> LockerIndex<B, S> {
    fn read_owners(&self) -> RwLockReadGuard<'_, OwnerFiles> {
        self.owners.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_owners(&self) -> RwLockWriteGuard<'_, OwnerFiles> {
        self.owners.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B, S> std::fmt::Debug for LockerIndex<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockerIndex")
            .field("owners", &self.read_owners().len())
            .finish_non_exhaustive()
    }
}

impl<B: BlobStore, S: IndexStore> LockerIndex<B, S> {
    /// Opens the index: makes sure the blob root exists and loads the persisted records.
    ///
    /// # Errors
    ///
    /// - [`LockerError::StorageFailure`] if the blob root or the index cannot be accessed
    /// - [`LockerError::Corrupted`] if the persisted index cannot be parsed
    pub fn open(blobs: B, store: S) -> LockerResult<Self> {
        blobs.ensure_root().map_err(LockerError::StorageFailure)?;

        let records = store.load()?;
        let loaded = records.len();

        let mut owners = OwnerFiles::new();
        for record in records {
            let files = owners.entry(record.owner_id.clone()).or_default();
            // Later lines win, matching the last-write-wins contract of `store`
            match files
                .iter()
                .position(|f| f.logical_name == record.logical_name)
            {
                Some(pos) => files[pos] = record,
                None => files.push(record),
            }
        }

        tracing::info!(records = loaded, owners = owners.len(), "locker index loaded");

        Ok(Self {
            blobs,
            store,
            owners: RwLock::new(owners),
            owner_locks: Mutex::new(HashMap::new()),
            persist_lock: Mutex::new(()),
        })
    }

    /// Stores `bytes` as `logical_name` for `owner_id`.
    ///
    /// Storing a name the owner already has replaces the previous record and overwrites the
    /// previous bytes (last write wins). The replaced record keeps its position in
    /// [`Self::list`].
    ///
    /// # Errors
    ///
    /// - [`LockerError::InvalidName`] if `logical_name` is empty or not a plain file name
    /// - [`LockerError::StorageFailure`] if the bytes could not be written; the index is
    ///   unchanged in that case
    pub fn store(
        &self,
        owner_id: &str,
        logical_name: &str,
        bytes: &[u8],
    ) -> LockerResult<StoredFile> {
        let logical_name = LogicalName::new(logical_name)?;
        let physical_name = physical_name_for(owner_id, &logical_name);

        let owner_lock = self.owner_lock(owner_id);
        let _guard = owner_lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.blobs
            .put(&physical_name, bytes)
            .map_err(LockerError::StorageFailure)?;

        let record = StoredFile::new(owner_id, logical_name, physical_name, bytes);

        {
            let mut owners = self.write_owners();
            let files = owners.entry(owner_id.to_owned()).or_default();
            match files
                .iter()
                .position(|f| f.logical_name == record.logical_name)
            {
                Some(pos) => files[pos] = record.clone(),
                None => files.push(record.clone()),
            }
        }

        tracing::info!(
            owner = owner_id,
            name = %record.logical_name,
            size = record.size_bytes,
            "file stored"
        );
        self.persist_or_log("store");

        Ok(record)
    }

    /// Looks up the record for `logical_name`. Does not touch the bytes.
    ///
    /// # Errors
    ///
    /// - [`LockerError::InvalidName`] if `logical_name` is not a valid file name
    /// - [`LockerError::NotFound`] if the owner has no such file
    pub fn retrieve(&self, owner_id: &str, logical_name: &str) -> LockerResult<StoredFile> {
        let logical_name = LogicalName::new(logical_name)?;

        self.read_owners()
            .get(owner_id)
            .and_then(|files| files.iter().find(|f| f.logical_name == logical_name))
            .cloned()
            .ok_or_else(|| LockerError::not_found(owner_id, logical_name.as_str()))
    }

    /// Reads the stored bytes for `logical_name`.
    ///
    /// # Errors
    ///
    /// - [`LockerError::NotFound`] if the owner has no such file
    /// - [`LockerError::Corrupted`] if the index lists the file but its bytes are missing
    /// - [`LockerError::StorageFailure`] on any other read error
    pub fn read_bytes(&self, owner_id: &str, logical_name: &str) -> LockerResult<Vec<u8>> {
        let record = self.retrieve(owner_id, logical_name)?;
        self.read_record(&record)
    }

    /// Re-reads the bytes and compares them with the checksum recorded at ingestion.
    ///
    /// Returns `Ok(false)` when the content no longer matches.
    pub fn verify(&self, owner_id: &str, logical_name: &str) -> LockerResult<bool> {
        let record = self.retrieve(owner_id, logical_name)?;
        let bytes = self.read_record(&record)?;

        let matches = Sha256Hash::digest(&bytes) == record.checksum;
        if !matches {
            tracing::warn!(
                owner = owner_id,
                name = %record.logical_name,
                "stored bytes do not match recorded checksum"
            );
        }
        Ok(matches)
    }

    /// Lists the owner's files in the order they were first stored.
    ///
    /// An unknown owner has no files.
    pub fn list(&self, owner_id: &str) -> Vec<StoredFile> {
        self.read_owners()
            .get(owner_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Deletes `logical_name` and its bytes.
    ///
    /// The record is removed from the index before the bytes are removed, and the index is
    /// persisted whether or not the blob removal succeeded. A blob that is already gone is not
    /// an error.
    ///
    /// # Errors
    ///
    /// - [`LockerError::InvalidName`] if `logical_name` is not a valid file name
    /// - [`LockerError::NotFound`] if the owner has no such file
    /// - [`LockerError::StorageFailure`] if the blob could not be removed; the record is
    ///   already gone from the index at that point
    pub fn delete(&self, owner_id: &str, logical_name: &str) -> LockerResult<()> {
        let logical_name = LogicalName::new(logical_name)?;

        let owner_lock = self.owner_lock(owner_id);
        let guard = owner_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let result = self.delete_locked(owner_id, &logical_name);

        // Released while the guard is still held, so no other mutation can be mid-flight
        self.release_owner_lock(owner_id, &owner_lock);
        drop(guard);

        result
    }

    fn delete_locked(&self, owner_id: &str, logical_name: &LogicalName) -> LockerResult<()> {
        let record = {
            let mut owners = self.write_owners();
            let files = owners
                .get_mut(owner_id)
                .ok_or_else(|| LockerError::not_found(owner_id, logical_name.as_str()))?;
            let pos = files
                .iter()
                .position(|f| f.logical_name == *logical_name)
                .ok_or_else(|| LockerError::not_found(owner_id, logical_name.as_str()))?;
            let record = files.remove(pos);
            if files.is_empty() {
                owners.remove(owner_id);
            }
            record
        };

        let blob_result = self.blobs.delete(&record.physical_name);
        if let Ok(false) = blob_result {
            tracing::warn!(
                owner = owner_id,
                name = %record.logical_name,
                physical_name = %record.physical_name,
                "blob was already absent on delete"
            );
        }

        self.persist_or_log("delete");

        match blob_result {
            Ok(_) => {
                tracing::info!(owner = owner_id, name = %record.logical_name, "file deleted");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    owner = owner_id,
                    physical_name = %record.physical_name,
                    error = %e,
                    "record removed but blob could not be deleted"
                );
                Err(LockerError::StorageFailure(e))
            }
        }
    }

    /// Owners that currently have at least one file, sorted.
    pub fn owners(&self) -> Vec<String> {
        self.read_owners().keys().cloned().collect()
    }

    /// Total number of files across all owners.
    pub fn file_count(&self) -> usize {
        self.read_owners().values().map(Vec::len).sum()
    }

    fn read_record(&self, record: &StoredFile) -> LockerResult<Vec<u8>> {
        self.blobs
            .get(&record.physical_name)
            .map_err(|e| match e {
                StorageError::NotFound(physical) => LockerError::Corrupted(format!(
                    "{}/{} is indexed but its bytes are missing ({})",
                    record.owner_id, record.logical_name, physical
                )),
                other => LockerError::StorageFailure(other),
            })
    }

    /// Saves the full index. A failure is logged, never returned: by the time this runs the
    /// mutation has already happened in memory and on the blob store.
    fn persist_or_log(&self, operation: &str) {
        let _guard = self
            .persist_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let snapshot: Vec<StoredFile> = self
            .read_owners()
            .values()
            .flat_map(|files| files.iter().cloned())
            .collect();

        if let Err(e) = self.store.save(&snapshot) {
            tracing::error!(
                operation,
                error = %e,
                "failed to persist locker index; on-disk index is behind"
            );
        }
    }

    fn owner_lock(&self, owner_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .owner_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(owner_id.to_owned()).or_default())
    }

    /// Drops the owner's lock entry once the owner has no files and nobody else holds or
    /// waits on the lock. Clones are only handed out under the map lock, so a strong count of
    /// two (the map and `held`) means `held` is the only user.
    fn release_owner_lock(&self, owner_id: &str, held: &Arc<Mutex<()>>) {
        let mut locks = self
            .owner_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(held) == 2 && !self.read_owners().contains_key(owner_id) {
            locks.remove(owner_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{JsonLinesIndexStore, MemoryIndexStore};
    use locker_files::{FsBlobStore, StorageResult};
    use std::path::Path;
    use tempfile::TempDir;

    type FsIndex = LockerIndex<FsBlobStore, JsonLinesIndexStore>;

    fn open_fs(dir: &Path) -> FsIndex {
        LockerIndex::open(
            FsBlobStore::new(dir.join("secure_files")),
            JsonLinesIndexStore::new(dir.join("file_index.jsonl")),
        )
        .expect("index should open")
    }

    /// Blob store whose writes always fail
    struct FailingPuts(FsBlobStore);

    impl BlobStore for FailingPuts {
        fn ensure_root(&self) -> StorageResult<()> {
            self.0.ensure_root()
        }

        fn put(&self, physical_name: &str, _bytes: &[u8]) -> StorageResult<()> {
            Err(StorageError::IoFailure {
                path: self.0.root().join(physical_name),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }

        fn get(&self, physical_name: &str) -> StorageResult<Vec<u8>> {
            self.0.get(physical_name)
        }

        fn delete(&self, physical_name: &str) -> StorageResult<bool> {
            self.0.delete(physical_name)
        }
    }

    /// Blob store whose deletes always fail
    struct FailingDeletes(FsBlobStore);

    impl BlobStore for FailingDeletes {
        fn ensure_root(&self) -> StorageResult<()> {
            self.0.ensure_root()
        }

        fn put(&self, physical_name: &str, bytes: &[u8]) -> StorageResult<()> {
            self.0.put(physical_name, bytes)
        }

        fn get(&self, physical_name: &str) -> StorageResult<Vec<u8>> {
            self.0.get(physical_name)
        }

        fn delete(&self, physical_name: &str) -> StorageResult<bool> {
            Err(StorageError::IoFailure {
                path: self.0.root().join(physical_name),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    fn owner_lock_count<B, S>(index: &LockerIndex<B, S>) -> usize {
        index.owner_locks.lock().unwrap().len()
    }

    #[test]
    fn store_then_read_bytes() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        let record = index.store("alice", "notes.txt", b"hello").unwrap();

        assert_eq!(record.logical_name.as_str(), "notes.txt");
        assert_eq!(record.owner_id, "alice");
        assert_eq!(record.size_bytes, 5);
        assert_eq!(
            record.checksum.as_str(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(index.read_bytes("alice", "notes.txt").unwrap(), b"hello");
    }

    #[test]
    fn retrieve_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        assert!(matches!(
            index.retrieve("alice", "missing.txt"),
            Err(LockerError::NotFound { owner, name }) if owner == "alice" && name == "missing.txt"
        ));
    }

    #[test]
    fn restore_same_name_overwrites() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        let first = index.store("alice", "notes.txt", b"hello").unwrap();
        let second = index.store("alice", "notes.txt", b"world").unwrap();

        assert_eq!(first.physical_name, second.physical_name);
        assert_eq!(index.read_bytes("alice", "notes.txt").unwrap(), b"world");
        assert_eq!(index.list("alice"), vec![second]);
    }

    #[test]
    fn restore_keeps_list_position() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        index.store("alice", "a.txt", b"1").unwrap();
        index.store("alice", "b.txt", b"2").unwrap();
        index.store("alice", "a.txt", b"3").unwrap();

        let names: Vec<String> = index
            .list("alice")
            .into_iter()
            .map(|f| f.logical_name.to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn delete_removes_record_and_blob() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        let record = index.store("alice", "notes.txt", b"hello").unwrap();
        let blob_path = temp
            .path()
            .join("secure_files")
            .join(&record.physical_name);
        assert!(blob_path.is_file());

        index.delete("alice", "notes.txt").unwrap();

        assert!(matches!(
            index.read_bytes("alice", "notes.txt"),
            Err(LockerError::NotFound { .. })
        ));
        assert!(!blob_path.exists());
    }

    #[test]
    fn failed_put_leaves_nothing_visible() {
        let temp = TempDir::new().unwrap();
        let store = MemoryIndexStore::new();
        let index = LockerIndex::open(
            FailingPuts(FsBlobStore::new(temp.path().join("secure_files"))),
            store,
        )
        .unwrap();

        let result = index.store("alice", "notes.txt", b"hello");

        assert!(matches!(result, Err(LockerError::StorageFailure(_))));
        assert!(matches!(
            index.retrieve("alice", "notes.txt"),
            Err(LockerError::NotFound { .. })
        ));
        assert!(index.list("alice").is_empty());
        assert!(index.store.snapshot().is_empty());
    }

    #[test]
    fn checksum_matches_bytes_read_back() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        let samples: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"hello".to_vec(),
            (0..=255).collect(),
            vec![0u8; 64 * 1024],
        ];
        for (i, bytes) in samples.iter().enumerate() {
            let name = format!("sample-{i}.bin");
            let record = index.store("alice", &name, bytes).unwrap();
            let read_back = index.read_bytes("alice", &name).unwrap();

            assert_eq!(Sha256Hash::digest(&read_back), record.checksum);
            assert_eq!(record.size_bytes, read_back.len() as u64);
            assert!(index.verify("alice", &name).unwrap());
        }
    }

    #[test]
    fn second_delete_is_not_found() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        index.store("alice", "notes.txt", b"hello").unwrap();

        index.delete("alice", "notes.txt").unwrap();
        assert!(matches!(
            index.delete("alice", "notes.txt"),
            Err(LockerError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_tolerates_missing_blob() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        let record = index.store("alice", "notes.txt", b"hello").unwrap();
        std::fs::remove_file(temp.path().join("secure_files").join(&record.physical_name))
            .unwrap();

        index.delete("alice", "notes.txt").unwrap();
        assert!(index.list("alice").is_empty());
    }

    #[test]
    fn failed_blob_delete_still_removes_and_persists_record() {
        let temp = TempDir::new().unwrap();
        let index = LockerIndex::open(
            FailingDeletes(FsBlobStore::new(temp.path().join("secure_files"))),
            MemoryIndexStore::new(),
        )
        .unwrap();

        index.store("alice", "notes.txt", b"hello").unwrap();
        assert_eq!(index.store.snapshot().len(), 1);

        let result = index.delete("alice", "notes.txt");

        assert!(matches!(
            result,
            Err(LockerError::StorageFailure(StorageError::IoFailure { .. }))
        ));
        assert!(index.list("alice").is_empty());
        assert!(matches!(
            index.retrieve("alice", "notes.txt"),
            Err(LockerError::NotFound { .. })
        ));
        assert!(index.store.snapshot().is_empty());
    }

    #[test]
    fn delete_succeeds_when_index_save_fails() {
        let temp = TempDir::new().unwrap();
        let index = LockerIndex::open(
            FsBlobStore::new(temp.path().join("secure_files")),
            MemoryIndexStore::new(),
        )
        .unwrap();

        let record = index.store("alice", "notes.txt", b"hello").unwrap();
        let blob_path = temp
            .path()
            .join("secure_files")
            .join(&record.physical_name);

        index.store.fail_saves(true);
        index.delete("alice", "notes.txt").unwrap();

        assert!(index.list("alice").is_empty());
        assert!(!blob_path.exists());
        // The saved snapshot is behind until the next successful save
        assert_eq!(index.store.snapshot(), vec![record]);

        index.store.fail_saves(false);
        index.store("bob", "other.txt", b"x").unwrap();
        let saved = index.store.snapshot();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].owner_id, "bob");
    }

    #[test]
    fn owner_locks_are_released_when_owner_is_emptied() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        index.store("alice", "a.txt", b"a").unwrap();
        index.store("alice", "b.txt", b"b").unwrap();
        assert_eq!(owner_lock_count(&index), 1);

        index.delete("alice", "a.txt").unwrap();
        assert_eq!(owner_lock_count(&index), 1);

        index.delete("alice", "b.txt").unwrap();
        assert_eq!(owner_lock_count(&index), 0);

        assert!(matches!(
            index.delete("nobody", "a.txt"),
            Err(LockerError::NotFound { .. })
        ));
        assert_eq!(owner_lock_count(&index), 0);
    }

    #[test]
    fn owners_are_isolated() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        index.store("alice", "report.txt", b"alice's").unwrap();
        index.store("bob", "report.txt", b"bob's").unwrap();

        let alice = index.retrieve("alice", "report.txt").unwrap();
        let bob = index.retrieve("bob", "report.txt").unwrap();

        assert_ne!(alice, bob);
        assert_ne!(alice.physical_name, bob.physical_name);
        assert_eq!(index.read_bytes("alice", "report.txt").unwrap(), b"alice's");
        assert_eq!(index.read_bytes("bob", "report.txt").unwrap(), b"bob's");

        index.delete("bob", "report.txt").unwrap();
        assert!(index.retrieve("alice", "report.txt").is_ok());
    }

    #[test]
    fn list_returns_every_stored_name() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        for i in 0..25 {
            index
                .store("alice", &format!("file-{i}.txt"), format!("{i}").as_bytes())
                .unwrap();
        }

        let files = index.list("alice");
        assert_eq!(files.len(), 25);
        for file in &files {
            assert_eq!(
                &index.retrieve("alice", file.logical_name.as_str()).unwrap(),
                file
            );
        }
        assert!(index.list("nobody").is_empty());
    }

    #[test]
    fn invalid_names_are_rejected() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        for name in ["", "   ", "dir/file.txt", ".."] {
            assert!(
                matches!(
                    index.store("alice", name, b"x"),
                    Err(LockerError::InvalidName(_))
                ),
                "{name:?} should be rejected"
            );
        }
        assert_eq!(index.file_count(), 0);
    }

    #[test]
    fn missing_blob_reads_as_corrupted() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        let record = index.store("alice", "notes.txt", b"hello").unwrap();
        std::fs::remove_file(temp.path().join("secure_files").join(&record.physical_name))
            .unwrap();

        assert!(matches!(
            index.read_bytes("alice", "notes.txt"),
            Err(LockerError::Corrupted(_))
        ));
        // Metadata is still there; only the bytes are gone
        assert!(index.retrieve("alice", "notes.txt").is_ok());
    }

    #[test]
    fn verify_detects_tampered_bytes() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        let record = index.store("alice", "notes.txt", b"hello").unwrap();
        std::fs::write(
            temp.path().join("secure_files").join(&record.physical_name),
            b"HELLO",
        )
        .unwrap();

        assert!(!index.verify("alice", "notes.txt").unwrap());
    }

    #[test]
    fn reopen_restores_index() {
        let temp = TempDir::new().unwrap();

        let stored = {
            let index = open_fs(temp.path());
            index.store("alice", "a.txt", b"a").unwrap();
            index.store("bob", "b.txt", b"b").unwrap();
            index.store("alice", "c.txt", b"c").unwrap();
            index.delete("bob", "b.txt").unwrap();
            index.list("alice")
        };

        let reopened = open_fs(temp.path());
        assert_eq!(reopened.list("alice"), stored);
        assert!(reopened.list("bob").is_empty());
        assert_eq!(reopened.owners(), vec!["alice".to_string()]);
        assert_eq!(reopened.read_bytes("alice", "c.txt").unwrap(), b"c");
    }

    #[test]
    fn persist_failure_still_reports_success() {
        let temp = TempDir::new().unwrap();
        let index = LockerIndex::open(
            FsBlobStore::new(temp.path().join("secure_files")),
            MemoryIndexStore::new(),
        )
        .unwrap();

        index.store.fail_saves(true);
        let record = index.store("alice", "notes.txt", b"hello").unwrap();

        assert_eq!(index.retrieve("alice", "notes.txt").unwrap(), record);
        assert!(index.store.snapshot().is_empty());

        // The next successful save carries the earlier mutation too
        index.store.fail_saves(false);
        index.store("alice", "other.txt", b"x").unwrap();
        assert_eq!(index.store.snapshot().len(), 2);
    }

    #[test]
    fn open_rejects_corrupt_index() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("file_index.jsonl"), "garbage\n").unwrap();

        let result = LockerIndex::open(
            FsBlobStore::new(temp.path().join("secure_files")),
            JsonLinesIndexStore::new(temp.path().join("file_index.jsonl")),
        );
        assert!(matches!(result, Err(LockerError::Corrupted(_))));
    }

    #[test]
    fn concurrent_stores_are_all_persisted() {
        let temp = TempDir::new().unwrap();
        let index = open_fs(temp.path());

        std::thread::scope(|scope| {
            for owner in ["alice", "bob", "carol"] {
                for worker in 0..4 {
                    let index = &index;
                    scope.spawn(move || {
                        for i in 0..10 {
                            let name = format!("w{worker}-{i}.txt");
                            index.store(owner, &name, name.as_bytes()).unwrap();
                        }
                    });
                }
            }
        });

        assert_eq!(index.file_count(), 3 * 4 * 10);
        for owner in ["alice", "bob", "carol"] {
            assert_eq!(index.list(owner).len(), 40);
        }

        let reopened = open_fs(temp.path());
        assert_eq!(reopened.file_count(), 120);
        assert_eq!(reopened.list("bob"), index.list("bob"));
    }
}
