//! Flat File Store
//!
//! One file per key under a root directory. Writers stage bytes in a private
//! `.tmp` directory and publish them with a hard link, which fails when the
//! key already exists; that makes insert a test-and-set. Conditional removal
//! moves the file aside to a tombstone first, so it only ever deletes the
//! exact record it inspected.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, StoreError};

const STAGING_DIR: &str = ".tmp";

// == File Store ==
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    ///
    /// Safe to call against an existing store. Stale staging files left by a
    /// crashed writer are removed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(STAGING_DIR)).map_err(|e| {
            StoreError::Configuration(format!(
                "cannot create store directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let store = Self { root };
        let orphans = store.clean_staging()?;
        if orphans > 0 {
            warn!("Removed {} orphaned staging files", orphans);
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn staging_path(&self, tag: &str) -> PathBuf {
        self.root
            .join(STAGING_DIR)
            .join(format!("{}.{}", tag, Uuid::new_v4().simple()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path(key).is_file()
    }

    /// Reads the bytes stored under `key`, if any.
    pub fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // == Insert If Absent ==
    /// Stores `bytes` under `key` unless the key already exists.
    ///
    /// Returns `false` (and writes nothing) when another record is present,
    /// including one published concurrently by another writer.
    pub fn insert_new(&self, key: &str, bytes: &[u8]) -> Result<bool> {
        let staged = self.staging_path("put");
        let outcome = self.stage(&staged, bytes).and_then(|_| {
            match fs::hard_link(&staged, self.path(key)) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(e.into()),
            }
        });
        let _ = fs::remove_file(&staged);
        outcome
    }

    fn stage(&self, staged: &Path, bytes: &[u8]) -> Result<()> {
        let mut file = fs::File::create(staged)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    }

    // == Conditional Remove ==
    /// Removes the record under `key` only if `matches` accepts its bytes.
    ///
    /// The record is first moved to a tombstone; when it turns out to be a
    /// different record than expected it is linked back, unless a new record
    /// has been published in the meantime.
    pub fn remove_if<F>(&self, key: &str, matches: F) -> Result<bool>
    where
        F: FnOnce(&[u8]) -> bool,
    {
        let tombstone = self.staging_path("del");
        match fs::rename(self.path(key), &tombstone) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        let bytes = fs::read(&tombstone)?;
        if matches(&bytes) {
            fs::remove_file(&tombstone)?;
            return Ok(true);
        }

        match fs::hard_link(&tombstone, self.path(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} was republished while being inspected", key);
            }
            Err(e) => {
                let _ = fs::remove_file(&tombstone);
                return Err(e.into());
            }
        }
        fs::remove_file(&tombstone)?;
        Ok(false)
    }

    /// Removes the record under `key` whatever it holds.
    pub fn remove(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // == Key Listing ==
    /// Every stored key, in no particular order.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    keys.push(name.to_string());
                }
            }
        }
        Ok(keys)
    }

    /// Every stored key starting with `prefix`.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    fn clean_staging(&self) -> Result<usize> {
        let mut cleaned = 0;
        for entry in fs::read_dir(self.root.join(STAGING_DIR))? {
            let entry = entry?;
            if fs::remove_file(entry.path()).is_ok() {
                cleaned += 1;
            }
        }
        Ok(cleaned)
    }
}
