//! Primary Index
//!
//! Unique id → slot offset, kept sorted by id.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{DbError, Result};

use super::file::{read_pairs, remove_file, write_pairs};

/// Exact-match index from record id to data file offset
///
/// Every mutating call rewrites the whole file before returning, so the
/// on-disk copy is never more than one call behind.
pub struct PrimaryIndex {
    /// Persisted index file
    path: PathBuf,

    /// id → offset
    entries: BTreeMap<i32, u64>,

    sync: SyncStrategy,
}

impl PrimaryIndex {
    /// Load an index from disk (missing file = empty index)
    pub fn load(path: &Path, sync: SyncStrategy) -> Result<Self> {
        let mut entries = BTreeMap::new();

        for (id, offset) in read_pairs(path)? {
            if entries.insert(id, offset).is_some() {
                return Err(DbError::CorruptIndex(format!(
                    "{}: id {} appears more than once",
                    path.display(),
                    id
                )));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            sync,
        })
    }

    /// Offset of the record with this id
    pub fn find(&self, id: i32) -> Result<u64> {
        self.entries.get(&id).copied().ok_or(DbError::NotFound(id))
    }

    pub fn contains(&self, id: i32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Insert a new id; never overwrites an existing one
    ///
    /// If the file cannot be rewritten the entry is dropped again, so memory
    /// never runs ahead of disk.
    pub fn insert(&mut self, id: i32, offset: u64) -> Result<()> {
        if self.entries.contains_key(&id) {
            return Err(DbError::DuplicateKey(id));
        }
        self.entries.insert(id, offset);
        if let Err(e) = self.persist() {
            self.entries.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    /// Remove an id, returning whether it was present
    ///
    /// Absent ids leave the file untouched. A failed rewrite puts the entry
    /// back.
    pub fn remove(&mut self, id: i32) -> Result<bool> {
        let Some(offset) = self.entries.remove(&id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist() {
            self.entries.insert(id, offset);
            return Err(e);
        }
        Ok(true)
    }

    /// Swap in a whole new set of entries with a single rewrite
    ///
    /// Keeps the old entries if the rewrite fails.
    pub fn replace(&mut self, entries: BTreeMap<i32, u64>) -> Result<()> {
        let old = std::mem::replace(&mut self.entries, entries);
        if let Err(e) = self.persist() {
            self.entries = old;
            return Err(e);
        }
        Ok(())
    }

    /// Rewrite the index file from memory
    pub fn persist(&self) -> Result<()> {
        self.write(self.sync)
    }

    /// Rewrite and fsync the index file, whatever the sync strategy
    pub fn flush(&self) -> Result<()> {
        self.write(SyncStrategy::EveryWrite)
    }

    fn write(&self, sync: SyncStrategy) -> Result<()> {
        write_pairs(
            &self.path,
            self.entries.iter().map(|(&id, &offset)| (id, offset)),
            sync,
        )
    }

    /// Drop every entry and delete the index file
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        remove_file(&self.path)
    }

    /// (id, offset) pairs in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (i32, u64)> + '_ {
        self.entries.iter().map(|(&id, &offset)| (id, offset))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
