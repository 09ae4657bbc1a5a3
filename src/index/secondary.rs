//! Secondary Value Index
//!
//! hash(value) → offsets. A bucket holds every record sharing the value and
//! every record whose value merely collides, so callers must re-read and
//! compare before trusting a hit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::Result;

use super::file::{read_pairs, remove_file, write_pairs};

/// Hash-bucket index over one record attribute
pub struct ValueIndex {
    /// Persisted index file
    path: PathBuf,

    /// hash → offsets, in insertion order within a bucket
    buckets: BTreeMap<i32, Vec<u64>>,

    sync: SyncStrategy,
}

impl ValueIndex {
    /// Load an index from disk (missing file = empty index)
    pub fn load(path: &Path, sync: SyncStrategy) -> Result<Self> {
        let mut buckets: BTreeMap<i32, Vec<u64>> = BTreeMap::new();
        for (hash, offset) in read_pairs(path)? {
            buckets.entry(hash).or_default().push(offset);
        }

        Ok(Self {
            path: path.to_path_buf(),
            buckets,
            sync,
        })
    }

    /// Append an offset to the bucket for `hash`
    ///
    /// Undone in memory if the file cannot be rewritten.
    pub fn add_entry(&mut self, hash: i32, offset: u64) -> Result<()> {
        self.buckets.entry(hash).or_default().push(offset);
        if let Err(e) = self.persist() {
            if let Some(bucket) = self.buckets.get_mut(&hash) {
                bucket.pop();
                if bucket.is_empty() {
                    self.buckets.remove(&hash);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Remove one occurrence of `offset` from the bucket for `hash`
    ///
    /// Empty buckets are dropped. Returns whether anything was removed; a
    /// miss leaves the file untouched.
    pub fn remove_entry(&mut self, hash: i32, offset: u64) -> Result<bool> {
        let Some(bucket) = self.buckets.get_mut(&hash) else {
            return Ok(false);
        };
        let Some(pos) = bucket.iter().position(|&o| o == offset) else {
            return Ok(false);
        };

        bucket.remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&hash);
        }

        if let Err(e) = self.persist() {
            self.buckets.entry(hash).or_default().insert(pos, offset);
            return Err(e);
        }
        Ok(true)
    }

    /// Candidate offsets for `hash` (may include collisions)
    pub fn lookup(&self, hash: i32) -> &[u64] {
        self.buckets.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Swap in a whole new set of (hash, offset) entries with a single rewrite
    ///
    /// Keeps the old buckets if the rewrite fails.
    pub fn replace<I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (i32, u64)>,
    {
        let mut buckets: BTreeMap<i32, Vec<u64>> = BTreeMap::new();
        for (hash, offset) in pairs {
            buckets.entry(hash).or_default().push(offset);
        }

        let old = std::mem::replace(&mut self.buckets, buckets);
        if let Err(e) = self.persist() {
            self.buckets = old;
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
        let pairs = self
            .buckets
            .iter()
            .flat_map(|(&hash, offsets)| offsets.iter().map(move |&offset| (hash, offset)));
        write_pairs(&self.path, pairs, sync)
    }

    /// Drop every entry and delete the index file
    pub fn clear(&mut self) -> Result<()> {
        self.buckets.clear();
        remove_file(&self.path)
    }

    /// Total number of (hash, offset) entries
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
