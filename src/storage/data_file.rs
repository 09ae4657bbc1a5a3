//! Data File
//!
//! Random-access reads and writes of fixed-size record slots.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{DbError, Result};
use crate::record::{decode_slot, encode, Record, SlotState, RECORD_SIZE};

use super::iterator::SlotIterator;

const SLOT: u64 = RECORD_SIZE as u64;

/// Owner of the data file handle
pub struct DataFile {
    path: PathBuf,
    file: File,
    /// Current file length in bytes (always a multiple of `RECORD_SIZE`)
    len: u64,
    sync: SyncStrategy,
}

impl DataFile {
    /// Open or create a data file
    ///
    /// A torn trailing slot (from an append interrupted mid-write) is cut
    /// off. No index can point at it, since indexes are updated after the
    /// slot is written.
    pub fn open(path: &Path, sync: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut len = file.metadata()?.len();
        let torn = len % SLOT;
        if torn != 0 {
            tracing::warn!(
                "Data file {} ends with a partial slot ({} bytes), truncating",
                path.display(),
                torn
            );
            len -= torn;
            file.set_len(len)?;
            file.sync_all()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
            sync,
        })
    }

    /// Append a record at end of file, returning its offset
    pub fn append(&mut self, record: &Record) -> Result<u64> {
        let offset = self.len;
        self.write_at(offset, &encode(record))?;
        self.len += SLOT;
        Ok(offset)
    }

    /// Read the slot at `offset`
    ///
    /// `MalformedRecord` if the slot runs past end of file.
    pub fn read(&mut self, offset: u64) -> Result<(SlotState, Record)> {
        let available = self.len.saturating_sub(offset).min(SLOT) as usize;
        let mut buf = vec![0u8; available];

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf)?;

        decode_slot(&buf).map_err(|e| match e {
            DbError::MalformedRecord(msg) => {
                DbError::MalformedRecord(format!("offset {}: {}", offset, msg))
            }
            other => other,
        })
    }

    /// Overwrite the slot at `offset` in place
    pub fn overwrite(&mut self, offset: u64, record: &Record) -> Result<()> {
        self.check_slot(offset)?;
        self.write_at(offset, &encode(record))
    }

    /// Flip the state byte of a slot to deleted, leaving the rest as is
    pub fn mark_deleted(&mut self, offset: u64) -> Result<()> {
        self.check_slot(offset)?;
        self.write_at(offset, &[SlotState::Deleted as u8])
    }

    /// Iterate over every slot from offset 0, live or not
    pub fn scan(&mut self) -> Result<SlotIterator<'_>> {
        SlotIterator::new(&mut self.file, self.len)
    }

    /// Drop every slot
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.len = 0;
        if self.sync == SyncStrategy::EveryWrite {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Force data to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// File length in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, live and deleted
    pub fn slot_count(&self) -> u64 {
        self.len / SLOT
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)?;
        if self.sync == SyncStrategy::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Offset must start a whole slot inside the file
    fn check_slot(&self, offset: u64) -> Result<()> {
        if offset % SLOT != 0 || offset + SLOT > self.len {
            return Err(DbError::MalformedRecord(format!(
                "offset {} is not a slot in a {} byte data file",
                offset, self.len
            )));
        }
        Ok(())
    }
}
