//! Slot Iterator
//!
//! Sequential iteration over every slot in the data file.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::error::{DbError, Result};
use crate::record::{decode_slot, Record, SlotState, RECORD_SIZE};

/// Iterator over data file slots in file order
///
/// Yields deleted slots too; callers filter on the state.
pub struct SlotIterator<'a> {
    reader: BufReader<&'a mut File>,
    /// Stop reading at this offset (file length when the scan began)
    end_offset: u64,
    /// Offset of the next slot
    current_offset: u64,
}

impl<'a> SlotIterator<'a> {
    pub(super) fn new(file: &'a mut File, end_offset: u64) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        Ok(Self {
            reader: BufReader::new(file),
            end_offset,
            current_offset: 0,
        })
    }

    /// Only the live slots
    pub fn live(self) -> impl Iterator<Item = Result<(u64, Record)>> + 'a {
        self.filter_map(|item| match item {
            Ok((offset, SlotState::Live, record)) => Some(Ok((offset, record))),
            Ok((_, SlotState::Deleted, _)) => None,
            Err(e) => Some(Err(e)),
        })
    }
}

impl<'a> Iterator for SlotIterator<'a> {
    /// (offset, state, record)
    type Item = Result<(u64, SlotState, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_offset >= self.end_offset {
            return None;
        }

        let offset = self.current_offset;
        let mut slot = [0u8; RECORD_SIZE];
        if let Err(e) = self.reader.read_exact(&mut slot) {
            // Stop after the first failure
            self.current_offset = self.end_offset;
            return Some(Err(DbError::Io(e)));
        }
        self.current_offset += RECORD_SIZE as u64;

        match decode_slot(&slot) {
            Ok((state, record)) => Some(Ok((offset, state, record))),
            Err(e) => {
                self.current_offset = self.end_offset;
                Some(Err(e))
            }
        }
    }
}
