//! Record codec
//!
//! Encoding and decoding of fixed-size record slots.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{DbError, Result};

use super::{truncate_name, Record, NAME_WIDTH, RECORD_SIZE};

/// Padding byte for the name field
const NAME_PAD: u8 = b' ';

/// Whether a slot still holds a live record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    Deleted = 0x00,
    Live = 0x01,
}

impl SlotState {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(SlotState::Deleted),
            0x01 => Ok(SlotState::Live),
            other => Err(DbError::MalformedRecord(format!(
                "Unknown slot state byte: {:#04x}",
                other
            ))),
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a record into a live slot of exactly `RECORD_SIZE` bytes
///
/// Names longer than `NAME_WIDTH` bytes are cut on a char boundary.
pub fn encode(record: &Record) -> Bytes {
    let mut buf = BytesMut::with_capacity(RECORD_SIZE);

    buf.put_u8(SlotState::Live as u8);
    buf.put_i32(record.id);

    let name = truncate_name(&record.name).as_bytes();
    buf.put_slice(name);
    buf.put_bytes(NAME_PAD, NAME_WIDTH - name.len());

    buf.put_f64(record.gpa);
    buf.put_i32(record.year);

    debug_assert_eq!(buf.len(), RECORD_SIZE);
    buf.freeze()
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a record, ignoring the slot state
pub fn decode(bytes: &[u8]) -> Result<Record> {
    decode_slot(bytes).map(|(_, record)| record)
}

/// Decode a slot into its state and record
///
/// Fails with `MalformedRecord` if fewer than `RECORD_SIZE` bytes are given.
pub fn decode_slot(bytes: &[u8]) -> Result<(SlotState, Record)> {
    if bytes.len() < RECORD_SIZE {
        return Err(DbError::MalformedRecord(format!(
            "Incomplete slot: expected {} bytes, got {}",
            RECORD_SIZE,
            bytes.len()
        )));
    }

    let mut buf = &bytes[..RECORD_SIZE];

    let state = SlotState::from_byte(buf.get_u8())?;
    let id = buf.get_i32();

    let name_bytes = &buf[..NAME_WIDTH];
    let name = std::str::from_utf8(name_bytes)
        .map_err(|e| DbError::MalformedRecord(format!("Name of id {} is not UTF-8: {}", id, e)))?
        .trim()
        .to_string();
    buf.advance(NAME_WIDTH);

    let gpa = buf.get_f64();
    let year = buf.get_i32();

    Ok((state, Record { id, name, gpa, year }))
}
