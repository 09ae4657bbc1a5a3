//! Index Module
//!
//! In-memory indexes mirrored to disk after every mutation.
//!
//! ## Responsibilities
//! - Primary index: unique id → slot offset
//! - Secondary value indexes: hash(value) → slot offsets, one per field
//! - Full rewrite on every mutation (temp file + rename)
//! - Missing index file loads as an empty index
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────┐
//! │ Pair 1                       │
//! │ ┌──────────┬───────────────┐ │
//! │ │ Key (4)  │  Offset (8)   │ │
//! │ └──────────┴───────────────┘ │
//! ├──────────────────────────────┤
//! │ Pair 2 ...                   │
//! └──────────────────────────────┘
//! ```
//! Key is the record id (primary) or the value hash (secondary). Both are
//! big-endian `i32`; offsets are big-endian `i64`. A secondary index file
//! may repeat a key.

mod file;
mod primary;
mod secondary;

pub use primary::PrimaryIndex;
pub use secondary::ValueIndex;

pub(crate) use file::{sync_dir, temp_path};

/// Size of one persisted (key, offset) pair
pub const PAIR_SIZE: usize = 4 + 8;

// =============================================================================
// Key Functions
// =============================================================================

/// Stable string hash: 31-polynomial over UTF-16 code units, wrapping.
///
/// Distinct names can share a key ("Aa" and "BB" do), so lookups always
/// re-check the stored value.
pub fn name_key(name: &str) -> i32 {
    name.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

/// GPA quantized to hundredths
pub fn gpa_key(gpa: f64) -> i32 {
    (gpa * 100.0).round() as i32
}

pub fn year_key(year: i32) -> i32 {
    year
}
