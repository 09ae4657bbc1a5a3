//! Storage Module
//!
//! The data file of fixed-size record slots, and the names of every file
//! that makes up a database.
//!
//! ## Responsibilities
//! - Append, read, overwrite and tombstone slots by byte offset
//! - Sequential slot scans for full-table reads
//! - Drop a torn trailing slot left by an interrupted append
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Slot 0   (offset 0)                    │
//! ├────────────────────────────────────────┤
//! │ Slot 1   (offset RECORD_SIZE)          │
//! ├────────────────────────────────────────┤
//! │ ...                                    │
//! └────────────────────────────────────────┘
//! ```
//! No header, no record count, no free list. Deleted slots keep their bytes
//! and only flip the state byte.

mod data_file;
mod iterator;
mod layout;

pub use data_file::DataFile;
pub use iterator::SlotIterator;
pub use layout::{FileRole, FileSet};
