//! # slotdb
//!
//! A single-process, file-backed record store with:
//! - Fixed-width record slots addressed purely by byte offset
//! - A primary index (id → offset) and one hash index per searchable field
//! - Tombstoned deletes (slots are never reclaimed)
//! - Checksummed snapshots for backup and restore
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Engine                                │
//! │        (sole owner of the data file and every index)         │
//! └───────┬──────────────────┬──────────────────────┬───────────┘
//!         │                  │                      │
//!         ▼                  ▼                      ▼
//!   ┌───────────┐    ┌──────────────┐     ┌──────────────────┐
//!   │ DataFile  │    │ PrimaryIndex │     │   ValueIndex ×3  │
//!   │  (slots)  │    │ (id→offset)  │     │ (hash→offsets)   │
//!   └─────┬─────┘    └──────────────┘     └──────────────────┘
//!         │
//!         ▼
//!   ┌───────────┐                         ┌──────────────────┐
//!   │  Record   │                         │    Snapshot      │
//!   │  (codec)  │                         │ (backup/restore) │
//!   └───────────┘                         └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod index;
pub mod storage;
pub mod snapshot;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DbError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::{Engine, Stats};
pub use record::{Field, FieldValue, Record};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of slotdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
