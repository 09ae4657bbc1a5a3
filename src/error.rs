//! Error types for slotdb
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using DbError
pub type Result<T> = std::result::Result<T, DbError>;

/// Unified error type for slotdb operations
#[derive(Debug, Error)]
pub enum DbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("Duplicate key: id {0} already exists")]
    DuplicateKey(i32),

    #[error("Record not found: id {0}")]
    NotFound(i32),

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value {value:?} for field {field}")]
    InvalidValue { field: String, value: String },

    // -------------------------------------------------------------------------
    // On-disk Format Errors
    // -------------------------------------------------------------------------
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot file missing: {}", .0.display())]
    SnapshotMissing(PathBuf),

    #[error("Snapshot corrupt: {0}")]
    SnapshotCorrupt(String),

    #[error("Invalid snapshot name: {0:?}")]
    InvalidSnapshotName(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
