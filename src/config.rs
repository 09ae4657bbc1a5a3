//! Configuration for slotdb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a slotdb instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the live file set and every snapshot.
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {name}.dat          (record slots)
    ///     ├── {name}.idx          (primary index)
    ///     ├── {name}_name.idx     (secondary indexes, one per field)
    ///     ├── {name}_gpa.idx
    ///     ├── {name}_year.idx
    ///     └── {snapshot}.*        (backup copies + manifest)
    pub data_dir: PathBuf,

    /// Database name, used as the file prefix for the live file set
    pub name: String,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// When to fsync the data file and index files
    pub sync_strategy: SyncStrategy,
}

/// Sync strategy for data and index writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync the data file after every write and every index file before rename
    EveryWrite,

    /// Leave syncing to the OS until close, backup or restore
    OnClose,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./slotdb_data"),
            name: "students".to_string(),
            sync_strategy: SyncStrategy::EveryWrite,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the database name (file prefix)
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
