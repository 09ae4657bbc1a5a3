//! Engine Module
//!
//! The storage engine that keeps the data file and every index consistent.
//!
//! ## Responsibilities
//! - Route every mutation through one owner of the data file and indexes
//! - Check the primary index before writing so failed adds leave no trace
//! - Verify secondary index hits against the stored record
//! - Backup/restore of the whole file set
//! - Rebuild indexes from the data file as a repair tool

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{DbError, Result};
use crate::index::{PrimaryIndex, ValueIndex};
use crate::record::{Field, FieldValue, Record, SlotState};
use crate::snapshot::{self, Manifest};
use crate::storage::{DataFile, FileSet};

/// The main storage engine
///
/// ## Ownership Model
///
/// The engine is the only holder of the data file handle and the in-memory
/// indexes. Every operation takes `&mut self` and runs to completion, so no
/// caller ever observes a half-applied mutation within the process.
///
/// ## Write Ordering
///
/// - add: slot appended → primary entry → secondary entries
/// - delete: slot tombstoned → primary entry removed → secondary entries removed
///
/// A crash between steps leaves at worst an unindexed live slot or an index
/// entry pointing at a tombstone. Secondary lookups already skip the latter;
/// `rebuild_indexes` repairs both.
///
/// An I/O error part way through an add or update undoes the steps already
/// taken before it is returned.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Paths of the live file set
    files: FileSet,

    /// Fixed-size record slots
    data: DataFile,

    /// id → offset
    primary: PrimaryIndex,

    /// Secondary indexes, in `Field::ALL` order
    secondary: [ValueIndex; 3],
}

/// Point-in-time counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Records reachable through the primary index
    pub live_records: usize,
    /// Slots in the data file, live and deleted
    pub total_slots: u64,
    /// Deleted slots still occupying space
    pub orphan_slots: u64,
    /// Data file size in bytes
    pub data_bytes: u64,
}

impl Engine {
    /// Open or create a database with the given config
    ///
    /// On startup:
    /// 1. Validate the database name
    /// 2. Create the data directory if needed
    /// 3. Open the data file (cutting a torn trailing slot)
    /// 4. Load every index (missing files load empty)
    pub fn open(config: Config) -> Result<Self> {
        if config.name.is_empty() || config.name.contains(['/', '\\']) {
            return Err(DbError::Config(format!(
                "Invalid database name: {:?}",
                config.name
            )));
        }

        fs::create_dir_all(&config.data_dir)?;

        let files = FileSet::new(&config.data_dir, &config.name);
        let sync = config.sync_strategy;

        let data = DataFile::open(&files.data(), sync)?;
        let primary = PrimaryIndex::load(&files.primary(), sync)?;
        let secondary = [
            ValueIndex::load(&files.secondary(Field::Name), sync)?,
            ValueIndex::load(&files.secondary(Field::Gpa), sync)?,
            ValueIndex::load(&files.secondary(Field::Year), sync)?,
        ];

        tracing::info!(
            "Opened database {:?} in {}: {} records, {} slots",
            config.name,
            config.data_dir.display(),
            primary.len(),
            data.slot_count()
        );

        Ok(Self {
            config,
            files,
            data,
            primary,
            secondary,
        })
    }

    /// Open with a directory and database name (convenience method)
    ///
    /// Uses default config otherwise
    pub fn open_path(path: &Path, name: &str) -> Result<Self> {
        let config = Config::builder().data_dir(path).name(name).build();
        Self::open(config)
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Add a new record, returning its slot offset
    ///
    /// Fails with `DuplicateKey` before anything is written if the id exists.
    pub fn add(&mut self, record: &Record) -> Result<u64> {
        if self.primary.contains(record.id) {
            return Err(DbError::DuplicateKey(record.id));
        }

        let record = record.normalized();
        let offset = self.data.append(&record)?;

        if let Err(e) = self.index_slot(&record, offset) {
            if let Err(undo) = self.data.mark_deleted(offset) {
                tracing::error!("Could not tombstone unindexed slot {}: {}", offset, undo);
            }
            return Err(e);
        }

        tracing::debug!("Added id {} at offset {}", record.id, offset);
        Ok(offset)
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Look up one record by id
    pub fn find_by_id(&mut self, id: i32) -> Result<Record> {
        let offset = self.primary.find(id)?;
        self.read_live(offset)
    }

    /// Search by field name and raw value, e.g. `("gpa", "3.5")`
    pub fn find_by_attribute(&mut self, field: &str, value: &str) -> Result<Vec<Record>> {
        let value = FieldValue::parse(field, value)?;
        self.find_by(&value)
    }

    /// Search through the secondary index for `value`
    ///
    /// Every candidate is re-read and compared, so hash collisions never
    /// reach the caller.
    pub fn find_by(&mut self, value: &FieldValue) -> Result<Vec<Record>> {
        let candidates = self.index(value.field()).lookup(value.index_key()).to_vec();

        let mut found = Vec::new();
        for offset in candidates {
            let (state, record) = self.data.read(offset)?;
            if state == SlotState::Live && value.matches(&record) {
                found.push(record);
            }
        }

        tracing::debug!("Search {} matched {} records", value, found.len());
        Ok(found)
    }

    /// Every live record, in data file order
    pub fn get_all(&mut self) -> Result<Vec<Record>> {
        self.data
            .scan()?
            .live()
            .map(|item| item.map(|(_, record)| record))
            .collect()
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Replace the record with the same id, in place
    ///
    /// Only secondary entries whose key changed are moved.
    pub fn update(&mut self, record: &Record) -> Result<()> {
        let offset = self.primary.find(record.id)?;
        let old = self.read_live(offset)?;
        let record = record.normalized();

        let moves: Vec<(Field, i32, i32)> = Field::ALL
            .into_iter()
            .map(|field| {
                let from = old.value_of(field).index_key();
                let to = record.value_of(field).index_key();
                (field, from, to)
            })
            .filter(|&(_, from, to)| from != to)
            .collect();

        self.move_entries(offset, &moves)?;
        if let Err(e) = self.data.overwrite(offset, &record) {
            let back: Vec<_> = moves.iter().map(|&(field, from, to)| (field, to, from)).collect();
            if let Err(undo) = self.move_entries(offset, &back) {
                tracing::error!("Could not restore index entries for id {}: {}", record.id, undo);
            }
            return Err(e);
        }

        tracing::debug!("Updated id {} at offset {}", record.id, offset);
        Ok(())
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete one record by id, returning what was removed
    ///
    /// The slot is tombstoned, not reclaimed.
    pub fn delete_by_id(&mut self, id: i32) -> Result<Record> {
        let offset = self.primary.find(id)?;
        let record = self.read_live(offset)?;

        self.data.mark_deleted(offset)?;
        self.primary.remove(id)?;
        for field in Field::ALL {
            let key = record.value_of(field).index_key();
            self.index_mut(field).remove_entry(key, offset)?;
        }

        tracing::debug!("Deleted id {} at offset {}", id, offset);
        Ok(record)
    }

    /// Delete by field name and raw value, returning how many were removed
    pub fn delete_by_attribute(&mut self, field: &str, value: &str) -> Result<usize> {
        let value = FieldValue::parse(field, value)?;
        self.delete_by(&value)
    }

    /// Delete every live record matching `value`
    ///
    /// Collects ids with a full scan first, then deletes, so the scan never
    /// sees its own deletions.
    pub fn delete_by(&mut self, value: &FieldValue) -> Result<usize> {
        let mut ids = Vec::new();
        for item in self.data.scan()?.live() {
            let (_, record) = item?;
            if value.matches(&record) {
                ids.push(record.id);
            }
        }

        let mut deleted = 0;
        for id in ids {
            match self.delete_by_id(id) {
                Ok(_) => deleted += 1,
                // A live slot the primary index no longer points at
                Err(DbError::NotFound(_)) => {
                    tracing::warn!("Live slot for id {} has no primary entry", id)
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!("Delete by {} removed {} records", value, deleted);
        Ok(deleted)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Drop every record and every index file
    pub fn clear(&mut self) -> Result<()> {
        self.data.truncate()?;
        self.primary.clear()?;
        for index in self.secondary.iter_mut() {
            index.clear()?;
        }

        tracing::info!("Cleared database {:?}", self.config.name);
        Ok(())
    }

    /// Rebuild every index from the live slots of the data file
    ///
    /// Repair tool for lost or damaged index files. If two live slots share
    /// an id, the first one wins and the later slot is tombstoned. Each index
    /// file is written once, empty indexes included.
    pub fn rebuild_indexes(&mut self) -> Result<usize> {
        let live: Vec<(u64, Record)> = self.data.scan()?.live().collect::<Result<_>>()?;

        let mut primary: BTreeMap<i32, u64> = BTreeMap::new();
        let mut secondary: [Vec<(i32, u64)>; 3] = Default::default();
        for (offset, record) in live {
            if primary.contains_key(&record.id) {
                tracing::warn!(
                    "Duplicate live id {} at offset {}, tombstoning",
                    record.id,
                    offset
                );
                self.data.mark_deleted(offset)?;
                continue;
            }

            primary.insert(record.id, offset);
            for field in Field::ALL {
                let key = record.value_of(field).index_key();
                secondary[Self::slot(field)].push((key, offset));
            }
        }

        let indexed = primary.len();
        self.primary.replace(primary)?;
        for field in Field::ALL {
            let pairs = std::mem::take(&mut secondary[Self::slot(field)]);
            self.index_mut(field).replace(pairs)?;
        }

        tracing::info!("Rebuilt indexes for {} records", indexed);
        Ok(indexed)
    }

    // =========================================================================
    // Backup / Restore
    // =========================================================================

    /// Copy the live file set to a snapshot named `name`
    ///
    /// Overwrites any existing snapshot with that name.
    pub fn backup(&mut self, name: &str) -> Result<Manifest> {
        snapshot::validate_name(name, &self.files)?;
        let target = FileSet::new(self.files.dir(), name);

        self.data.sync()?;
        let manifest = snapshot::backup(&self.files, &target)?;

        tracing::info!("Backed up database {:?} to snapshot {:?}", self.config.name, name);
        Ok(manifest)
    }

    /// Replace the live file set with the snapshot named `name` and reopen
    ///
    /// The snapshot is verified in full first; a missing or altered file
    /// fails the restore without touching live files. Whatever happens after
    /// that, the engine reloads from disk so it never keeps handles to
    /// replaced files.
    pub fn restore(&mut self, name: &str) -> Result<()> {
        snapshot::validate_name(name, &self.files)?;
        let source = FileSet::new(self.files.dir(), name);
        snapshot::verify(&source)?;

        self.data.sync()?;
        let restored = snapshot::restore(&source, &self.files);
        let reopened = self.reopen();
        restored?;
        reopened?;

        tracing::info!(
            "Restored database {:?} from snapshot {:?}: {} records",
            self.config.name,
            name,
            self.primary.len()
        );
        Ok(())
    }

    /// Names of every completed snapshot in the data directory
    pub fn snapshots(&self) -> Result<Vec<String>> {
        snapshot::list(self.files.dir())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close the engine gracefully
    ///
    /// Rewrites and fsyncs every index and syncs the data file, whatever the
    /// sync strategy
    pub fn close(self) -> Result<()> {
        self.primary.flush()?;
        for index in &self.secondary {
            index.flush()?;
        }
        self.data.sync()?;

        tracing::info!("Closed database {:?}", self.config.name);
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live records
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    pub fn stats(&self) -> Stats {
        let total_slots = self.data.slot_count();
        Stats {
            live_records: self.primary.len(),
            total_slots,
            orphan_slots: total_slots.saturating_sub(self.primary.len() as u64),
            data_bytes: self.data.len(),
        }
    }

    /// The live file set paths
    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn primary_index(&self) -> &PrimaryIndex {
        &self.primary
    }

    pub fn secondary_index(&self, field: Field) -> &ValueIndex {
        self.index(field)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn index(&self, field: Field) -> &ValueIndex {
        &self.secondary[Self::slot(field)]
    }

    fn index_mut(&mut self, field: Field) -> &mut ValueIndex {
        &mut self.secondary[Self::slot(field)]
    }

    fn slot(field: Field) -> usize {
        match field {
            Field::Name => 0,
            Field::Gpa => 1,
            Field::Year => 2,
        }
    }

    /// Read a slot the primary index points at; it must be live
    fn read_live(&mut self, offset: u64) -> Result<Record> {
        match self.data.read(offset)? {
            (SlotState::Live, record) => Ok(record),
            (SlotState::Deleted, record) => Err(DbError::CorruptIndex(format!(
                "id {} points at deleted slot {}",
                record.id, offset
            ))),
        }
    }

    /// Index a freshly appended slot, undoing every entry already written
    /// if one fails
    fn index_slot(&mut self, record: &Record, offset: u64) -> Result<()> {
        self.primary.insert(record.id, offset)?;

        for (done, field) in Field::ALL.into_iter().enumerate() {
            let key = record.value_of(field).index_key();
            if let Err(e) = self.index_mut(field).add_entry(key, offset) {
                for &added in Field::ALL[..done].iter().rev() {
                    let key = record.value_of(added).index_key();
                    if let Err(undo) = self.index_mut(added).remove_entry(key, offset) {
                        tracing::error!("Could not undo {} entry at {}: {}", added, offset, undo);
                    }
                }
                if let Err(undo) = self.primary.remove(record.id) {
                    tracing::error!("Could not undo primary entry for id {}: {}", record.id, undo);
                }
                return Err(e);
            }
        }

        Ok(())
    }

    /// Apply secondary key moves `(field, from, to)` for one slot, all or
    /// none
    fn move_entries(&mut self, offset: u64, moves: &[(Field, i32, i32)]) -> Result<()> {
        for (done, &(field, from, to)) in moves.iter().enumerate() {
            if let Err(e) = self.move_entry(offset, field, from, to) {
                for &(field, from, to) in moves[..done].iter().rev() {
                    if let Err(undo) = self.move_entry(offset, field, to, from) {
                        tracing::error!("Could not undo {} move at {}: {}", field, offset, undo);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn move_entry(&mut self, offset: u64, field: Field, from: i32, to: i32) -> Result<()> {
        let index = self.index_mut(field);
        index.remove_entry(from, offset)?;
        if let Err(e) = index.add_entry(to, offset) {
            if let Err(undo) = index.add_entry(from, offset) {
                tracing::error!("Could not put back {} entry at {}: {}", field, offset, undo);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Reload the data file and every index from disk
    ///
    /// Nothing is swapped in unless every file loads.
    fn reopen(&mut self) -> Result<()> {
        let sync = self.config.sync_strategy;
        let data = DataFile::open(&self.files.data(), sync)?;
        let primary = PrimaryIndex::load(&self.files.primary(), sync)?;
        let secondary = [
            ValueIndex::load(&self.files.secondary(Field::Name), sync)?,
            ValueIndex::load(&self.files.secondary(Field::Gpa), sync)?,
            ValueIndex::load(&self.files.secondary(Field::Year), sync)?,
        ];

        self.data = data;
        self.primary = primary;
        self.secondary = secondary;
        Ok(())
    }
}
