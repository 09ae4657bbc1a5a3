//! File set layout
//!
//! Maps a name prefix to the data file and index files of one database (or
//! one snapshot of it).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::record::Field;

/// What a file in a set holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileRole {
    Data,
    Primary,
    Secondary(Field),
}

/// Paths of every file sharing one prefix inside a directory
///
/// ```text
/// {prefix}.dat  {prefix}.idx  {prefix}_name.idx  {prefix}_gpa.idx  {prefix}_year.idx
/// ```
#[derive(Debug, Clone)]
pub struct FileSet {
    dir: PathBuf,
    prefix: String,
}

impl FileSet {
    pub fn new(dir: &Path, prefix: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        }
    }

    pub fn data(&self) -> PathBuf {
        self.dir.join(format!("{}.dat", self.prefix))
    }

    pub fn primary(&self) -> PathBuf {
        self.dir.join(format!("{}.idx", self.prefix))
    }

    pub fn secondary(&self, field: Field) -> PathBuf {
        self.dir.join(format!("{}_{}.idx", self.prefix, field))
    }

    /// Snapshot manifest (only snapshots have one)
    pub fn manifest(&self) -> PathBuf {
        self.dir.join(format!("{}.manifest", self.prefix))
    }

    pub fn path(&self, role: FileRole) -> PathBuf {
        match role {
            FileRole::Data => self.data(),
            FileRole::Primary => self.primary(),
            FileRole::Secondary(field) => self.secondary(field),
        }
    }

    /// Every role in the set, data file first
    pub fn roles() -> Vec<FileRole> {
        let mut roles = vec![FileRole::Data, FileRole::Primary];
        roles.extend(Field::ALL.iter().map(|&field| FileRole::Secondary(field)));
        roles
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
