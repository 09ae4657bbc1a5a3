//! Snapshot Module
//!
//! Named copies of a database's file set, for backup and restore.
//!
//! ## Responsibilities
//! - Copy the data file and every index file under a new prefix
//! - Record length + CRC32 of each copy in a manifest written last
//! - Refuse to restore from a set that is incomplete or altered
//!
//! ## Manifest
//! `{snapshot}.manifest` holds a bincode-encoded [`Manifest`]. Its absence
//! means the snapshot was never completed.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};
use crate::index::{sync_dir, temp_path};
use crate::storage::{FileRole, FileSet};

/// Current manifest format version
pub const MANIFEST_VERSION: u16 = 1;

/// Copy buffer size
const CHUNK_SIZE: usize = 64 * 1024;

/// Description of a complete snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u16,

    /// Unix millis when the snapshot was taken
    pub created_at: u64,

    /// One entry per file in the set
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub role: FileRole,
    pub len: u64,
    pub crc: u32,
}

impl Manifest {
    fn entry(&self, role: FileRole) -> Option<&ManifestEntry> {
        self.files.iter().find(|e| e.role == role)
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Reject snapshot names that would escape the directory or clobber live files
///
/// Backups additionally refuse names that overlap an existing snapshot.
pub fn validate_name(snapshot: &str, live: &FileSet) -> Result<()> {
    let invalid = || DbError::InvalidSnapshotName(snapshot.to_string());

    if snapshot.is_empty()
        || snapshot == "."
        || snapshot == ".."
        || snapshot.contains(['/', '\\'])
    {
        return Err(invalid());
    }

    let snapshot_paths = paths_of(&FileSet::new(live.dir(), snapshot));

    let clashes = FileSet::roles()
        .into_iter()
        .map(|role| live.path(role))
        .any(|path| snapshot_paths.contains(&path));
    if clashes {
        return Err(invalid());
    }

    Ok(())
}

/// Whether a completed snapshot exists for this set
pub fn exists(snapshot: &FileSet) -> bool {
    snapshot.manifest().is_file()
}

/// Names of every completed snapshot in `dir`, sorted
pub fn list(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("manifest") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }

    names.sort();
    Ok(names)
}

/// Check a snapshot is complete and unaltered
///
/// `SnapshotMissing` names the first absent file; `SnapshotCorrupt` covers
/// unreadable manifests and checksum mismatches.
pub fn verify(snapshot: &FileSet) -> Result<Manifest> {
    let manifest_path = snapshot.manifest();
    for path in FileSet::roles()
        .into_iter()
        .map(|role| snapshot.path(role))
        .chain(std::iter::once(manifest_path.clone()))
    {
        if !path.is_file() {
            return Err(DbError::SnapshotMissing(path));
        }
    }

    let bytes = fs::read(&manifest_path)?;
    let manifest: Manifest = bincode::deserialize(&bytes).map_err(|e| {
        DbError::SnapshotCorrupt(format!("{}: {}", manifest_path.display(), e))
    })?;

    if manifest.version != MANIFEST_VERSION {
        return Err(DbError::SnapshotCorrupt(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }

    for role in FileSet::roles() {
        let path = snapshot.path(role);
        let expected = manifest.entry(role).ok_or_else(|| {
            DbError::SnapshotCorrupt(format!("Manifest has no entry for {}", path.display()))
        })?;

        let (len, crc) = checksum(&path)?;
        if len != expected.len || crc != expected.crc {
            return Err(DbError::SnapshotCorrupt(format!(
                "{}: expected {} bytes crc {:#010x}, found {} bytes crc {:#010x}",
                path.display(),
                expected.len,
                expected.crc,
                len,
                crc
            )));
        }
    }

    Ok(manifest)
}

// =============================================================================
// Crate API (driven by the engine)
// =============================================================================

/// Copy the live set to the snapshot set, manifest last
///
/// Live index files that do not exist yet are captured as empty indexes.
/// Every copy and the manifest are fsynced whatever the sync strategy.
pub(crate) fn backup(live: &FileSet, snapshot: &FileSet) -> Result<Manifest> {
    ensure_disjoint(snapshot)?;

    // An old manifest must not vouch for half-replaced files
    match fs::remove_file(snapshot.manifest()) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let mut files = Vec::new();
    for role in FileSet::roles() {
        let source = live.path(role);
        let source = match role {
            FileRole::Data => Some(source.as_path()),
            _ if source.is_file() => Some(source.as_path()),
            _ => None,
        };
        let dest = snapshot.path(role);
        let (tmp, len, crc) = stage(source, &dest)?;
        fs::rename(&tmp, &dest)?;
        files.push(ManifestEntry { role, len, crc });
    }

    let manifest = Manifest {
        version: MANIFEST_VERSION,
        created_at: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default(),
        files,
    };

    let bytes = bincode::serialize(&manifest).map_err(|e| DbError::Serialization(e.to_string()))?;
    write_atomic(&snapshot.manifest(), &bytes)?;
    sync_dir(&snapshot.manifest())?;

    Ok(manifest)
}

/// Overwrite every live file with its snapshot copy
///
/// Callers verify the snapshot first. Every copy is staged next to its live
/// file before the first rename, so a failed copy leaves the live set as it
/// was. Only a failing rename can leave it mixed.
pub(crate) fn restore(snapshot: &FileSet, live: &FileSet) -> Result<()> {
    let mut staged = Vec::new();
    for role in FileSet::roles() {
        let source = snapshot.path(role);
        let dest = live.path(role);
        match stage(Some(source.as_path()), &dest) {
            Ok((tmp, _, _)) => staged.push((tmp, dest)),
            Err(e) => {
                discard(staged.iter().map(|(tmp, _)| tmp));
                return Err(e);
            }
        }
    }

    for (i, (tmp, dest)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(tmp, dest) {
            discard(staged[i..].iter().map(|(tmp, _)| tmp));
            return Err(e.into());
        }
    }

    sync_dir(&live.data())
}

// =============================================================================
// Private Helpers
// =============================================================================

/// Refuse a snapshot whose files would land on another snapshot's files
///
/// `x_name` would otherwise overwrite `x_name.idx` of snapshot `x`.
fn ensure_disjoint(snapshot: &FileSet) -> Result<()> {
    let ours = paths_of(snapshot);

    for other in list(snapshot.dir())? {
        if other == snapshot.prefix() {
            continue;
        }
        let theirs = paths_of(&FileSet::new(snapshot.dir(), &other));
        if ours.iter().any(|path| theirs.contains(path)) {
            return Err(DbError::InvalidSnapshotName(format!(
                "{} (overlaps snapshot {:?})",
                snapshot.prefix(),
                other
            )));
        }
    }

    Ok(())
}

/// Every file of a set, manifest included
fn paths_of(set: &FileSet) -> Vec<PathBuf> {
    let mut paths: Vec<_> = FileSet::roles()
        .into_iter()
        .map(|role| set.path(role))
        .collect();
    paths.push(set.manifest());
    paths
}

/// Copy `source` (or nothing, giving an empty file) to the temp path of
/// `dest`, returning the temp path, length and CRC32
fn stage(source: Option<&Path>, dest: &Path) -> Result<(PathBuf, u64, u32)> {
    let tmp = temp_path(dest);
    match copy_synced(source, &tmp) {
        Ok((len, crc)) => Ok((tmp, len, crc)),
        Err(e) => {
            // Only remove what this call created
            if tmp.is_file() {
                discard(std::iter::once(&tmp));
            }
            Err(e)
        }
    }
}

/// Stream `source` into a new file at `target` and fsync it
fn copy_synced(source: Option<&Path>, target: &Path) -> Result<(u64, u32)> {
    let mut out = File::create(target)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut len = 0u64;

    if let Some(source) = source {
        let mut input = File::open(source)?;
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let n = input.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
            out.write_all(&chunk[..n])?;
            len += n as u64;
        }
    }
    out.sync_all()?;

    Ok((len, hasher.finalize()))
}

/// Best-effort removal of staged temp files
fn discard<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Could not remove staged file {}: {}", path.display(), e);
        }
    }
}

fn checksum(path: &Path) -> Result<(u64, u32)> {
    let mut input = File::open(path)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut len = 0u64;

    loop {
        let n = input.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        hasher.update(&chunk[..n]);
        len += n as u64;
    }

    Ok((len, hasher.finalize()))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
