//! Index file I/O
//!
//! Reads and atomically rewrites files of (key, offset) pairs.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};

use crate::config::SyncStrategy;
use crate::error::{DbError, Result};

use super::PAIR_SIZE;

/// Read every pair from an index file
///
/// A missing file is an empty index.
pub(super) fn read_pairs(path: &Path) -> Result<Vec<(i32, u64)>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    if bytes.len() % PAIR_SIZE != 0 {
        return Err(DbError::CorruptIndex(format!(
            "{}: length {} is not a multiple of {}",
            path.display(),
            bytes.len(),
            PAIR_SIZE
        )));
    }

    let mut buf = bytes.as_slice();
    let mut pairs = Vec::with_capacity(bytes.len() / PAIR_SIZE);

    while buf.has_remaining() {
        let key = buf.get_i32();
        let raw_offset = buf.get_i64();
        let offset = u64::try_from(raw_offset).map_err(|_| {
            DbError::CorruptIndex(format!(
                "{}: negative offset {} for key {}",
                path.display(),
                raw_offset,
                key
            ))
        })?;
        pairs.push((key, offset));
    }

    Ok(pairs)
}

/// Replace an index file with the given pairs
///
/// Writes a sibling temp file, then renames it over the target so a crash
/// never leaves a half-written index behind.
pub(super) fn write_pairs<I>(path: &Path, pairs: I, sync: SyncStrategy) -> Result<()>
where
    I: IntoIterator<Item = (i32, u64)>,
{
    let mut buf = BytesMut::new();
    for (key, offset) in pairs {
        let offset = i64::try_from(offset).map_err(|_| {
            DbError::CorruptIndex(format!("Offset {} does not fit in an i64", offset))
        })?;
        buf.put_i32(key);
        buf.put_i64(offset);
    }

    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&buf)?;
        if sync == SyncStrategy::EveryWrite {
            file.sync_all()?;
        }
    }
    fs::rename(&tmp, path)?;

    if sync == SyncStrategy::EveryWrite {
        sync_dir(path)?;
    }
    Ok(())
}

/// Delete an index file, treating "already gone" as success
pub(super) fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// "students.idx" → "students.idx.tmp"
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// fsync the directory holding `path`, making a rename durable
pub(crate) fn sync_dir(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        File::open(dir)?.sync_all()?;
    }
    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}
