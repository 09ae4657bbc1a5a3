//! Tests for ValueIndex and the index key functions
//!
//! These tests verify:
//! - Bucket add/remove semantics
//! - Empty buckets are dropped
//! - Persistence and the repeated-key file format
//! - Stable hashing and GPA quantization

use std::fs;
use std::path::PathBuf;

use slotdb::config::SyncStrategy;
use slotdb::index::{gpa_key, name_key, year_key, ValueIndex};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_index() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("students_name.idx");
    (temp_dir, path)
}

fn open(path: &PathBuf) -> ValueIndex {
    ValueIndex::load(path, SyncStrategy::EveryWrite).unwrap()
}

// =============================================================================
// Bucket Tests
// =============================================================================

#[test]
fn test_load_missing_file_is_empty() {
    let (_temp, path) = setup_temp_index();

    let index = open(&path);

    assert!(index.is_empty());
    assert_eq!(index.len(), 0);
    assert!(index.lookup(123).is_empty());
}

#[test]
fn test_bucket_holds_many_offsets_in_order() {
    let (_temp, path) = setup_temp_index();
    let mut index = open(&path);

    index.add_entry(10, 98).unwrap();
    index.add_entry(10, 0).unwrap();
    index.add_entry(20, 49).unwrap();

    assert_eq!(index.lookup(10), &[98, 0]);
    assert_eq!(index.lookup(20), &[49]);
    assert_eq!(index.len(), 3);
    assert_eq!(index.bucket_count(), 2);
}

#[test]
fn test_remove_entry_keeps_other_offsets() {
    let (_temp, path) = setup_temp_index();
    let mut index = open(&path);
    index.add_entry(10, 0).unwrap();
    index.add_entry(10, 49).unwrap();

    assert!(index.remove_entry(10, 0).unwrap());

    assert_eq!(index.lookup(10), &[49]);
}

#[test]
fn test_remove_last_entry_drops_bucket() {
    let (_temp, path) = setup_temp_index();
    let mut index = open(&path);
    index.add_entry(10, 0).unwrap();

    assert!(index.remove_entry(10, 0).unwrap());

    assert_eq!(index.bucket_count(), 0);
    assert!(index.is_empty());
    assert!(index.lookup(10).is_empty());
}

#[test]
fn test_remove_entry_removes_one_occurrence() {
    let (_temp, path) = setup_temp_index();
    let mut index = open(&path);
    index.add_entry(10, 49).unwrap();
    index.add_entry(10, 49).unwrap();

    index.remove_entry(10, 49).unwrap();

    assert_eq!(index.lookup(10), &[49]);
}

#[test]
fn test_remove_missing_entry_leaves_file_untouched() {
    let (_temp, path) = setup_temp_index();
    let mut index = open(&path);
    index.add_entry(10, 0).unwrap();
    let before = fs::read(&path).unwrap();

    assert!(!index.remove_entry(10, 49).unwrap());
    assert!(!index.remove_entry(11, 0).unwrap());

    assert_eq!(fs::read(&path).unwrap(), before);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_mutations_persist_immediately() {
    let (_temp, path) = setup_temp_index();
    {
        let mut index = open(&path);
        index.add_entry(5, 0).unwrap();
        index.add_entry(5, 49).unwrap();
        index.add_entry(6, 98).unwrap();
        index.remove_entry(6, 98).unwrap();
    }

    let index = open(&path);
    assert_eq!(index.lookup(5), &[0, 49]);
    assert!(index.lookup(6).is_empty());
}

#[test]
fn test_file_repeats_hash_per_offset() {
    let (_temp, path) = setup_temp_index();
    let mut index = open(&path);

    index.add_entry(-1, 0).unwrap();
    index.add_entry(-1, 49).unwrap();

    let mut expected = Vec::new();
    for offset in [0i64, 49] {
        expected.extend_from_slice(&(-1i32).to_be_bytes());
        expected.extend_from_slice(&offset.to_be_bytes());
    }
    assert_eq!(fs::read(&path).unwrap(), expected);
}

#[test]
fn test_clear_deletes_file() {
    let (_temp, path) = setup_temp_index();
    let mut index = open(&path);
    index.add_entry(1, 0).unwrap();

    index.clear().unwrap();

    assert!(index.is_empty());
    assert!(!path.exists());
}

// =============================================================================
// Key Function Tests
// =============================================================================

#[test]
fn test_name_key_is_stable() {
    assert_eq!(name_key(""), 0);
    assert_eq!(name_key("A"), 65);
    // 65 * 31^2 + 110 * 31 + 110
    assert_eq!(name_key("Ann"), 65_985);
    assert_eq!(name_key("Ann"), name_key("Ann"));
}

#[test]
fn test_name_key_collisions_exist() {
    assert_eq!(name_key("Aa"), name_key("BB"));
    assert_ne!(name_key("Aa"), name_key("Ab"));
}

#[test]
fn test_name_key_wraps_on_long_input() {
    // Must not panic on overflow
    let _ = name_key(&"z".repeat(1000));
}

#[test]
fn test_gpa_key_quantizes_to_hundredths() {
    assert_eq!(gpa_key(3.75), 375);
    assert_eq!(gpa_key(3.751), 375);
    assert_eq!(gpa_key(3.749), 375);
    assert_eq!(gpa_key(3.5), 350);
    assert_eq!(gpa_key(0.0), 0);
}

#[test]
fn test_year_key_is_identity() {
    assert_eq!(year_key(2021), 2021);
    assert_eq!(year_key(-5), -5);
}

// =============================================================================
// Failed Rewrite Tests
// =============================================================================

/// A directory in the temp file's place makes every rewrite fail
fn block_rewrite(path: &PathBuf) -> PathBuf {
    let blocker = PathBuf::from(format!("{}.tmp", path.display()));
    fs::create_dir(&blocker).unwrap();
    blocker
}

#[test]
fn test_failed_add_entry_is_not_kept() {
    let (_temp, path) = setup_temp_index();
    let mut index = open(&path);
    index.add_entry(10, 0).unwrap();
    let blocker = block_rewrite(&path);

    assert!(index.add_entry(10, 49).is_err());
    assert!(index.add_entry(20, 98).is_err());

    assert_eq!(index.lookup(10), &[0]);
    assert!(index.lookup(20).is_empty());
    assert_eq!(index.bucket_count(), 1);

    fs::remove_dir(&blocker).unwrap();
    index.add_entry(10, 49).unwrap();
    assert_eq!(open(&path).lookup(10), &[0, 49]);
}

#[test]
fn test_failed_remove_entry_restores_position() {
    let (_temp, path) = setup_temp_index();
    let mut index = open(&path);
    index.add_entry(10, 0).unwrap();
    index.add_entry(10, 49).unwrap();
    index.add_entry(11, 98).unwrap();
    let _blocker = block_rewrite(&path);

    assert!(index.remove_entry(10, 0).is_err());
    assert!(index.remove_entry(11, 98).is_err());

    assert_eq!(index.lookup(10), &[0, 49]);
    assert_eq!(index.lookup(11), &[98]);
}

#[test]
fn test_replace_groups_pairs_into_buckets() {
    let (_temp, path) = setup_temp_index();
    let mut index = open(&path);
    index.add_entry(1, 0).unwrap();

    index.replace([(7, 0), (5, 49), (7, 98)]).unwrap();

    assert!(index.lookup(1).is_empty());
    assert_eq!(index.lookup(7), &[0, 98]);
    assert_eq!(open(&path).lookup(5), &[49]);
    assert_eq!(index.len(), 3);
}
