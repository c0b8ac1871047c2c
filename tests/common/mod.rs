// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use discarchive::{ArchiveConfig, Archiver};
use std::path::Path;
use tempfile::TempDir;

/// Files of the standard source tree: (relative path, content tag, size).
/// Entries sharing a tag have identical content.
pub const SOURCE_FILES: &[(&str, &str, usize)] = &[
    ("first.html", "first", 40),
    ("second.txt", "second", 20),
    ("second copy.txt", "second", 20),
    ("third.txt", "third", 24),
    ("testDir/fourthé.txt", "fourth", 33),
    ("testDir/fifth.txt", "fifth", 21),
];

/// Total bytes in the standard source tree, duplicates included
pub const SOURCE_TOTAL: u64 = 158;

/// Deterministic content of exactly `size` bytes for a tag
pub fn content(tag: &str, size: usize) -> Vec<u8> {
    let mut bytes = format!("{}:", tag).into_bytes();
    bytes.resize(size, b'.');
    bytes
}

/// Write a file below `root`, creating parent directories
pub fn write_file(root: &Path, relative: &str, bytes: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

/// Create the standard six-file source tree
pub fn create_source_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    for (relative, tag, size) in SOURCE_FILES {
        write_file(dir.path(), relative, &content(tag, *size));
    }
    dir
}

/// Create a flat tree of distinct files with the given sizes, named so that
/// path order matches the slice order
pub fn create_sized_tree(sizes: &[usize]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (i, size) in sizes.iter().enumerate() {
        write_file(
            dir.path(),
            &format!("file_{:03}.bin", i),
            &content(&format!("blob{}", i), *size),
        );
    }
    dir
}

/// Archiver whose catalogue and snapshot go into `work`
pub fn archiver_in(work: &TempDir) -> Archiver {
    Archiver::new(ArchiveConfig {
        work_dir: work.path().to_path_buf(),
        ..Default::default()
    })
}

/// Archiver that has scanned and deduplicated `source`
pub fn deduplicated(source: &TempDir, work: &TempDir) -> Archiver {
    let mut archiver = archiver_in(work);
    archiver.create_file_database(source.path()).unwrap();
    archiver.convert_to_hash_database().unwrap();
    archiver
}
