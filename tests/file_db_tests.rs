// File database integration tests
// Scanning, rescanning and hashing against real temporary trees

mod common;

use discarchive::model::hash_bytes;
use discarchive::repository::scanner::NoopProgress;
use discarchive::repository::FileDatabase;

#[test]
fn test_scan_standard_tree() {
    let source = common::create_source_tree();
    let db = FileDatabase::from_scan(source.path()).unwrap();

    assert_eq!(db.len(), 6);
    assert_eq!(db.total_size(), common::SOURCE_TOTAL);
    assert!(db.get("testDir/fourthé.txt").is_some());
    assert!(db.iter().all(|e| e.path().starts_with(db.root())));
}

#[test]
fn test_update_twice_is_empty() {
    let source = common::create_source_tree();
    let mut db = FileDatabase::new(source.path()).unwrap();

    let first = db.update().unwrap();
    assert_eq!(first.added.len(), 6);
    assert!(first.removed.is_empty());
    assert!(first.modified.is_empty());

    let second = db.update().unwrap();
    assert!(second.is_empty(), "unchanged tree must give an empty delta: {:?}", second);
}

#[test]
fn test_update_sets_are_disjoint() {
    let source = common::create_source_tree();
    let mut db = FileDatabase::from_scan(source.path()).unwrap();

    std::fs::remove_file(source.path().join("third.txt")).unwrap();
    common::write_file(source.path(), "testDir/fifth.txt", b"rewritten with a new size");
    common::write_file(source.path(), "sixth.txt", b"sixth");

    let delta = db.update().unwrap();
    assert_eq!(delta.added.iter().collect::<Vec<_>>(), ["sixth.txt"]);
    assert_eq!(delta.removed.iter().collect::<Vec<_>>(), ["third.txt"]);
    assert_eq!(delta.modified.iter().collect::<Vec<_>>(), ["testDir/fifth.txt"]);
    assert_eq!(db.len(), 6);
}

#[test]
fn test_bulk_hash_matches_content() {
    let source = common::create_source_tree();
    let mut db = FileDatabase::from_scan(source.path()).unwrap();
    assert_eq!(db.calculate_file_hash(&NoopProgress).unwrap(), 6);

    for (relative, tag, size) in common::SOURCE_FILES {
        let entry = db.get(relative).unwrap();
        assert_eq!(entry.hash(), hash_bytes(&common::content(tag, *size)), "{}", relative);
    }
    assert_eq!(db.get("second.txt").unwrap(), db.get("second copy.txt").unwrap());
}

#[test]
fn test_rehash_after_modification() {
    let source = common::create_source_tree();
    let mut db = FileDatabase::from_scan(source.path()).unwrap();
    db.calculate_file_hash(&NoopProgress).unwrap();
    let before = db.get("first.html").unwrap().hash().to_string();

    common::write_file(source.path(), "first.html", b"<html>a different page</html>");
    db.update().unwrap();
    assert!(!db.is_hashed());
    assert_eq!(db.calculate_file_hash(&NoopProgress).unwrap(), 1);
    assert_ne!(db.get("first.html").unwrap().hash(), before);
}

#[test]
fn test_get_info_reports_deepest_dir() {
    let source = common::create_source_tree();
    let db = FileDatabase::from_scan(source.path()).unwrap();
    let info = db.get_info();

    assert!(info.starts_with("Number of entries = 6\nData size       = 158 bytes\n"));
    assert!(info.contains("Number of dirs  = 2\n"));
    let deepest = db.root().join("testDir");
    let depth = deepest.components().count() - 1;
    assert!(info.contains(&format!("Max dir depth   = {} (on source file system)\n", depth)));
    assert!(info.ends_with(&format!(" Dir =: {}\n", deepest.display())));
}
