// Catalogue integration tests
// JSON layout, reload from catalogue, and byte-size stability

mod common;

use discarchive::archive::Catalogue;
use discarchive::model::Capacity;
use discarchive::{ArchiveConfig, ArchiveError, ArchiveState, Archiver};
use tempfile::TempDir;

fn saved_archiver(source: &TempDir, work: &TempDir, capacity: Capacity) -> Archiver {
    let mut archiver = common::deduplicated(source, work);
    archiver.segment(capacity).unwrap();
    archiver.save().unwrap();
    archiver
}

#[test]
fn test_catalogue_encoding_is_pinned() {
    let source = common::create_source_tree();
    let work = TempDir::new().unwrap();
    let archiver = saved_archiver(&source, &work, Capacity::Cd);

    let bytes = std::fs::read(work.path().join("catalogue.json")).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(!text.contains('\r'));
    assert!(!text.ends_with('\n'));
    assert!(text.starts_with("{\n    \"client_name\": \"discarchive\",\n"));
    assert!(text.contains("fourthé.txt"), "non-ASCII names are stored unescaped");
    assert_eq!(text, archiver.catalogue_json().unwrap());
    assert_eq!(
        archiver.hash_database().unwrap().catalogue_size(),
        Some(bytes.len() as u64)
    );
}

#[test]
fn test_catalogue_is_a_pure_function_of_state() {
    let source = common::create_source_tree();
    let work = TempDir::new().unwrap();
    let mut archiver = saved_archiver(&source, &work, Capacity::Cd);

    let first = archiver.catalogue_json().unwrap();
    archiver.save().unwrap();
    let second = std::fs::read_to_string(work.path().join("catalogue.json")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_round_trip_through_catalogue() {
    let source = common::create_source_tree();
    let work = TempDir::new().unwrap();
    let archiver = saved_archiver(&source, &work, Capacity::Custom(64));

    let loaded = Archiver::load_from_json(
        work.path().join("catalogue.json"),
        ArchiveConfig::default(),
    )
    .unwrap();

    assert_eq!(loaded.guid(), archiver.guid());
    assert_eq!(loaded.state(), ArchiveState::Segmented);
    assert!(loaded.file_database().is_none());

    let original = archiver.hash_database().unwrap();
    let restored = loaded.hash_database().unwrap();
    assert!(restored.same_content(original));
    assert_eq!(restored.segmentation(), original.segmentation());
    for (a, b) in original.iter().zip(restored.iter()) {
        assert_eq!(a.volume(), b.volume());
        assert_eq!(a.short_path(), b.short_path());
        assert_eq!(a.source(), b.source());
    }
    assert_eq!(loaded.catalogue_json().unwrap(), archiver.catalogue_json().unwrap());
}

#[test]
fn test_reloaded_archive_reports_the_same_info() {
    let source = common::create_source_tree();
    let work = TempDir::new().unwrap();
    let archiver = saved_archiver(&source, &work, Capacity::Cd);

    let loaded = Archiver::load_from_json(
        work.path().join("catalogue.json"),
        ArchiveConfig::default(),
    )
    .unwrap();

    let fresh = archiver.get_info();
    assert_eq!(fresh.matches("Number of entries").count(), 1);
    assert!(!fresh.contains(&source.path().display().to_string()));
    assert_eq!(loaded.get_info(), fresh);
}

#[test]
fn test_loaded_archive_keeps_lock() {
    let source = common::create_source_tree();
    let work = TempDir::new().unwrap();
    let mut archiver = saved_archiver(&source, &work, Capacity::Cd);
    archiver.lock().unwrap();
    let json = archiver.catalogue_json().unwrap();

    let mut loaded = Archiver::from_catalogue_str(&json, ArchiveConfig::default()).unwrap();
    assert!(loaded.is_locked());
    assert!(matches!(loaded.segment(Capacity::Dvd), Err(ArchiveError::InvalidState(_))));
}

#[test]
fn test_catalogue_fields() {
    let source = common::create_source_tree();
    let work = TempDir::new().unwrap();
    let archiver = saved_archiver(&source, &work, Capacity::Cd);

    let catalogue = Catalogue::load(work.path().join("catalogue.json")).unwrap();
    assert_eq!(catalogue.guid, archiver.guid());
    assert_eq!(catalogue.version, 2);
    assert!(catalogue.is_segmented);
    assert!(!catalogue.locked);
    assert_eq!(catalogue.target_root, "/DATA");
    let segment = catalogue.segment.unwrap();
    assert_eq!(segment.class, "cd");
    assert_eq!(segment.capacity, 737_280_000);
    assert_eq!(segment.num_discs, 1);
    assert_eq!(catalogue.hash_db.len(), 5);
}

#[test]
fn test_newer_catalogue_version_rejected() {
    let source = common::create_source_tree();
    let work = TempDir::new().unwrap();
    let archiver = saved_archiver(&source, &work, Capacity::Cd);

    let mut catalogue = archiver.catalogue().unwrap();
    catalogue.version += 1;
    let err = Archiver::from_catalogue_str(&catalogue.to_json().unwrap(), ArchiveConfig::default())
        .unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidState(_)));
}

#[test]
fn test_missing_catalogue_file() {
    let work = TempDir::new().unwrap();
    let err = Archiver::load_from_json(work.path().join("catalogue.json"), ArchiveConfig::default())
        .unwrap_err();
    assert!(err.is_not_found());
}
