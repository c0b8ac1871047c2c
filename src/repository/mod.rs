mod file_database;
mod hash_database;
mod report;
pub mod scanner;

pub use file_database::FileDatabase;
pub use hash_database::{FilenameSet, HashDatabase, HashRecord, HashTable, Segmentation};
pub use scanner::{ScanDelta, ScannedFile};

/// Catalogue schema version, bumped once per format change
pub const CATALOGUE_VERSION: u32 = 2;
