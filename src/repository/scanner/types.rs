//! Domain types for filesystem scanning
//!
//! These types form the data contract between the walk and the file database.

use std::collections::BTreeSet;
use std::path::PathBuf;

use time::OffsetDateTime;

/// A regular file observed by one directory walk
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// `/`-separated path below the scan root
    pub relative: String,
    pub size: u64,
    pub modified: OffsetDateTime,
}

/// Differences found by one rescan, keyed by relative path.
///
/// The three sets are disjoint.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanDelta {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    /// Size or modification time changed; the entry needs rehashing
    pub modified: BTreeSet<String>,
}

impl ScanDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed paths
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}
