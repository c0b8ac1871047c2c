use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::report::DirStats;
use super::scanner::{hash_entries, walk_files, ProgressReporter, ScanDelta, ScannedFile};
use crate::error::{ArchiveError, Result};
use crate::model::FileEntry;
use crate::util::format_thousands;

/// Live inventory of the regular files below one root directory.
///
/// Entries are keyed by their `/`-separated path relative to the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDatabase {
    root: PathBuf,
    entries: BTreeMap<String, FileEntry>,
}

impl FileDatabase {
    /// Create an empty database for `root`.
    ///
    /// The root is canonicalized so every entry path is absolute.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root).map_err(|e| ArchiveError::from_io(e, root))?;
        if !root.is_dir() {
            return Err(ArchiveError::invalid_state(format!(
                "archive root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self {
            root,
            entries: BTreeMap::new(),
        })
    }

    /// Create a database for `root` and populate it with a full scan
    pub fn from_scan(root: impl AsRef<Path>) -> Result<Self> {
        let mut db = Self::new(root)?;
        db.update()?;
        Ok(db)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root and return the regular files currently on disk
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        walk_files(&self.root)
    }

    /// Rescan the root and apply the differences to the inventory.
    ///
    /// Removed paths are dropped. Modified paths (size or mtime changed) keep
    /// their entry with refreshed metadata and a cleared hash. Calling this
    /// twice without filesystem changes returns an empty delta the second time.
    pub fn update(&mut self) -> Result<ScanDelta> {
        let scanned = self.scan()?;
        let mut delta = ScanDelta::new();
        let mut seen = BTreeSet::new();

        for file in scanned {
            seen.insert(file.relative.clone());
            match self.entries.get_mut(&file.relative) {
                None => {
                    delta.added.insert(file.relative.clone());
                    self.entries.insert(
                        file.relative.clone(),
                        FileEntry::from_parts(file.path, file.relative, file.size, file.modified),
                    );
                }
                Some(entry) if entry.size() != file.size || entry.modified() != file.modified => {
                    debug!("modified: {}", file.relative);
                    entry.set_metadata(file.size, file.modified);
                    entry.clear_hash();
                    delta.modified.insert(file.relative);
                }
                Some(_) => {}
            }
        }

        self.entries.retain(|relative, _| {
            let keep = seen.contains(relative);
            if !keep {
                debug!("removed: {}", relative);
                delta.removed.insert(relative.clone());
            }
            keep
        });

        info!(
            root = %self.root.display(),
            files = self.entries.len(),
            added = delta.added.len(),
            removed = delta.removed.len(),
            modified = delta.modified.len(),
            "file database updated"
        );
        Ok(delta)
    }

    /// Hash every entry that has no hash yet, in parallel.
    ///
    /// Entries whose file vanished since the last scan are dropped from the
    /// inventory. Returns the number of entries hashed.
    pub fn calculate_file_hash(&mut self, progress: &dyn ProgressReporter) -> Result<usize> {
        let pending: Vec<&mut FileEntry> =
            self.entries.values_mut().filter(|e| !e.is_hashed()).collect();
        if pending.is_empty() {
            return Ok(0);
        }

        let outcome = hash_entries(pending, progress)?;
        for relative in &outcome.vanished {
            warn!("file vanished before hashing, dropping: {}", relative);
            self.entries.remove(relative);
        }
        Ok(outcome.hashed)
    }

    /// `true` once every entry carries a hash
    pub fn is_hashed(&self) -> bool {
        self.entries.values().all(FileEntry::is_hashed)
    }

    pub fn get(&self, relative: &str) -> Option<&FileEntry> {
        self.entries.get(relative)
    }

    /// Entries in relative-path order
    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry sizes, duplicates included
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(FileEntry::size).sum()
    }

    /// One line per entry: relative path, size and hash (empty until hashed)
    pub fn list_files(&self) -> Vec<String> {
        self.entries
            .values()
            .map(|e| format!("{}\t{}\t{}", e.relative_path(), e.size(), e.hash()))
            .collect()
    }

    /// Fixed-layout summary of the inventory.
    ///
    /// The directory depth is counted from the filesystem root, so it
    /// includes the components of the scan root itself.
    pub fn get_info(&self) -> String {
        let stats = DirStats::collect(self.entries.keys().map(String::as_str));
        format!(
            "Number of entries = {}\n\
             Data size       = {} bytes\n\
             Number of dirs  = {}\n\
             Max dir depth   = {} (on source file system)\n \
             Dir =: {}\n",
            self.entries.len(),
            format_thousands(self.total_size()),
            stats.dirs,
            stats.absolute_depth(&self.root),
            stats.deepest_under(&self.root),
        )
    }
}
