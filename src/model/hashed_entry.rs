use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::util::{iso9660_path, join_target};

/// One stored blob: unique content plus every logical filename sharing it.
///
/// `filenames` are long-namespace paths under the target root, kept in
/// insertion order. The first one is the canonical name from which
/// `short_path` and `long_path` are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedEntry {
    hash: String,
    source: PathBuf,
    filenames: Vec<String>,
    size: u64,
    mtime: OffsetDateTime,
    short_path: String,
    long_path: String,
    volume: Option<u32>,
}

/// A location in both target namespaces (a file or a directory)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPath {
    pub short_path: String,
    pub long_path: String,
}

impl HashedEntry {
    /// Create an entry whose canonical name is `relative` under `target_root`
    pub fn new(
        hash: impl Into<String>,
        source: impl Into<PathBuf>,
        target_root: &str,
        relative: &str,
        size: u64,
        mtime: OffsetDateTime,
    ) -> Self {
        let long_path = join_target(target_root, relative);
        Self {
            hash: hash.into(),
            source: source.into(),
            short_path: iso9660_path(&long_path),
            filenames: vec![long_path.clone()],
            long_path,
            size,
            mtime,
            volume: None,
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Filesystem path the blob's content is read from
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mtime(&self) -> OffsetDateTime {
        self.mtime
    }

    /// ISO9660 path of the canonical filename, e.g. `/DATA/FIRST.HTML;1`
    pub fn short_path(&self) -> &str {
        &self.short_path
    }

    /// Long-filename path of the canonical filename, e.g. `/DATA/first.html`
    pub fn long_path(&self) -> &str {
        &self.long_path
    }

    pub fn volume(&self) -> Option<u32> {
        self.volume
    }

    /// Assign the volume number if none is set yet; otherwise a no-op.
    pub fn set_volume(&mut self, volume: u32) {
        if self.volume.is_none() {
            self.volume = Some(volume);
        }
    }

    /// Drop the assignment ahead of a fresh segmentation run
    pub(crate) fn clear_volume(&mut self) {
        self.volume = None;
    }

    pub fn has_filename(&self, long_path: &str) -> bool {
        self.filenames.iter().any(|f| f == long_path)
    }

    /// Add another logical filename; returns `false` if it was already present
    pub(crate) fn add_filename(&mut self, long_path: String) -> bool {
        if self.has_filename(&long_path) {
            return false;
        }
        self.filenames.push(long_path);
        true
    }

    /// Every logical filename with its derived short path, canonical first
    pub fn links(&self) -> impl Iterator<Item = TargetPath> + '_ {
        self.filenames.iter().map(|long| TargetPath {
            short_path: iso9660_path(long),
            long_path: long.clone(),
        })
    }
}
