//! Directory walk producing regular files with their metadata

use std::path::Path;

use time::OffsetDateTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::types::ScannedFile;
use crate::error::{ArchiveError, Result};
use crate::util::relative_key;

/// Walk `root` and return every regular file below it, sorted by path.
///
/// Symlinks are not followed and are skipped along with other non-regular
/// files. Entries that vanish or become unreadable mid-walk are logged and
/// skipped; only a failure on `root` itself aborts the walk.
pub fn walk_files(root: &Path) -> Result<Vec<ScannedFile>> {
    let mut files = Vec::new();
    let mut skipped = 0usize;

    for item in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(ArchiveError::from_io(err.into(), root));
            }
            Err(err) => {
                warn!("skipping unreadable path: {}", err);
                skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("skipping {}: {}", entry.path().display(), err);
                skipped += 1;
                continue;
            }
        };
        let Some(relative) = entry.path().strip_prefix(root).ok().and_then(relative_key) else {
            continue;
        };

        files.push(ScannedFile {
            path: entry.path().to_path_buf(),
            relative,
            size: metadata.len(),
            modified: metadata
                .modified()
                .map(OffsetDateTime::from)
                .unwrap_or(OffsetDateTime::UNIX_EPOCH),
        });
    }

    debug!(
        root = %root.display(),
        files = files.len(),
        skipped,
        "directory walk finished"
    );
    Ok(files)
}
