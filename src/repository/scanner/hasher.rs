//! Parallel bulk hashing
//!
//! Each entry is hashed on the rayon pool with exclusive access to its own
//! `FileEntry`. Results are collected before anything shared is touched.

use rayon::prelude::*;
use tracing::debug;

use super::progress::{ProgressReporter, ProgressUnit};
use crate::error::{ArchiveError, Result};
use crate::model::FileEntry;

/// Outcome of one bulk hashing pass
#[derive(Debug, Default)]
pub struct HashOutcome {
    /// Entries whose hash was computed
    pub hashed: usize,
    /// Relative paths whose file disappeared before it could be read
    pub vanished: Vec<String>,
}

/// Hash every entry in `entries` concurrently.
///
/// A vanished file is recorded in [`HashOutcome::vanished`] instead of
/// failing the pass. Any other error aborts with the first failure in
/// input order.
pub fn hash_entries(
    entries: Vec<&mut FileEntry>,
    progress: &dyn ProgressReporter,
) -> Result<HashOutcome> {
    let total: u64 = entries.iter().map(|e| e.size()).sum();
    let pb = progress.start("Hashing", total, ProgressUnit::Bytes);

    let results: Vec<(String, Result<()>)> = entries
        .into_par_iter()
        .map(|entry| {
            let result = entry.calculate_hash();
            pb.inc(entry.size());
            (entry.relative_path().to_string(), result)
        })
        .collect();

    pb.finish();

    let mut outcome = HashOutcome::default();
    for (relative, result) in results {
        match result {
            Ok(()) => outcome.hashed += 1,
            Err(ArchiveError::NotFound(_)) => outcome.vanished.push(relative),
            Err(err) => return Err(err),
        }
    }
    debug!(
        hashed = outcome.hashed,
        vanished = outcome.vanished.len(),
        "hashing pass finished"
    );
    Ok(outcome)
}
