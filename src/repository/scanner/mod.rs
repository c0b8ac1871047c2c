//! Filesystem scanner
//!
//! Walks a source tree and hashes file contents.
//!
//! # Architecture
//!
//! The scanner is organized into layers:
//!
//! - **types**: Domain types (ScannedFile, ScanDelta)
//! - **walk**: Directory walk yielding regular files with metadata
//! - **hasher**: Parallel bulk hashing over rayon
//! - **progress**: Progress reporting abstraction

mod hasher;
pub(crate) mod progress;
mod types;
mod walk;

pub use hasher::{hash_entries, HashOutcome};
pub use progress::{
    IndicatifProgress, NoopProgress, ProgressHandle, ProgressReporter, ProgressUnit,
    VerboseProgress,
};
pub use types::{ScanDelta, ScannedFile};
pub use walk::walk_files;
