//! Error types for archive operations
//!
//! Every fallible library call returns [`Result`]. The variants follow what a
//! caller can do about the failure: a vanished path ([`ArchiveError::NotFound`])
//! is recoverable per entry, while ordering mistakes ([`ArchiveError::NotUpdated`],
//! [`ArchiveError::InvalidState`]) are always surfaced.

use std::path::PathBuf;

use thiserror::Error;

use crate::archive::WriterError;

/// Archive operation result type
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// A tracked filesystem path no longer exists
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Entry was offered to the hash index before its hash was computed,
    /// or its source file has since disappeared
    #[error("file entry has not been updated (no hash or missing source): {}", .0.display())]
    NotUpdated(PathBuf),

    /// Operation forbidden by the archive lifecycle
    #[error("invalid archive state: {0}")]
    InvalidState(String),

    /// A single blob does not fit on one volume
    #[error("blob {hash} is {size} bytes, larger than the volume capacity of {capacity} bytes")]
    CapacityExceeded { hash: String, size: u64, capacity: u64 },

    /// The image writer could not find a source file
    #[error("source file missing while writing volume: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Any other image writer failure
    #[error("image writer failed: {0}")]
    WriterFailure(#[source] WriterError),

    /// Path is not located under the configured root
    #[error("path is outside of the archive root: {}", .0.display())]
    OutsideRoot(PathBuf),

    /// Capacity spec could not be parsed
    #[error("invalid volume capacity: {0}")]
    InvalidCapacity(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalogue JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl ArchiveError {
    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Map an I/O error on `path` to `NotFound` when the file is gone
    pub(crate) fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.into())
        } else {
            Self::Io(err)
        }
    }

    /// Returns `true` for failures scoped to a single entry that a scan can skip
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<WriterError> for ArchiveError {
    fn from(err: WriterError) -> Self {
        match err {
            WriterError::PathNotFound(path) => Self::SourceNotFound(path),
            other => Self::WriterFailure(other),
        }
    }
}
