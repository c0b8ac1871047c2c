//! Multi-volume optical archiving with content deduplication.
//!
//! A source tree is scanned into a [`repository::FileDatabase`], folded by
//! SHA-512 into a [`repository::HashDatabase`], packed onto fixed-capacity
//! volumes and described by a versioned catalogue. [`archive::Archiver`]
//! drives the whole lifecycle.

pub mod archive;
pub mod config;
pub mod error;
pub mod model;
pub mod repository;
pub mod util;

pub use archive::{ArchiveState, Archiver, ImageWriter, StagingWriter};
pub use config::ArchiveConfig;
pub use error::{ArchiveError, Result};
pub use model::Capacity;
