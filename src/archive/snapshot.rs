//! Whole-archiver snapshot for handing state between processes
//!
//! Unlike the catalogue this keeps everything, including the file inventory
//! and derived paths. The encoding is bincode behind a format number.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Archiver;
use crate::error::{ArchiveError, Result};

/// Bumped whenever the snapshot layout changes
pub const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    format: u32,
    archiver: &'a Archiver,
}

#[derive(Deserialize)]
struct Snapshot {
    format: u32,
    archiver: Archiver,
}

fn check_format(snapshot: Snapshot) -> Result<Archiver> {
    if snapshot.format != SNAPSHOT_FORMAT {
        return Err(ArchiveError::invalid_state(format!(
            "unsupported snapshot format {} (expected {})",
            snapshot.format, SNAPSHOT_FORMAT
        )));
    }
    Ok(snapshot.archiver)
}

pub fn encode(archiver: &Archiver) -> Result<Vec<u8>> {
    Ok(bincode::serialize(&SnapshotRef {
        format: SNAPSHOT_FORMAT,
        archiver,
    })?)
}

pub fn decode(bytes: &[u8]) -> Result<Archiver> {
    check_format(bincode::deserialize(bytes)?)
}

pub fn write(archiver: &Archiver, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| ArchiveError::from_io(e, path))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(
        &mut writer,
        &SnapshotRef {
            format: SNAPSHOT_FORMAT,
            archiver,
        },
    )?;
    writer.flush()?;
    Ok(())
}

pub fn read(path: &Path) -> Result<Archiver> {
    let file = File::open(path).map_err(|e| ArchiveError::from_io(e, path))?;
    check_format(bincode::deserialize_from(BufReader::new(file))?)
}
