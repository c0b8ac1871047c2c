//! Image writer contract
//!
//! The archiver plans each volume as a [`VolumeRequest`] and hands it to an
//! [`ImageWriter`]. Writers report a missing source as
//! [`WriterError::PathNotFound`] so it can be told apart from other failures.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::model::TargetPath;
use crate::repository::scanner::{ProgressReporter, ProgressUnit};

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("source path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("invalid volume request: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One logical file placed on a volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeFile {
    /// Where the content is read from
    pub source: PathBuf,
    pub target: TargetPath,
    pub size: u64,
}

/// Everything needed to produce one volume
#[derive(Debug, Clone)]
pub struct VolumeRequest {
    /// Output name, e.g. `new0`
    pub name: String,
    pub volume: u32,
    pub num_volumes: u32,
    /// Files in blob order; aliases of one blob share a source
    pub files: Vec<VolumeFile>,
    pub directories: Vec<TargetPath>,
    pub catalogue_name: String,
    pub catalogue: Vec<u8>,
    pub disc_info_name: String,
    pub disc_info: Vec<u8>,
}

impl VolumeRequest {
    /// Bytes of unique content on this volume
    pub fn data_size(&self) -> u64 {
        let mut seen = FxHashMap::default();
        for file in &self.files {
            seen.entry(file.source.as_path()).or_insert(file.size);
        }
        seen.values().sum()
    }
}

/// Produces one volume image from a request
pub trait ImageWriter {
    /// Write the volume and return where it was written
    fn write_volume(
        &self,
        request: &VolumeRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, WriterError>;
}

/// Writes each volume as a plain directory tree under `out_dir`.
///
/// Files use their long names; the first name of a blob is copied and the
/// remaining names are hard links to it. The catalogue and disc-info files
/// sit at the volume root.
#[derive(Debug, Clone)]
pub struct StagingWriter {
    out_dir: PathBuf,
}

impl StagingWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

/// Map an absolute target path to a location below `root`
fn staged(root: &Path, target: &str) -> PathBuf {
    target
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

fn replace_with_link(original: &Path, dest: &Path) -> io::Result<()> {
    if dest.exists() {
        fs::remove_file(dest)?;
    }
    // Filesystems without hard links get a copy
    fs::hard_link(original, dest).or_else(|_| fs::copy(original, dest).map(|_| ()))
}

impl ImageWriter for StagingWriter {
    fn write_volume(
        &self,
        request: &VolumeRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, WriterError> {
        if request.files.is_empty() {
            return Err(WriterError::InvalidInput(format!(
                "volume {} has no files",
                request.volume
            )));
        }

        let root = self.out_dir.join(&request.name);
        fs::create_dir_all(&root)?;
        for dir in &request.directories {
            fs::create_dir_all(staged(&root, &dir.long_path))?;
        }
        fs::write(root.join(&request.catalogue_name), &request.catalogue)?;
        fs::write(root.join(&request.disc_info_name), &request.disc_info)?;

        let pb = progress.start(
            &format!("Writing {}", request.name),
            request.files.len() as u64,
            ProgressUnit::Files,
        );
        let mut written: FxHashMap<&Path, PathBuf> = FxHashMap::default();
        for file in &request.files {
            let dest = staged(&root, &file.target.long_path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            match written.get(file.source.as_path()) {
                Some(original) => replace_with_link(original, &dest)?,
                None => {
                    fs::copy(&file.source, &dest).map_err(|err| {
                        if err.kind() == io::ErrorKind::NotFound {
                            WriterError::PathNotFound(file.source.clone())
                        } else {
                            WriterError::Io(err)
                        }
                    })?;
                    written.insert(file.source.as_path(), dest);
                }
            }
            pb.inc(1);
        }
        pb.finish();

        debug!(
            volume = request.volume,
            files = request.files.len(),
            blobs = written.len(),
            out = %root.display(),
            "volume staged"
        );
        Ok(root)
    }
}
