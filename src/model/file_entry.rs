use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use time::OffsetDateTime;

use crate::error::{ArchiveError, Result};
use crate::util::relative_key;

/// Read size used when streaming file contents through the hasher
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// A single file observed on the source filesystem.
///
/// Entries compare equal when their content hashes are equal. Before
/// [`FileEntry::calculate_hash`] has run the hash is the empty string, so
/// all never-hashed entries compare equal to each other regardless of path.
///
/// The volume number is write-once: [`FileEntry::set_volume`] only takes
/// effect while the volume is unset and silently keeps the first value
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    path: PathBuf,
    relative: String,
    size: u64,
    modified: OffsetDateTime,
    hash: String,
    volume: Option<u32>,
}

impl FileEntry {
    /// Create an entry for `path`, which must live under `root`.
    ///
    /// Metadata is not read here; call [`FileEntry::update`] for that.
    pub fn new(root: &Path, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let relative = path
            .strip_prefix(root)
            .ok()
            .and_then(relative_key)
            .ok_or_else(|| ArchiveError::OutsideRoot(path.clone()))?;
        Ok(Self {
            path,
            relative,
            size: 0,
            modified: OffsetDateTime::UNIX_EPOCH,
            hash: String::new(),
            volume: None,
        })
    }

    /// Create an entry with a volume number already assigned
    pub fn with_volume(root: &Path, path: impl Into<PathBuf>, volume: u32) -> Result<Self> {
        let mut entry = Self::new(root, path)?;
        entry.volume = Some(volume);
        Ok(entry)
    }

    /// Build an entry from metadata already gathered by a directory walk
    pub(crate) fn from_parts(
        path: PathBuf,
        relative: String,
        size: u64,
        modified: OffsetDateTime,
    ) -> Self {
        Self {
            path,
            relative,
            size,
            modified,
            hash: String::new(),
            volume: None,
        }
    }

    /// Absolute filesystem path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the scan root, `/`-separated
    pub fn relative_path(&self) -> &str {
        &self.relative
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> OffsetDateTime {
        self.modified
    }

    /// Hex-encoded SHA-512 of the contents, empty until computed
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn is_hashed(&self) -> bool {
        !self.hash.is_empty()
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

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Re-read size and modification time from the filesystem.
    pub fn update(&mut self) -> Result<()> {
        let metadata =
            std::fs::metadata(&self.path).map_err(|e| ArchiveError::from_io(e, &self.path))?;
        self.size = metadata.len();
        self.modified = metadata
            .modified()
            .map(OffsetDateTime::from)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        Ok(())
    }

    /// Stream the file through SHA-512 and store the hex digest.
    ///
    /// Touches only this entry, so distinct entries can be hashed in parallel.
    pub fn calculate_hash(&mut self) -> Result<()> {
        self.hash = hash_file(&self.path)?;
        Ok(())
    }

    /// Re-hash the file and check it still matches the stored hash.
    ///
    /// Entries that were never hashed are hashed now and verify trivially.
    pub fn verify(&mut self) -> Result<bool> {
        if !self.is_hashed() {
            self.calculate_hash()?;
            return Ok(true);
        }
        Ok(hash_file(&self.path)? == self.hash)
    }

    /// Forget the stored hash so the next bulk pass recomputes it
    pub(crate) fn clear_hash(&mut self) {
        self.hash.clear();
    }

    pub(crate) fn set_metadata(&mut self, size: u64, modified: OffsetDateTime) {
        self.size = size;
        self.modified = modified;
    }
}

/// Hex-encoded SHA-512 of a file, read in fixed-size chunks
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| ArchiveError::from_io(e, path))?;
    let mut hasher = Sha512::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hex-encoded SHA-512 of an in-memory buffer
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha512::digest(bytes))
}

impl PartialEq for FileEntry {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for FileEntry {}

impl Hash for FileEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
