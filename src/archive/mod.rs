//! Archive lifecycle
//!
//! [`Archiver`] owns the file inventory and the hash index of one archiving
//! run and moves them through
//! `Empty -> FileScanned -> Deduplicated -> Segmented`. Locking is a separate
//! one-way flag that freezes the volume layout.

mod catalogue;
mod disc_info;
pub mod snapshot;
mod writer;

pub use catalogue::{Catalogue, SegmentInfo, CLIENT_NAME, CLIENT_VERSION};
pub use disc_info::DiscInfo;
pub use writer::{ImageWriter, StagingWriter, VolumeFile, VolumeRequest, WriterError};

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ArchiveConfig;
use crate::error::{ArchiveError, Result};
use crate::model::Capacity;
use crate::repository::scanner::{ProgressReporter, VerboseProgress};
use crate::repository::{FileDatabase, HashDatabase, ScanDelta, CATALOGUE_VERSION};
use crate::util::format_thousands;

/// Lifecycle stage derived from what the archiver currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    Empty,
    FileScanned,
    Deduplicated,
    Segmented,
}

impl fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveState::Empty => "empty",
            ArchiveState::FileScanned => "file scanned",
            ArchiveState::Deduplicated => "deduplicated",
            ArchiveState::Segmented => "segmented",
        };
        f.write_str(name)
    }
}

/// What one `write_iso` pass did (or would do) for a volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSummary {
    pub volume: u32,
    pub name: String,
    pub files: usize,
    pub data_size: u64,
    /// `None` for a pretend run
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Archiver {
    config: ArchiveConfig,
    file_db: Option<FileDatabase>,
    hash_db: Option<HashDatabase>,
    guid: Option<Uuid>,
    locked: bool,
}

impl Archiver {
    pub fn new(config: ArchiveConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Durable identity, assigned by the first successful [`Archiver::save`]
    pub fn guid(&self) -> Option<Uuid> {
        self.guid
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn version(&self) -> u32 {
        CATALOGUE_VERSION
    }

    pub fn file_database(&self) -> Option<&FileDatabase> {
        self.file_db.as_ref()
    }

    pub fn hash_database(&self) -> Option<&HashDatabase> {
        self.hash_db.as_ref()
    }

    pub fn state(&self) -> ArchiveState {
        match (&self.file_db, &self.hash_db) {
            (_, Some(db)) if db.is_segmented() => ArchiveState::Segmented,
            (_, Some(_)) => ArchiveState::Deduplicated,
            (Some(_), None) => ArchiveState::FileScanned,
            (None, None) => ArchiveState::Empty,
        }
    }

    fn progress(&self) -> VerboseProgress {
        VerboseProgress::new(self.config.verbose)
    }

    /// Scan `root` into a fresh file inventory.
    ///
    /// Replaces any earlier inventory and drops the hash index built from it.
    pub fn create_file_database(&mut self, root: impl AsRef<Path>) -> Result<()> {
        if self.locked {
            return Err(ArchiveError::invalid_state(
                "archive is locked; cannot replace its file database",
            ));
        }
        let file_db = FileDatabase::from_scan(root)?;
        info!(
            root = %file_db.root().display(),
            files = file_db.len(),
            "file database created"
        );
        self.file_db = Some(file_db);
        self.hash_db = None;
        Ok(())
    }

    /// Rescan the existing file inventory
    pub fn rescan(&mut self) -> Result<ScanDelta> {
        let file_db = self
            .file_db
            .as_mut()
            .ok_or_else(|| ArchiveError::invalid_state("no file database to rescan"))?;
        file_db.update()
    }

    /// Hash whatever is missing and fold the inventory into the hash index.
    ///
    /// When the resulting content matches the current index nothing changes,
    /// so this is safe to repeat. Changed content replaces the index and drops
    /// its segmentation, which a locked archive refuses.
    pub fn convert_to_hash_database(&mut self) -> Result<()> {
        let progress = self.progress();
        let file_db = self.file_db.as_mut().ok_or_else(|| {
            ArchiveError::invalid_state("create a file database before deduplicating")
        })?;
        file_db.calculate_file_hash(&progress)?;
        let candidate = HashDatabase::from_file_database(file_db, &self.config.target_root)?;

        match &self.hash_db {
            Some(current) if current.same_content(&candidate) => {
                debug!("hash database unchanged");
                return Ok(());
            }
            Some(_) if self.locked => {
                return Err(ArchiveError::invalid_state(
                    "archive is locked; its content can no longer change",
                ));
            }
            Some(_) => info!("content changed, rebuilding hash database"),
            None => {}
        }

        info!(
            blobs = candidate.len(),
            files = candidate.num_files(),
            bytes = candidate.total_size(),
            "hash database built"
        );
        self.hash_db = Some(candidate);
        Ok(())
    }

    /// Assign every blob to a volume of the given capacity
    pub fn segment(&mut self, capacity: Capacity) -> Result<()> {
        if self.locked {
            return Err(ArchiveError::invalid_state(
                "archive is locked; segmentation is final",
            ));
        }
        let hash_db = self.hash_db.as_mut().ok_or_else(|| {
            ArchiveError::invalid_state("deduplicate before segmenting")
        })?;
        hash_db.segment(capacity)?;
        self.refresh_catalogue_size()?;
        Ok(())
    }

    /// Freeze the volume layout for good
    pub fn lock(&mut self) -> Result<()> {
        if self.hash_db.is_none() {
            return Err(ArchiveError::invalid_state(
                "nothing to lock before deduplication",
            ));
        }
        if !self.locked {
            info!("archive locked");
        }
        self.locked = true;
        Ok(())
    }

    /// The catalogue as it would be written now
    pub fn catalogue(&self) -> Result<Catalogue> {
        let hash_db = self
            .hash_db
            .as_ref()
            .ok_or_else(|| ArchiveError::invalid_state("no hash database to catalogue"))?;
        Ok(Catalogue {
            client_name: CLIENT_NAME.to_string(),
            client_version: CLIENT_VERSION.to_string(),
            guid: self.guid,
            version: CATALOGUE_VERSION,
            is_segmented: hash_db.is_segmented(),
            locked: self.locked,
            source_root: hash_db.source_root().to_path_buf(),
            target_root: hash_db.target_root().to_string(),
            segment: hash_db.segmentation().map(SegmentInfo::from),
            hash_db: hash_db.to_table(),
        })
    }

    pub fn catalogue_json(&self) -> Result<String> {
        self.catalogue()?.to_json()
    }

    fn refresh_catalogue_size(&mut self) -> Result<()> {
        let size = self.catalogue_json()?.len() as u64;
        if let Some(hash_db) = self.hash_db.as_mut() {
            hash_db.set_catalogue_size(Some(size));
        }
        Ok(())
    }

    /// Write the catalogue and snapshot into the configured work directory.
    ///
    /// Requires every file to be hashed. The first successful save assigns
    /// the GUID; later saves keep it. Returns the catalogue path.
    pub fn save(&mut self) -> Result<PathBuf> {
        if self.hash_db.is_none() {
            return Err(ArchiveError::invalid_state(
                "no hashes computed yet; deduplicate before saving",
            ));
        }
        if self.file_db.as_ref().is_some_and(|db| !db.is_hashed()) {
            return Err(ArchiveError::invalid_state(
                "file database has unhashed entries; deduplicate before saving",
            ));
        }

        let previous = self.guid;
        self.guid = Some(previous.unwrap_or_else(Uuid::new_v4));
        match self.persist() {
            Ok(path) => {
                info!(guid = ?self.guid, path = %path.display(), "archive saved");
                Ok(path)
            }
            Err(err) => {
                self.guid = previous;
                Err(err)
            }
        }
    }

    fn persist(&mut self) -> Result<PathBuf> {
        self.refresh_catalogue_size()?;
        let json = self.catalogue_json()?;
        std::fs::create_dir_all(&self.config.work_dir)
            .map_err(|e| ArchiveError::from_io(e, &self.config.work_dir))?;
        let path = self.config.catalogue_path();
        std::fs::write(&path, json.as_bytes()).map_err(|e| ArchiveError::from_io(e, &path))?;
        snapshot::write(self, &self.config.snapshot_path())?;
        Ok(path)
    }

    /// Rebuild an archiver from a catalogue file
    pub fn load_from_json(path: impl AsRef<Path>, config: ArchiveConfig) -> Result<Self> {
        Self::from_catalogue(Catalogue::load(path)?, config)
    }

    /// Rebuild an archiver from catalogue JSON text
    pub fn from_catalogue_str(json: &str, config: ArchiveConfig) -> Result<Self> {
        Self::from_catalogue(Catalogue::from_json(json)?, config)
    }

    fn from_catalogue(catalogue: Catalogue, mut config: ArchiveConfig) -> Result<Self> {
        if catalogue.version > CATALOGUE_VERSION {
            return Err(ArchiveError::invalid_state(format!(
                "catalogue version {} is newer than supported version {}",
                catalogue.version, CATALOGUE_VERSION
            )));
        }
        let mut hash_db = HashDatabase::from_table(
            catalogue.hash_db,
            catalogue.source_root,
            &catalogue.target_root,
        )?;
        if let Some(segment) = &catalogue.segment {
            hash_db.restore_segmentation(segment.to_segmentation());
        }
        config.target_root = hash_db.target_root().to_string();

        let mut archiver = Self {
            config,
            file_db: None,
            hash_db: Some(hash_db),
            guid: catalogue.guid,
            locked: catalogue.locked,
        };
        archiver.refresh_catalogue_size()?;
        Ok(archiver)
    }

    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        snapshot::write(self, path.as_ref())
    }

    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        snapshot::read(path.as_ref())
    }

    /// Plan volumes and hand them to `writer`.
    ///
    /// With `disc_num` only that volume is produced, which requires a
    /// segmented archive. Without it every volume is produced in order; an
    /// unsegmented archive is written as one volume holding everything.
    /// `pretend` plans without calling the writer. A real write needs a
    /// saved archive and locks it afterwards.
    pub fn write_iso(
        &mut self,
        writer: &impl ImageWriter,
        pretend: bool,
        disc_num: Option<u32>,
    ) -> Result<Vec<VolumeSummary>> {
        let requests = self.plan_volumes(disc_num)?;
        if !pretend && self.guid.is_none() {
            return Err(ArchiveError::invalid_state(
                "save the archive before writing volumes",
            ));
        }

        let progress = self.progress();
        let mut summaries = Vec::with_capacity(requests.len());
        for request in &requests {
            let output = if pretend {
                info!(
                    volume = request.volume,
                    files = request.files.len(),
                    "pretend: volume {} would hold {} bytes",
                    request.name,
                    format_thousands(request.data_size())
                );
                None
            } else {
                let output = writer.write_volume(request, &progress as &dyn ProgressReporter)?;
                info!(volume = request.volume, out = %output.display(), "volume written");
                // A published volume fixes the layout even if a later one fails
                if !self.locked {
                    self.locked = true;
                    info!("archive locked after writing volume {}", request.volume);
                }
                Some(output)
            };
            summaries.push(VolumeSummary {
                volume: request.volume,
                name: request.name.clone(),
                files: request.files.len(),
                data_size: request.data_size(),
                output,
            });
        }
        Ok(summaries)
    }

    fn plan_volumes(&self, disc_num: Option<u32>) -> Result<Vec<VolumeRequest>> {
        let hash_db = self
            .hash_db
            .as_ref()
            .ok_or_else(|| ArchiveError::invalid_state("deduplicate before writing volumes"))?;
        if disc_num.is_some() && !hash_db.is_segmented() {
            return Err(ArchiveError::invalid_state(
                "a disc number needs a segmented archive",
            ));
        }

        let volumes: Vec<Option<u32>> = match disc_num {
            Some(n) => vec![Some(n)],
            None if hash_db.is_segmented() => (0..hash_db.num_volumes()).map(Some).collect(),
            None => vec![None],
        };
        if let Some(n) = disc_num {
            if n >= hash_db.num_volumes() {
                warn!(
                    "volume {} requested but the archive has {} volumes",
                    n,
                    hash_db.num_volumes()
                );
            }
        }

        let catalogue = self.catalogue_json()?.into_bytes();
        let num_volumes = hash_db.num_volumes().max(1);
        volumes
            .into_iter()
            .map(|volume| -> Result<VolumeRequest> {
                let (files, directories) = match volume {
                    Some(v) => (
                        hash_db.entries_for_volume(v).collect::<Vec<_>>(),
                        hash_db.dir_entries_for_volume(v),
                    ),
                    None => (hash_db.iter().collect(), hash_db.dir_entries()),
                };
                let number = volume.unwrap_or(0);
                let disc_info =
                    DiscInfo::new(number, num_volumes, self.guid, CATALOGUE_VERSION, &catalogue);
                Ok(VolumeRequest {
                    name: self.config.volume_name(number),
                    volume: number,
                    num_volumes,
                    files: files
                        .into_iter()
                        .flat_map(|blob| {
                            blob.links().map(move |target| VolumeFile {
                                source: blob.source().to_path_buf(),
                                target,
                                size: blob.size(),
                            })
                        })
                        .collect(),
                    directories,
                    catalogue_name: self.config.catalogue_filename.clone(),
                    catalogue: catalogue.clone(),
                    disc_info_name: self.config.disc_info_filename.clone(),
                    disc_info: disc_info.to_json()?.into_bytes(),
                })
            })
            .collect()
    }

    /// Fixed-layout report of the index and the archive identity.
    ///
    /// Before deduplication the file inventory stands in for the index. The
    /// text only depends on catalogued state, so an archiver reloaded from its
    /// catalogue reports exactly what the original did.
    pub fn get_info(&self) -> String {
        let mut out = match (&self.hash_db, &self.file_db) {
            (Some(hash_db), _) => hash_db.get_info(),
            (None, Some(file_db)) => file_db.get_info(),
            (None, None) => String::new(),
        };
        out.push_str(&format!("Database Version = {}\n", CATALOGUE_VERSION));
        match self.guid {
            Some(guid) => out.push_str(&format!("guid = {}\n", guid)),
            None => out.push_str("guid = None\n"),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("first.html"), b"first").unwrap();
        std::fs::write(dir.path().join("second.txt"), b"second").unwrap();
        std::fs::write(dir.path().join("second copy.txt"), b"second").unwrap();
        dir
    }

    fn archiver(work: &TempDir) -> Archiver {
        Archiver::new(ArchiveConfig {
            work_dir: work.path().to_path_buf(),
            ..Default::default()
        })
    }

    #[test]
    fn test_state_transitions() {
        let src = source();
        let work = TempDir::new().unwrap();
        let mut arch = archiver(&work);
        assert_eq!(arch.state(), ArchiveState::Empty);
        arch.create_file_database(src.path()).unwrap();
        assert_eq!(arch.state(), ArchiveState::FileScanned);
        arch.convert_to_hash_database().unwrap();
        assert_eq!(arch.state(), ArchiveState::Deduplicated);
        arch.segment(Capacity::Cd).unwrap();
        assert_eq!(arch.state(), ArchiveState::Segmented);
        assert_eq!(arch.state().to_string(), "segmented");
    }

    #[test]
    fn test_out_of_order_calls() {
        let work = TempDir::new().unwrap();
        let mut arch = archiver(&work);
        assert!(matches!(arch.convert_to_hash_database(), Err(ArchiveError::InvalidState(_))));
        assert!(matches!(arch.segment(Capacity::Cd), Err(ArchiveError::InvalidState(_))));
        assert!(matches!(arch.lock(), Err(ArchiveError::InvalidState(_))));
        assert!(matches!(arch.rescan(), Err(ArchiveError::InvalidState(_))));
    }

    #[test]
    fn test_convert_is_idempotent_and_keeps_segmentation() {
        let src = source();
        let work = TempDir::new().unwrap();
        let mut arch = archiver(&work);
        arch.create_file_database(src.path()).unwrap();
        arch.convert_to_hash_database().unwrap();
        arch.segment(Capacity::Cd).unwrap();
        arch.convert_to_hash_database().unwrap();
        assert_eq!(arch.state(), ArchiveState::Segmented);
        assert_eq!(arch.hash_database().unwrap().len(), 2);
    }

    #[test]
    fn test_locked_archive_rejects_content_change() {
        let src = source();
        let work = TempDir::new().unwrap();
        let mut arch = archiver(&work);
        arch.create_file_database(src.path()).unwrap();
        arch.convert_to_hash_database().unwrap();
        arch.lock().unwrap();

        std::fs::write(src.path().join("third.txt"), b"third").unwrap();
        arch.rescan().unwrap();
        assert!(matches!(arch.convert_to_hash_database(), Err(ArchiveError::InvalidState(_))));
        assert!(matches!(
            arch.create_file_database(src.path()),
            Err(ArchiveError::InvalidState(_))
        ));
    }

    #[test]
    fn test_catalogue_size_tracks_segmentation() {
        let src = source();
        let work = TempDir::new().unwrap();
        let mut arch = archiver(&work);
        arch.create_file_database(src.path()).unwrap();
        arch.convert_to_hash_database().unwrap();
        assert_eq!(arch.hash_database().unwrap().catalogue_size(), None);
        arch.segment(Capacity::Cd).unwrap();
        let size = arch.hash_database().unwrap().catalogue_size().unwrap();
        assert_eq!(size, arch.catalogue_json().unwrap().len() as u64);
    }

    #[test]
    fn test_get_info_without_data() {
        let work = TempDir::new().unwrap();
        let arch = archiver(&work);
        assert_eq!(arch.get_info(), "Database Version = 2\nguid = None\n");
    }
}
