use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;
use tracing::{debug, info};

use super::file_database::FileDatabase;
use super::report::{bool_label, DirStats};
use crate::error::{ArchiveError, Result};
use crate::model::{Capacity, FileEntry, HashedEntry, TargetPath};
use crate::util::{
    format_mtime, format_thousands, iso9660_dir, join_target, parent_dir, parse_mtime,
    relative_key, to_pretty_json,
};

/// Result of the last segmentation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segmentation {
    pub capacity: Capacity,
    /// Number of volumes with at least one blob
    pub num_volumes: u32,
}

/// Content-addressable index: one [`HashedEntry`] per distinct SHA-512.
///
/// Entries keep their insertion order, which is also the order segmentation
/// packs them in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashDatabase {
    source_root: PathBuf,
    target_root: String,
    entries: Vec<HashedEntry>,
    index: FxHashMap<String, usize>,
    segmentation: Option<Segmentation>,
    catalogue_size: Option<u64>,
}

impl HashDatabase {
    /// Create an empty index mapping `source_root` onto `target_root`
    pub fn new(source_root: impl Into<PathBuf>, target_root: &str) -> Self {
        Self {
            source_root: source_root.into(),
            target_root: join_target(target_root, ""),
            entries: Vec::new(),
            index: FxHashMap::default(),
            segmentation: None,
            catalogue_size: None,
        }
    }

    /// Build the index from every entry of `file_db`, in relative-path order.
    ///
    /// Every entry must already be hashed.
    pub fn from_file_database(file_db: &FileDatabase, target_root: &str) -> Result<Self> {
        let mut db = Self::new(file_db.root(), target_root);
        for entry in file_db.iter() {
            db.add_hash_file(entry)?;
        }
        debug!(
            files = file_db.len(),
            blobs = db.len(),
            "built hash database"
        );
        Ok(db)
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn target_root(&self) -> &str {
        &self.target_root
    }

    /// Fold one hashed file into the index.
    ///
    /// Returns `true` when the content was new and a blob was created, and
    /// `false` when the filename joined an existing blob (or was already
    /// present). Adding a new blob invalidates any earlier segmentation.
    pub fn add_hash_file(&mut self, entry: &FileEntry) -> Result<bool> {
        if !entry.is_hashed() || !entry.exists() {
            return Err(ArchiveError::NotUpdated(entry.path().to_path_buf()));
        }
        let relative = entry
            .path()
            .strip_prefix(&self.source_root)
            .ok()
            .and_then(relative_key)
            .ok_or_else(|| ArchiveError::OutsideRoot(entry.path().to_path_buf()))?;

        if let Some(&idx) = self.index.get(entry.hash()) {
            self.entries[idx].add_filename(join_target(&self.target_root, &relative));
            return Ok(false);
        }

        let mut blob = HashedEntry::new(
            entry.hash(),
            entry.path(),
            &self.target_root,
            &relative,
            entry.size(),
            entry.modified(),
        );
        if let Some(volume) = entry.volume() {
            blob.set_volume(volume);
        }
        self.push(blob);
        self.segmentation = None;
        Ok(true)
    }

    fn push(&mut self, blob: HashedEntry) {
        self.index.insert(blob.hash().to_string(), self.entries.len());
        self.entries.push(blob);
    }

    /// Assign every blob to a volume by first-fit in insertion order.
    ///
    /// A running byte counter starts at volume 0; a blob that would overflow
    /// the current volume opens the next one. Any earlier assignment is
    /// cleared first. Fails without touching assignments if any single blob
    /// is larger than the capacity. Returns the number of volumes used.
    pub fn segment(&mut self, capacity: Capacity) -> Result<u32> {
        let limit = capacity.bytes();
        if let Some(big) = self.entries.iter().find(|e| e.size() > limit) {
            return Err(ArchiveError::CapacityExceeded {
                hash: big.hash().to_string(),
                size: big.size(),
                capacity: limit,
            });
        }

        for entry in &mut self.entries {
            entry.clear_volume();
        }

        let mut volume = 0u32;
        let mut used = 0u64;
        for entry in &mut self.entries {
            if used + entry.size() > limit {
                volume += 1;
                used = 0;
            }
            used += entry.size();
            entry.set_volume(volume);
        }

        let num_volumes = if self.entries.is_empty() { 0 } else { volume + 1 };
        self.segmentation = Some(Segmentation {
            capacity,
            num_volumes,
        });
        info!(
            capacity = %capacity,
            blobs = self.entries.len(),
            volumes = num_volumes,
            "segmentation finished"
        );
        Ok(num_volumes)
    }

    pub fn is_segmented(&self) -> bool {
        self.segmentation.is_some()
    }

    pub fn segmentation(&self) -> Option<Segmentation> {
        self.segmentation
    }

    /// Highest assigned volume number, if segmented and non-empty
    pub fn last_volume(&self) -> Option<u32> {
        self.segmentation.and_then(|s| s.num_volumes.checked_sub(1))
    }

    pub fn num_volumes(&self) -> u32 {
        self.segmentation.map_or(0, |s| s.num_volumes)
    }

    pub(crate) fn restore_segmentation(&mut self, segmentation: Segmentation) {
        self.segmentation = Some(segmentation);
    }

    /// Byte size of the serialized catalogue, once it has been measured
    pub fn catalogue_size(&self) -> Option<u64> {
        self.catalogue_size
    }

    pub(crate) fn set_catalogue_size(&mut self, size: Option<u64>) {
        self.catalogue_size = size;
    }

    pub fn get(&self, hash: &str) -> Option<&HashedEntry> {
        self.index.get(hash).map(|&idx| &self.entries[idx])
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        self.index.contains_key(hash)
    }

    /// Whether any blob carries the given long-namespace filename
    pub fn contains_filename(&self, long_path: &str) -> bool {
        self.entries.iter().any(|e| e.has_filename(long_path))
    }

    /// Blobs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &HashedEntry> {
        self.entries.iter()
    }

    /// Blobs assigned to `volume`, in insertion order
    pub fn entries_for_volume(&self, volume: u32) -> impl Iterator<Item = &HashedEntry> {
        self.entries
            .iter()
            .filter(move |e| e.volume() == Some(volume))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes of unique content
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(HashedEntry::size).sum()
    }

    /// Logical filenames across all blobs
    pub fn num_files(&self) -> usize {
        self.entries.iter().map(|e| e.filenames().len()).sum()
    }

    pub fn largest_file(&self) -> u64 {
        self.entries.iter().map(HashedEntry::size).max().unwrap_or(0)
    }

    /// `true` when both indexes hold the same blobs with the same filenames
    /// in the same order, ignoring volume assignments
    pub fn same_content(&self, other: &HashDatabase) -> bool {
        self.target_root == other.target_root
            && self.entries.len() == other.entries.len()
            && self.entries.iter().zip(&other.entries).all(|(a, b)| {
                a.hash() == b.hash() && a.size() == b.size() && a.filenames() == b.filenames()
            })
    }

    /// Every directory needed to hold all blobs, target root included
    pub fn dir_entries(&self) -> Vec<TargetPath> {
        self.directories_of(self.entries.iter())
    }

    /// Every directory needed to hold the blobs of one volume
    pub fn dir_entries_for_volume(&self, volume: u32) -> Vec<TargetPath> {
        self.directories_of(self.entries_for_volume(volume))
    }

    fn directories_of<'a>(&self, blobs: impl Iterator<Item = &'a HashedEntry>) -> Vec<TargetPath> {
        let mut dirs = BTreeSet::new();
        dirs.insert(self.target_root.clone());
        for blob in blobs {
            for name in blob.filenames() {
                let mut dir = parent_dir(name);
                while dir != self.target_root && dir != "/" && dirs.insert(dir.to_string()) {
                    dir = parent_dir(dir);
                }
            }
        }
        dirs.into_iter()
            .map(|long_path| TargetPath {
                short_path: iso9660_dir(&long_path),
                long_path,
            })
            .collect()
    }

    /// Snapshot of the hash table as catalogue records, in insertion order
    pub fn to_table(&self) -> HashTable {
        HashTable(
            self.entries
                .iter()
                .map(|e| {
                    (
                        e.hash().to_string(),
                        HashRecord {
                            filenames: FilenameSet(e.filenames().to_vec()),
                            size: e.size(),
                            mtime: e.mtime(),
                            disc_num: e.volume(),
                        },
                    )
                })
                .collect(),
        )
    }

    /// Rebuild an index from catalogue records.
    ///
    /// Short and long paths are derived again from the first filename of
    /// each record, and the source path is that filename's position under
    /// `source_root`.
    pub fn from_table(
        table: HashTable,
        source_root: impl Into<PathBuf>,
        target_root: &str,
    ) -> Result<Self> {
        let mut db = Self::new(source_root, target_root);
        for (hash, record) in table.0 {
            let mut names = record.filenames.0.into_iter();
            let Some(first) = names.next() else {
                return Err(ArchiveError::invalid_state(format!(
                    "hash entry {} has no filenames",
                    hash
                )));
            };
            let relative = db.relative_to_target(&first)?;
            let source = relative
                .split('/')
                .fold(db.source_root.clone(), |path, part| path.join(part));
            let mut blob = HashedEntry::new(
                hash,
                source,
                &db.target_root,
                &relative,
                record.size,
                record.mtime,
            );
            for name in names {
                db.relative_to_target(&name)?;
                blob.add_filename(name);
            }
            if let Some(volume) = record.disc_num {
                blob.set_volume(volume);
            }
            if db.contains_hash(blob.hash()) {
                return Err(ArchiveError::invalid_state(format!(
                    "duplicate hash entry {}",
                    blob.hash()
                )));
            }
            db.push(blob);
        }
        Ok(db)
    }

    fn relative_to_target(&self, long_path: &str) -> Result<String> {
        let rest = if self.target_root == "/" {
            long_path.strip_prefix('/')
        } else {
            long_path
                .strip_prefix(self.target_root.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
        };
        match rest {
            Some(rest) if !rest.is_empty() => Ok(rest.to_string()),
            _ => Err(ArchiveError::OutsideRoot(PathBuf::from(long_path))),
        }
    }

    /// The hash table as pretty-printed catalogue JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(to_pretty_json(&self.to_table())?)
    }

    /// Parse a hash table written by [`HashDatabase::to_json`]
    pub fn from_json(
        json: &str,
        source_root: impl Into<PathBuf>,
        target_root: &str,
    ) -> Result<Self> {
        let table: HashTable = serde_json::from_str(json)?;
        Self::from_table(table, source_root, target_root)
    }

    /// Fixed-layout summary of the index
    pub fn get_info(&self) -> String {
        let relative_names: Vec<&str> = self
            .entries
            .iter()
            .flat_map(|e| e.filenames())
            .filter_map(|name| {
                if self.target_root == "/" {
                    name.strip_prefix('/')
                } else {
                    name.strip_prefix(self.target_root.as_str())
                        .and_then(|rest| rest.strip_prefix('/'))
                }
            })
            .collect();
        let stats = DirStats::collect(relative_names.iter().copied());

        let mut out = format!(
            "Number of entries = {}\n\
             Data size       = {} bytes\n\
             Is segmented    = {}\n\
             >>>>>>>>> For all files in all discs <<<<<<<<<<<<<<<<\n",
            self.entries.len(),
            format_thousands(self.total_size()),
            bool_label(self.is_segmented()),
        );
        if let Some(segmentation) = self.segmentation {
            out.push_str(&format!(
                "  Disc segment size = {}, {} bytes\n\
                 \x20 Catalogue size = {} bytes\n\
                 \x20 Number of discs = {}\n",
                segmentation.capacity.class(),
                format_thousands(segmentation.capacity.bytes()),
                format_thousands(self.catalogue_size.unwrap_or(0)),
                segmentation.num_volumes,
            ));
        }
        out.push_str(&format!(
            "Number of files = {}\n\
             \x20 Largest file  = {}\n\
             Number of dirs  = {}\n\
             Max dir depth   = {} (on source file system)\n \
             Dir =: {}\n",
            self.num_files(),
            format_thousands(self.largest_file()),
            stats.dirs,
            stats.max_depth,
            stats.deepest_in_target(&self.target_root),
        ));
        out
    }
}

/// One catalogue record: the filenames sharing a blob plus its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    pub filenames: FilenameSet,
    pub size: u64,
    #[serde(with = "mtime_format")]
    pub mtime: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc_num: Option<u32>,
}

/// Ordered filenames, written as a JSON object whose values are all `null`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenameSet(pub Vec<String>);

impl Serialize for FilenameSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for name in &self.0 {
            map.serialize_entry(name, &())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FilenameSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FilenameVisitor;

        impl<'de> Visitor<'de> for FilenameVisitor {
            type Value = FilenameSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of filenames")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut names = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, IgnoredAny)) = map.next_entry::<String, IgnoredAny>()? {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                Ok(FilenameSet(names))
            }
        }

        deserializer.deserialize_map(FilenameVisitor)
    }
}

/// The catalogue's hash table: hash to record, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashTable(pub Vec<(String, HashRecord)>);

impl HashTable {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for HashTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (hash, record) in &self.0 {
            map.serialize_entry(hash, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HashTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = HashTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping hashes to records")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut records = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, HashRecord>()? {
                    records.push(entry);
                }
                Ok(HashTable(records))
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

mod mtime_format {
    use super::*;

    pub fn serialize<S: Serializer>(
        mtime: &OffsetDateTime,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_mtime(*mtime))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<OffsetDateTime, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse_mtime(&value).ok_or_else(|| de::Error::custom(format!("invalid mtime: {}", value)))
    }
}
