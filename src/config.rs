//! Archiver configuration
//!
//! Loaded from `<config_dir>/discarchive/config.toml` when present. Every
//! field is optional in the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};
use crate::model::Capacity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory inside every volume that holds the archived tree
    pub target_root: String,
    pub catalogue_filename: String,
    pub disc_info_filename: String,
    pub snapshot_filename: String,
    /// Volume output names are this prefix plus the volume number
    pub volume_prefix: String,
    /// Where `save()` writes the catalogue and snapshot
    pub work_dir: PathBuf,
    pub default_capacity: Capacity,
    /// Draw progress bars
    pub verbose: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            target_root: "/DATA".to_string(),
            catalogue_filename: "catalogue.json".to_string(),
            disc_info_filename: "disc_info.json".to_string(),
            snapshot_filename: "archiver.snapshot".to_string(),
            volume_prefix: "new".to_string(),
            work_dir: PathBuf::from("."),
            default_capacity: Capacity::Bd,
            verbose: false,
        }
    }
}

impl ArchiveConfig {
    /// Read a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ArchiveError::from_io(e, path))?;
        Ok(toml::from_str(&text)?)
    }

    /// Default config location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("discarchive").join("config.toml"))
    }

    /// Load the default config file, falling back to defaults when absent
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn catalogue_path(&self) -> PathBuf {
        self.work_dir.join(&self.catalogue_filename)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.work_dir.join(&self.snapshot_filename)
    }

    pub fn volume_name(&self, volume: u32) -> String {
        format!("{}{}", self.volume_prefix, volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ArchiveConfig::default();
        assert_eq!(config.target_root, "/DATA");
        assert_eq!(config.default_capacity, Capacity::Bd);
        assert_eq!(config.catalogue_path(), PathBuf::from("./catalogue.json"));
        assert_eq!(config.volume_name(3), "new3");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_capacity = \"cd\"\nwork_dir = \"/tmp/arch\"\n").unwrap();
        let config = ArchiveConfig::load(&path).unwrap();
        assert_eq!(config.default_capacity, Capacity::Cd);
        assert_eq!(config.work_dir, PathBuf::from("/tmp/arch"));
        assert_eq!(config.target_root, "/DATA");
    }

    #[test]
    fn test_bad_capacity_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_capacity = \"floppy\"\n").unwrap();
        assert!(matches!(ArchiveConfig::load(&path), Err(ArchiveError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ArchiveConfig::load(dir.path().join("none.toml")).unwrap_err();
        assert!(err.is_not_found());
    }
}
