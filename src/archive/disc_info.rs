use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ArchiveError, Result};
use crate::model::hash_bytes;
use crate::util::to_pretty_json;

/// Side file written onto every volume.
///
/// Identifies the volume and the catalogue it belongs to without having to
/// parse the catalogue itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscInfo {
    pub disc_num: u32,
    pub num_discs: u32,
    pub guid: Option<Uuid>,
    pub version: u32,
    /// SHA-512 of the catalogue bytes stored alongside
    pub catalogue_hash: String,
}

impl DiscInfo {
    pub fn new(
        disc_num: u32,
        num_discs: u32,
        guid: Option<Uuid>,
        version: u32,
        catalogue: &[u8],
    ) -> Self {
        Self {
            disc_num,
            num_discs,
            guid,
            version,
            catalogue_hash: hash_bytes(catalogue),
        }
    }

    /// Read a disc-info file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ArchiveError::from_io(e, path))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(to_pretty_json(self)?)
    }

    /// Whether `catalogue` is the catalogue this volume was written with
    pub fn matches_catalogue(&self, catalogue: &[u8]) -> bool {
        hash_bytes(catalogue) == self.catalogue_hash
    }
}
