//! The `catalogue.json` file describing every blob and its volume

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ArchiveError, Result};
use crate::model::Capacity;
use crate::repository::{HashTable, Segmentation};
use crate::util::to_pretty_json;

pub const CLIENT_NAME: &str = env!("CARGO_PKG_NAME");
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-volume layout recorded once the archive is segmented
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// Capacity class label: `cd`, `dvd`, `bd` or a byte count
    pub class: String,
    pub capacity: u64,
    pub num_discs: u32,
}

impl From<Segmentation> for SegmentInfo {
    fn from(segmentation: Segmentation) -> Self {
        Self {
            class: segmentation.capacity.class(),
            capacity: segmentation.capacity.bytes(),
            num_discs: segmentation.num_volumes,
        }
    }
}

impl SegmentInfo {
    pub fn to_segmentation(&self) -> Segmentation {
        let capacity = match self.class.parse::<Capacity>() {
            Ok(named) if named.bytes() == self.capacity => named,
            _ => Capacity::Custom(self.capacity),
        };
        Segmentation {
            capacity,
            num_volumes: self.num_discs,
        }
    }
}

/// Serialized form of an archive.
///
/// Written with [`to_pretty_json`], so the same archive always produces the
/// same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalogue {
    pub client_name: String,
    pub client_version: String,
    pub guid: Option<Uuid>,
    pub version: u32,
    pub is_segmented: bool,
    pub locked: bool,
    pub source_root: PathBuf,
    pub target_root: String,
    pub segment: Option<SegmentInfo>,
    pub hash_db: HashTable,
}

impl Catalogue {
    pub fn to_json(&self) -> Result<String> {
        Ok(to_pretty_json(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let catalogue: Catalogue = serde_json::from_str(json)?;
        if catalogue.is_segmented != catalogue.segment.is_some() {
            return Err(ArchiveError::invalid_state(
                "catalogue segmentation flag disagrees with its segment record",
            ));
        }
        Ok(catalogue)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ArchiveError::from_io(e, path))?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(segment: Option<SegmentInfo>) -> Catalogue {
        Catalogue {
            client_name: CLIENT_NAME.to_string(),
            client_version: CLIENT_VERSION.to_string(),
            guid: None,
            version: 2,
            is_segmented: segment.is_some(),
            locked: false,
            source_root: PathBuf::from("/src"),
            target_root: "/DATA".to_string(),
            segment,
            hash_db: HashTable::default(),
        }
    }

    #[test]
    fn test_field_order_and_encoding() {
        let json = sample(None).to_json().unwrap();
        let expected = format!(
            "{{\n    \"client_name\": \"{}\",\n    \"client_version\": \"{}\",\n    \"guid\": null,\n    \"version\": 2,\n    \"is_segmented\": false,\n    \"locked\": false,\n    \"source_root\": \"/src\",\n    \"target_root\": \"/DATA\",\n    \"segment\": null,\n    \"hash_db\": {{}}\n}}",
            CLIENT_NAME, CLIENT_VERSION
        );
        assert_eq!(json, expected);
    }

    #[test]
    fn test_round_trip() {
        let mut catalogue = sample(Some(SegmentInfo::from(Segmentation {
            capacity: Capacity::Cd,
            num_volumes: 2,
        })));
        catalogue.guid = Some(Uuid::new_v4());
        let parsed = Catalogue::from_json(&catalogue.to_json().unwrap()).unwrap();
        assert_eq!(parsed, catalogue);
    }

    #[test]
    fn test_segment_info_conversion() {
        let info = SegmentInfo::from(Segmentation {
            capacity: Capacity::Custom(506_145),
            num_volumes: 3,
        });
        assert_eq!(info.class, "506145");
        assert_eq!(info.to_segmentation().capacity, Capacity::Custom(506_145));

        let cd = SegmentInfo::from(Segmentation {
            capacity: Capacity::Cd,
            num_volumes: 1,
        });
        assert_eq!(cd.to_segmentation().capacity, Capacity::Cd);
    }

    #[test]
    fn test_inconsistent_segment_flag_rejected() {
        let mut catalogue = sample(None);
        catalogue.is_segmented = true;
        let err = Catalogue::from_json(&catalogue.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidState(_)));
    }
}
