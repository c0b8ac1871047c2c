use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// 360,000 sectors of 2048 bytes
pub const CD_CAPACITY: u64 = 737_280_000;
/// Single-layer DVD: 2,295,104 sectors of 2048 bytes
pub const DVD_CAPACITY: u64 = 4_700_372_992;
/// Single-layer Blu-ray
pub const BD_CAPACITY: u64 = 25_000_000_000;

/// Volume capacity: a named medium or an explicit byte count
///
/// Serialized as its class label (`"cd"`, `"dvd"`, `"bd"` or a byte count).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Capacity {
    Cd,
    Dvd,
    #[default]
    Bd,
    Custom(u64),
}

impl Capacity {
    /// Usable bytes per volume
    pub fn bytes(self) -> u64 {
        match self {
            Capacity::Cd => CD_CAPACITY,
            Capacity::Dvd => DVD_CAPACITY,
            Capacity::Bd => BD_CAPACITY,
            Capacity::Custom(bytes) => bytes,
        }
    }

    /// Class label used in reports and the catalogue
    pub fn class(self) -> String {
        match self {
            Capacity::Cd => "cd".to_string(),
            Capacity::Dvd => "dvd".to_string(),
            Capacity::Bd => "bd".to_string(),
            Capacity::Custom(bytes) => bytes.to_string(),
        }
    }
}

impl From<u64> for Capacity {
    fn from(bytes: u64) -> Self {
        Capacity::Custom(bytes)
    }
}

impl FromStr for Capacity {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cd" => Ok(Capacity::Cd),
            "dvd" => Ok(Capacity::Dvd),
            "bd" => Ok(Capacity::Bd),
            other => match other.replace(['_', ','], "").parse::<u64>() {
                Ok(0) | Err(_) => Err(ArchiveError::InvalidCapacity(s.to_string())),
                Ok(bytes) => Ok(Capacity::Custom(bytes)),
            },
        }
    }
}

impl TryFrom<String> for Capacity {
    type Error = ArchiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Capacity> for String {
    fn from(capacity: Capacity) -> Self {
        capacity.class()
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class())
    }
}
