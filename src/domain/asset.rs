//! Photo assets as enumerated by a library source.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, stable identifier of an asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A single photo in the library.
///
/// Assets are owned by the library source; the review core only keeps
/// read-only copies of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Stable identifier
    pub id: AssetId,

    /// When the photo was created
    pub created_at: DateTime<Utc>,

    /// Backing file, for file-based libraries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,
}

impl Asset {
    /// Create an asset without a backing file
    pub fn new(id: impl Into<AssetId>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            location: None,
        }
    }

    /// Attach the file this asset was read from
    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }
}

/// Sort assets newest first. Ties keep their relative order.
pub fn sort_newest_first(assets: &mut [Asset]) {
    assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sort_newest_first_is_stable() {
        let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap();

        let mut assets = vec![
            Asset::new("a", older),
            Asset::new("b", newer),
            Asset::new("c", older),
        ];
        sort_newest_first(&mut assets);

        let ids: Vec<&str> = assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_asset_id_serializes_as_plain_string() {
        let asset = Asset::new("IMG_0001", Utc::now());
        let json = serde_json::to_value(&asset).unwrap();

        assert_eq!(json["id"], "IMG_0001");
        assert!(json.get("location").is_none());
    }
}
