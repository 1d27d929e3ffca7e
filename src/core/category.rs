//! Asset category definitions.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Set of categories, ordered so iteration and serialization are stable.
pub type CategorySet = BTreeSet<AssetCategory>;

/// Kind of external file a reference points at.
///
/// Determines the destination subfolder when the layout is not flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    /// Image textures
    Image,
    /// Audio files
    Sound,
    /// Font files
    Font,
    /// Movie clips used for tracking or compositing
    Video,
    /// Alembic, USD and other cache files
    Cache,
    /// OpenVDB volumes
    Volume,
    /// Linked library documents
    Library,
}

impl AssetCategory {
    pub const ALL: [Self; 7] = [
        Self::Image,
        Self::Sound,
        Self::Font,
        Self::Video,
        Self::Cache,
        Self::Volume,
        Self::Library,
    ];

    /// Every category.
    pub fn all() -> CategorySet {
        Self::ALL.into_iter().collect()
    }

    /// Destination subfolder name.
    pub const fn folder(self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Sound => "sounds",
            Self::Font => "fonts",
            Self::Video => "videos",
            Self::Cache => "caches",
            Self::Volume => "volumes",
            Self::Library => "libraries",
        }
    }

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Sound => "sound",
            Self::Font => "font",
            Self::Video => "video",
            Self::Cache => "cache",
            Self::Volume => "volume",
            Self::Library => "library",
        }
    }

    /// Parse a category label as hosts tend to spell it.
    ///
    /// Accepts the singular name, the folder name, and the long labels
    /// `"movie clip"` / `"cache file"`, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| {
            label == c.name()
                || label == c.folder()
                || matches!(
                    (c, label.as_str()),
                    (Self::Video, "movie clip" | "movieclip" | "movie")
                        | (Self::Cache, "cache file" | "cache_file")
                        | (Self::Image, "texture" | "textures")
                )
        })
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folders_are_distinct() {
        let folders: BTreeSet<_> = AssetCategory::ALL.iter().map(|c| c.folder()).collect();
        assert_eq!(folders.len(), AssetCategory::ALL.len());
    }

    #[test]
    fn test_from_label() {
        assert_eq!(AssetCategory::from_label("Image"), Some(AssetCategory::Image));
        assert_eq!(AssetCategory::from_label("sounds"), Some(AssetCategory::Sound));
        assert_eq!(AssetCategory::from_label("Movie Clip"), Some(AssetCategory::Video));
        assert_eq!(AssetCategory::from_label("Cache File"), Some(AssetCategory::Cache));
        assert_eq!(AssetCategory::from_label("libraries"), Some(AssetCategory::Library));
        assert_eq!(AssetCategory::from_label("mesh"), None);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&AssetCategory::Volume).unwrap();
        assert_eq!(json, "\"volume\"");
        let back: AssetCategory = serde_json::from_str("\"library\"").unwrap();
        assert_eq!(back, AssetCategory::Library);
    }

    #[test]
    fn test_all_set() {
        assert_eq!(AssetCategory::all().len(), 7);
    }
}
