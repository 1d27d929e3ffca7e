//! Stored path forms as recorded by the host document.

use std::fmt;
use std::path::{Path, PathBuf};

/// Marker that makes a stored path relative to the project directory.
pub const PROJECT_PREFIX: &str = "//";

/// A path exactly as the host stores it, classified once.
///
/// ```text
/// "//textures/wood.png"   -> ProjectRelative("textures/wood.png")
/// "/mnt/lib/rock.exr"     -> Absolute("/mnt/lib/rock.exr")
/// "textures/wood.png"     -> ProjectRelative("textures/wood.png")
/// ```
///
/// A relative path without the prefix is treated as project-relative: there
/// is no other directory it could meaningfully be relative to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoredPath {
    Absolute(PathBuf),
    ProjectRelative(PathBuf),
}

impl StoredPath {
    /// Classify a raw host path string.
    ///
    /// After the `//` prefix both `/` and `\` separate components, since
    /// documents saved on Windows store backslashes.
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix(PROJECT_PREFIX) {
            return Self::ProjectRelative(split_components(rest));
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            Self::Absolute(path.to_path_buf())
        } else {
            Self::ProjectRelative(split_components(raw))
        }
    }

    /// True if resolution needs a project base directory.
    pub const fn is_project_relative(&self) -> bool {
        matches!(self, Self::ProjectRelative(_))
    }

    /// The path part without any prefix.
    pub fn as_path(&self) -> &Path {
        match self {
            Self::Absolute(p) | Self::ProjectRelative(p) => p,
        }
    }

    /// File name of the referenced file, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.as_path().file_name().and_then(|n| n.to_str())
    }

    /// Render back to the host's string form (forward slashes after `//`).
    pub fn to_raw(&self) -> String {
        match self {
            Self::Absolute(p) => p.to_string_lossy().into_owned(),
            Self::ProjectRelative(p) => {
                let parts: Vec<_> = p.iter().map(|c| c.to_string_lossy()).collect();
                format!("{PROJECT_PREFIX}{}", parts.join("/"))
            }
        }
    }
}

impl fmt::Display for StoredPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

/// Split on both separator styles and rebuild with the native one.
fn split_components(rel: &str) -> PathBuf {
    rel.split(['/', '\\']).filter(|part| !part.is_empty()).collect()
}
