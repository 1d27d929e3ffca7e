//! Path resolution between stored path forms and canonical absolute paths.
//!
//! - [`stored`]: the tagged `StoredPath` form (`//` project-relative or absolute)
//! - [`normalize`]: lexical + symlink normalization
//! - [`resolve`] / [`reduce_to_relative`]: the two directions, which
//!   round-trip for every path under the base

mod normalize;
mod stored;

pub use normalize::{normalize_lexical, normalize_path};
pub use stored::{PROJECT_PREFIX, StoredPath};

use std::path::{Component, Path, PathBuf};

use crate::error::CollectError;

/// Resolve a stored path to a canonical absolute path.
///
/// Project-relative paths join `base`; absolute paths are used as-is.
/// Both are normalized afterwards.
///
/// # Errors
///
/// [`CollectError::Unresolvable`] when the path is project-relative and
/// `base` is `None` (document never saved).
pub fn resolve(stored: &StoredPath, base: Option<&Path>) -> Result<PathBuf, CollectError> {
    match stored {
        StoredPath::Absolute(path) => Ok(normalize_path(path)),
        StoredPath::ProjectRelative(rel) => {
            let base = base.ok_or_else(|| CollectError::unsaved(stored.to_raw()))?;
            Ok(normalize_path(&base.join(rel)))
        }
    }
}

/// Express `path` relative to `base` in stored form.
///
/// Returns `//sub/file.ext` (always forward slashes) when `path` lies under
/// `base`, otherwise the normalized absolute path string. References on
/// another volume are never forced relative.
pub fn reduce_to_relative(path: &Path, base: &Path) -> String {
    let path = normalize_path(path);
    let base = normalize_path(base);

    match path.strip_prefix(&base) {
        Ok(rel) => {
            let parts: Vec<_> = rel
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy()),
                    _ => None,
                })
                .collect();
            format!("{PROJECT_PREFIX}{}", parts.join("/"))
        }
        Err(_) => path.to_string_lossy().into_owned(),
    }
}
