//! Reference scanning.
//!
//! Turns the host's raw enumeration into a [`ReferenceGraph`]: every record
//! is classified once (stored form, resolved path, existence, size) so the
//! later stages never touch the host or stat files again.
//!
//! # Filtering
//!
//! | Record                                | Result                 |
//! |---------------------------------------|------------------------|
//! | empty path / `<builtin>`, not embedded | skipped (no file)      |
//! | `is_used == false` + `exclude_unused`  | dropped                |
//! | anything else                          | kept, even if missing  |

mod graph;

pub use graph::{AssetReference, ReferenceGraph, ScanSummary};

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::error::CollectError;
use crate::host::{HostDocument, RawReference, ReferenceId};
use crate::path::{StoredPath, resolve};

/// Path the host reports for data that has no backing file.
const BUILTIN_SENTINEL: &str = "<builtin>";

/// Scanner options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Drop references the host does not classify as used.
    pub exclude_unused: bool,
}

/// Scan the host document's current references.
pub fn scan_host(
    host: &dyn HostDocument,
    options: ScanOptions,
) -> Result<ReferenceGraph, CollectError> {
    let base = host.project_base_dir();
    scan(host.enumerate_references(), base.as_deref(), options)
}

/// Build a reference graph from raw host records.
///
/// Record `i` gets `ReferenceId(i)`, so ids stay aligned with the host
/// enumeration even when records are skipped.
///
/// # Errors
///
/// [`CollectError::Unresolvable`] when `base` is `None` and a kept,
/// non-embedded record is project-relative. Checked before any file I/O.
pub fn scan(
    records: Vec<RawReference>,
    base: Option<&Path>,
    options: ScanOptions,
) -> Result<ReferenceGraph, CollectError> {
    let kept: Vec<_> = records
        .into_iter()
        .enumerate()
        .filter(|(_, raw)| has_backing_file(raw))
        .filter(|(_, raw)| raw.is_used || !options.exclude_unused)
        .map(|(i, raw)| {
            let stored = StoredPath::parse(&raw.stored_path);
            (ReferenceId(i), raw, stored)
        })
        .collect();

    if base.is_none() {
        let unresolvable = kept
            .iter()
            .find(|(_, raw, stored)| !raw.is_embedded && stored.is_project_relative());
        if let Some((_, raw, _)) = unresolvable {
            return Err(CollectError::unsaved(raw.stored_path.clone()));
        }
    }

    let mut stats = StatCache::default();
    let references = kept
        .into_iter()
        .map(|(id, raw, stored)| {
            let resolved_path = if raw.stored_path.is_empty() {
                None
            } else {
                resolve(&stored, base).ok()
            };
            let size = resolved_path.as_deref().and_then(|p| stats.file_size(p));

            AssetReference {
                id,
                category: raw.category,
                stored_path: stored,
                resolved_path,
                datablock_name: raw.datablock_name,
                is_embedded: raw.is_embedded,
                is_used: raw.is_used,
                exists: size.is_some(),
                size: size.unwrap_or(0),
                content_hash: None,
            }
        })
        .collect();

    let graph = ReferenceGraph::new(base.map(Path::to_path_buf), references);
    crate::debug!("scan"; "{}", graph.summary());
    Ok(graph)
}

/// Embedded data always counts; otherwise there must be a real path.
fn has_backing_file(raw: &RawReference) -> bool {
    raw.is_embedded || !(raw.stored_path.is_empty() || raw.stored_path == BUILTIN_SENTINEL)
}

/// One `stat` per distinct path.
#[derive(Default)]
struct StatCache {
    seen: FxHashMap<PathBuf, Option<u64>>,
}

impl StatCache {
    /// Size of a regular file, `None` if absent or not a file.
    fn file_size(&mut self, path: &Path) -> Option<u64> {
        *self.seen.entry(path.to_path_buf()).or_insert_with(|| {
            fs::metadata(path)
                .ok()
                .filter(fs::Metadata::is_file)
                .map(|meta| meta.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AssetCategory;
    use crate::host::MemoryDocument;
    use crate::path::normalize_path;
    use tempfile::TempDir;

    fn image(name: &str, path: &str) -> RawReference {
        RawReference::new(AssetCategory::Image, name, path)
    }

    fn project() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let base = normalize_path(dir.path());
        fs::create_dir_all(base.join("textures")).unwrap();
        fs::write(base.join("textures/wood.png"), b"wood").unwrap();
        (dir, base)
    }

    #[test]
    fn test_scan_classifies_existing_and_missing() {
        let (_dir, base) = project();
        let records = vec![image("Wood", "//textures/wood.png"), image("Gone", "//gone.png")];
        let graph = scan(records, Some(&base), ScanOptions::default()).unwrap();

        let wood = graph.get(ReferenceId(0)).unwrap();
        assert!(wood.exists);
        assert_eq!(wood.size, 4);
        assert_eq!(wood.resolved_path, Some(base.join("textures/wood.png")));

        let gone = graph.get(ReferenceId(1)).unwrap();
        assert!(!gone.exists);
        assert_eq!(gone.size, 0);
        assert_eq!(gone.resolved_path, Some(base.join("gone.png")));
    }

    #[test]
    fn test_exclude_unused_drops_orphans() {
        let (_dir, base) = project();
        let records = vec![
            image("Wood", "//textures/wood.png"),
            image("Orphan", "//textures/wood.png").unused(),
        ];

        let all = scan(records.clone(), Some(&base), ScanOptions::default()).unwrap();
        assert_eq!(all.len(), 2);

        let used = scan(records, Some(&base), ScanOptions { exclude_unused: true }).unwrap();
        assert_eq!(used.len(), 1);
        assert!(used.get(ReferenceId(1)).is_none());
    }

    #[test]
    fn test_unsaved_with_relative_path_aborts() {
        let records = vec![image("Abs", "/tmp/a.png"), image("Rel", "//b.png")];
        let err = scan(records, None, ScanOptions::default()).unwrap_err();
        assert!(matches!(err, CollectError::Unresolvable { ref path, .. } if path == "//b.png"));
    }

    #[test]
    fn test_unsaved_with_only_absolute_paths_scans() {
        let (_dir, base) = project();
        let abs = base.join("textures/wood.png");
        let records = vec![image("Wood", abs.to_str().unwrap())];
        let graph = scan(records, None, ScanOptions::default()).unwrap();
        assert!(graph.get(ReferenceId(0)).unwrap().exists);
        assert!(graph.project_base().is_none());
    }

    #[test]
    fn test_unsaved_ignores_embedded_relative() {
        let records = vec![image("Packed", "//packed.png").embedded()];
        let graph = scan(records, None, ScanOptions::default()).unwrap();
        let packed = graph.get(ReferenceId(0)).unwrap();
        assert!(packed.is_embedded);
        assert!(packed.resolved_path.is_none());
    }

    #[test]
    fn test_builtin_and_empty_skipped_ids_preserved() {
        let (_dir, base) = project();
        let records = vec![
            RawReference::new(AssetCategory::Font, "Bfont", BUILTIN_SENTINEL),
            image("Generated", ""),
            image("Wood", "//textures/wood.png"),
        ];
        let graph = scan(records, Some(&base), ScanOptions::default()).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.iter().next().unwrap().id, ReferenceId(2));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let (_dir, base) = project();
        let records = vec![RawReference::new(AssetCategory::Cache, "Dir", "//textures")];
        let graph = scan(records, Some(&base), ScanOptions::default()).unwrap();
        assert!(!graph.get(ReferenceId(0)).unwrap().exists);
    }

    #[test]
    fn test_scan_host_uses_document_base() {
        let (_dir, base) = project();
        let mut doc = MemoryDocument::saved_at(base.join("scene.json"));
        doc.push(image("Wood", "//textures/wood.png"));

        let graph = scan_host(&doc, ScanOptions::default()).unwrap();
        assert_eq!(graph.project_base(), Some(base.as_path()));
        assert!(graph.get(ReferenceId(0)).unwrap().exists);
    }
}
