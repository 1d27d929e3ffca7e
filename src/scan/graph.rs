//! The in-memory reference graph produced by a scan.

use std::fmt;
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{AssetCategory, CategorySet};
use crate::hash::{ContentHash, DuplicateIndex};
use crate::host::ReferenceId;
use crate::path::StoredPath;
use crate::utils::{format_size, plural_count};

/// One external file usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub id: ReferenceId,
    pub category: AssetCategory,
    pub stored_path: StoredPath,
    /// Canonical absolute path; `None` if the path could not be resolved
    pub resolved_path: Option<PathBuf>,
    pub datablock_name: String,
    pub is_embedded: bool,
    pub is_used: bool,
    /// `resolved_path` is an existing regular file
    pub exists: bool,
    /// File size in bytes, 0 unless `exists`
    pub size: u64,
    /// Filled by [`ReferenceGraph::annotate`]
    pub content_hash: Option<ContentHash>,
}

impl AssetReference {
    /// Source path if this reference has bytes on disk to collect.
    pub fn source(&self) -> Option<&Path> {
        if self.is_embedded || !self.exists {
            return None;
        }
        self.resolved_path.as_deref()
    }

    /// File name of the referenced file, from the resolved or stored path.
    pub fn file_name(&self) -> Option<&str> {
        self.resolved_path
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .or_else(|| self.stored_path.file_name())
    }
}

/// All references of one scan, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    base: Option<PathBuf>,
    references: Vec<AssetReference>,
    index: FxHashMap<ReferenceId, usize>,
}

impl ReferenceGraph {
    pub(crate) fn new(base: Option<PathBuf>, references: Vec<AssetReference>) -> Self {
        let index = references
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.id, pos))
            .collect();
        Self {
            base,
            references,
            index,
        }
    }

    /// Project base directory the graph was resolved against.
    pub fn project_base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn get(&self, id: ReferenceId) -> Option<&AssetReference> {
        self.index.get(&id).map(|&pos| &self.references[pos])
    }

    pub fn get_mut(&mut self, id: ReferenceId) -> Option<&mut AssetReference> {
        self.index.get(&id).map(|&pos| &mut self.references[pos])
    }

    /// References in id order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetReference> {
        self.references.iter()
    }

    /// Distinct source paths with bytes on disk, sorted.
    pub fn source_paths(&self) -> Vec<&Path> {
        Self::distinct(self.references.iter().filter_map(AssetReference::source))
    }

    /// Like [`Self::source_paths`], limited to references in `categories`.
    pub fn source_paths_in(&self, categories: &CategorySet) -> Vec<&Path> {
        Self::distinct(
            self.references
                .iter()
                .filter(|r| categories.contains(&r.category))
                .filter_map(AssetReference::source),
        )
    }

    fn distinct<'a>(paths: impl Iterator<Item = &'a Path>) -> Vec<&'a Path> {
        let mut paths: Vec<_> = paths.collect();
        paths.sort_unstable();
        paths.dedup();
        paths
    }

    /// Copy content hashes from the duplicate index onto the references.
    pub fn annotate(&mut self, index: &DuplicateIndex) {
        for reference in &mut self.references {
            reference.content_hash = reference.source().and_then(|p| index.hash_of(p));
        }
    }

    /// Totals for display.
    pub fn summary(&self) -> ScanSummary {
        let mut summary = ScanSummary::default();
        let mut counted: FxHashSet<&Path> = FxHashSet::default();

        for reference in &self.references {
            summary.references += 1;
            if reference.is_embedded {
                summary.embedded += 1;
            } else if !reference.exists {
                summary.missing += 1;
            } else if let Some(path) = reference.source()
                && counted.insert(path)
            {
                summary.files += 1;
                summary.bytes += reference.size;
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a ReferenceGraph {
    type Item = &'a AssetReference;
    type IntoIter = std::slice::Iter<'a, AssetReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.references.iter()
    }
}

/// Counts over a scanned graph. Sizes count each distinct file once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub references: usize,
    pub files: usize,
    pub bytes: u64,
    pub missing: usize,
    pub embedded: usize,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}), {} missing, {} embedded",
            plural_count(self.references, "reference"),
            plural_count(self.files, "file"),
            format_size(self.bytes),
            self.missing,
            self.embedded,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(id: usize, path: &str, exists: bool, size: u64) -> AssetReference {
        AssetReference {
            id: ReferenceId(id),
            category: AssetCategory::Image,
            stored_path: StoredPath::parse(path),
            resolved_path: Some(PathBuf::from(path)),
            datablock_name: format!("ref{id}"),
            is_embedded: false,
            is_used: true,
            exists,
            size,
            content_hash: None,
        }
    }

    #[test]
    fn test_lookup_by_id() {
        let graph = ReferenceGraph::new(
            None,
            vec![reference(3, "/a.png", true, 1), reference(7, "/b.png", true, 1)],
        );
        assert_eq!(graph.get(ReferenceId(7)).unwrap().datablock_name, "ref7");
        assert!(graph.get(ReferenceId(0)).is_none());
    }

    #[test]
    fn test_source_paths_distinct_and_sorted() {
        let mut embedded = reference(3, "/c.png", true, 5);
        embedded.is_embedded = true;
        let graph = ReferenceGraph::new(
            None,
            vec![
                reference(0, "/b.png", true, 1),
                reference(1, "/a.png", true, 1),
                reference(2, "/b.png", true, 1),
                embedded,
                reference(4, "/missing.png", false, 0),
            ],
        );
        assert_eq!(graph.source_paths(), vec![Path::new("/a.png"), Path::new("/b.png")]);
    }

    #[test]
    fn test_summary_counts_sizes_once() {
        let mut embedded = reference(3, "/c.png", false, 0);
        embedded.is_embedded = true;
        let graph = ReferenceGraph::new(
            None,
            vec![
                reference(0, "/a.png", true, 1024),
                reference(1, "/a.png", true, 1024),
                reference(2, "/gone.png", false, 0),
                embedded,
            ],
        );
        let summary = graph.summary();
        assert_eq!(
            summary,
            ScanSummary {
                references: 4,
                files: 1,
                bytes: 1024,
                missing: 1,
                embedded: 1,
            }
        );
        assert_eq!(
            summary.to_string(),
            "4 references (1 file, 1.0 KB), 1 missing, 1 embedded"
        );
    }

    #[test]
    fn test_file_name_falls_back_to_stored() {
        let mut r = reference(0, "//textures/wood.png", false, 0);
        r.resolved_path = None;
        assert_eq!(r.file_name(), Some("wood.png"));
    }
}
