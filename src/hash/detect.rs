//! Parallel hashing and duplicate grouping.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use super::{ContentHash, compute_file_hash};
use crate::core::{CancelToken, CategorySet, io_pool};
use crate::error::{CollectError, Failure};
use crate::host::ReferenceId;
use crate::logger::ProgressLine;
use crate::scan::ReferenceGraph;

/// References whose files have identical bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub hash: ContentHash,
    /// Member with the smallest resolved path (then smallest id)
    pub canonical: ReferenceId,
    pub canonical_path: PathBuf,
    /// All member ids, sorted
    pub members: Vec<ReferenceId>,
    /// Distinct source paths, sorted
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// More than one distinct file carries this content.
    pub fn has_duplicates(&self) -> bool {
        self.paths.len() > 1
    }
}

/// Result of duplicate detection over one graph.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    hashes: FxHashMap<PathBuf, ContentHash>,
    groups: FxHashMap<ContentHash, DuplicateGroup>,
    failures: Vec<(PathBuf, Failure)>,
    cancelled: bool,
}

impl DuplicateIndex {
    /// Group the graph's references by the given per-path hashes.
    pub(crate) fn build(graph: &ReferenceGraph, hashes: FxHashMap<PathBuf, ContentHash>) -> Self {
        // (path, id) order: the first entry is canonical
        let mut by_hash: FxHashMap<ContentHash, BTreeSet<(&Path, ReferenceId)>> =
            FxHashMap::default();
        for reference in graph {
            let Some(path) = reference.source() else { continue };
            if let Some(hash) = hashes.get(path) {
                by_hash.entry(*hash).or_default().insert((path, reference.id));
            }
        }

        let groups = by_hash
            .into_iter()
            .filter_map(|(hash, members)| {
                let &(canonical_path, canonical) = members.first()?;
                let mut paths: Vec<PathBuf> = members.iter().map(|(p, _)| p.to_path_buf()).collect();
                paths.dedup();
                let mut ids: Vec<_> = members.iter().map(|&(_, id)| id).collect();
                ids.sort_unstable();
                Some((
                    hash,
                    DuplicateGroup {
                        hash,
                        canonical,
                        canonical_path: canonical_path.to_path_buf(),
                        members: ids,
                        paths,
                    },
                ))
            })
            .collect();

        Self {
            hashes,
            groups,
            failures: Vec::new(),
            cancelled: false,
        }
    }

    pub fn hash_of(&self, path: &Path) -> Option<ContentHash> {
        self.hashes.get(path).copied()
    }

    pub fn group(&self, hash: &ContentHash) -> Option<&DuplicateGroup> {
        self.groups.get(hash)
    }

    /// Canonical member of the group `hash` belongs to.
    pub fn canonical_for(&self, hash: &ContentHash) -> Option<ReferenceId> {
        self.groups.get(hash).map(|g| g.canonical)
    }

    /// Groups spanning more than one distinct file, ordered by canonical path.
    pub fn duplicates(&self) -> Vec<&DuplicateGroup> {
        let mut groups: Vec<_> = self.groups.values().filter(|g| g.has_duplicates()).collect();
        groups.sort_by(|a, b| a.canonical_path.cmp(&b.canonical_path));
        groups
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Paths that could not be read.
    pub fn failures(&self) -> &[(PathBuf, Failure)] {
        &self.failures
    }

    /// Detection stopped early; some paths are unhashed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Hash every distinct source path of `graph` in `categories` on a
/// bounded pool. Excluded categories are never collected, so their files
/// are not read.
///
/// Unreadable files are left unhashed and listed in
/// [`DuplicateIndex::failures`]; the collector surfaces the error again
/// when it tries to copy them. Cancellation leaves the rest unhashed.
///
/// # Errors
///
/// Only when the worker pool cannot be started.
pub fn detect(
    graph: &ReferenceGraph,
    categories: &CategorySet,
    workers: usize,
    cancel: &CancelToken,
    progress: Option<&ProgressLine>,
) -> Result<DuplicateIndex, CollectError> {
    let paths = graph.source_paths_in(categories);
    let pool = io_pool(workers)?;

    let outcomes: Vec<_> = pool.install(|| {
        paths
            .par_iter()
            .map(|&path| {
                if cancel.is_cancelled() {
                    return None;
                }
                let outcome = compute_file_hash(path);
                if let Some(progress) = progress {
                    progress.inc("hash");
                }
                Some((path, outcome))
            })
            .collect()
    });

    let mut hashes = FxHashMap::default();
    let mut failures = Vec::new();
    let mut cancelled = false;
    for outcome in outcomes {
        match outcome {
            Some((path, Ok(hash))) => {
                hashes.insert(path.to_path_buf(), hash);
            }
            Some((path, Err(err))) => {
                crate::debug!("hash"; "cannot read {}: {err}", path.display());
                failures.push((path.to_path_buf(), Failure::io(path, &err)));
            }
            None => cancelled = true,
        }
    }

    let mut index = DuplicateIndex::build(graph, hashes);
    index.failures = failures;
    index.cancelled = cancelled;
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AssetCategory;
    use crate::host::RawReference;
    use crate::path::normalize_path;
    use crate::scan::{ScanOptions, scan};
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, ReferenceGraph) {
        let dir = TempDir::new().unwrap();
        let base = normalize_path(dir.path());
        fs::write(base.join("a.png"), b"H1").unwrap();
        fs::write(base.join("b.png"), b"H1").unwrap();
        fs::write(base.join("c.jpg"), b"H2").unwrap();

        let records = vec![
            RawReference::new(AssetCategory::Image, "B", "//b.png"),
            RawReference::new(AssetCategory::Image, "A", "//a.png"),
            RawReference::new(AssetCategory::Image, "C", "//c.jpg"),
            RawReference::new(AssetCategory::Image, "A again", "//a.png"),
            RawReference::new(AssetCategory::Image, "Missing", "//missing.png"),
            RawReference::new(AssetCategory::Image, "Packed", "//a.png").embedded(),
        ];
        let graph = scan(records, Some(&base), ScanOptions::default()).unwrap();
        (dir, graph)
    }

    #[test]
    fn test_groups_identical_content() {
        let (_dir, graph) = fixture();
        let index = detect(&graph, &AssetCategory::all(), 4, &CancelToken::new(), None).unwrap();

        assert_eq!(index.group_count(), 2);
        let duplicates = index.duplicates();
        assert_eq!(duplicates.len(), 1);

        let group = duplicates[0];
        assert_eq!(group.members, vec![ReferenceId(0), ReferenceId(1), ReferenceId(3)]);
        assert_eq!(group.paths.len(), 2);
        // a.png sorts before b.png; among a.png refs, id 1 < id 3
        assert_eq!(group.canonical, ReferenceId(1));
        assert!(group.canonical_path.ends_with("a.png"));
    }

    #[test]
    fn test_canonical_is_stable_across_worker_counts() {
        let (_dir, graph) = fixture();
        let one = detect(&graph, &AssetCategory::all(), 1, &CancelToken::new(), None).unwrap();
        let many = detect(&graph, &AssetCategory::all(), 8, &CancelToken::new(), None).unwrap();
        assert_eq!(one.duplicates(), many.duplicates());
    }

    #[test]
    fn test_missing_and_embedded_not_hashed() {
        let (_dir, graph) = fixture();
        let index = detect(&graph, &AssetCategory::all(), 2, &CancelToken::new(), None).unwrap();
        // ids 4 (missing) and 5 (embedded) never join a group
        assert_eq!(index.duplicates()[0].members.len(), 3);
        assert_eq!(index.group_count(), 2);
        assert!(index.failures().is_empty());
        assert!(!index.is_cancelled());
    }

    #[test]
    fn test_cancelled_before_start() {
        let (_dir, graph) = fixture();
        let cancel = CancelToken::new();
        cancel.cancel();
        let index = detect(&graph, &AssetCategory::all(), 2, &cancel, None).unwrap();
        assert!(index.is_cancelled());
        assert_eq!(index.group_count(), 0);
    }

    #[test]
    fn test_annotate_writes_hashes() {
        let (_dir, mut graph) = fixture();
        let index = detect(&graph, &AssetCategory::all(), 2, &CancelToken::new(), None).unwrap();
        graph.annotate(&index);

        let a = graph.get(ReferenceId(1)).unwrap().content_hash;
        let b = graph.get(ReferenceId(0)).unwrap().content_hash;
        let c = graph.get(ReferenceId(2)).unwrap().content_hash;
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(graph.get(ReferenceId(4)).unwrap().content_hash.is_none());
        assert!(graph.get(ReferenceId(5)).unwrap().content_hash.is_none());
    }

    #[test]
    fn test_excluded_categories_not_read() {
        let dir = TempDir::new().unwrap();
        let base = normalize_path(dir.path());
        fs::write(base.join("a.png"), b"image").unwrap();
        fs::write(base.join("smoke.vdb"), b"volume").unwrap();

        let records = vec![
            RawReference::new(AssetCategory::Image, "A", "//a.png"),
            RawReference::new(AssetCategory::Volume, "Smoke", "//smoke.vdb"),
        ];
        let graph = scan(records, Some(&base), ScanOptions::default()).unwrap();
        let images: CategorySet = [AssetCategory::Image].into_iter().collect();
        let progress = ProgressLine::new("collect", &[("hash", 2)]);

        let index = detect(&graph, &images, 2, &CancelToken::new(), Some(&progress)).unwrap();
        assert_eq!(progress.current("hash"), Some(1));
        assert!(index.hash_of(&base.join("a.png")).is_some());
        assert!(index.hash_of(&base.join("smoke.vdb")).is_none());
    }

    #[test]
    fn test_progress_counts_distinct_paths() {
        let (_dir, graph) = fixture();
        let progress = ProgressLine::new("collect", &[("hash", 3)]);
        detect(&graph, &AssetCategory::all(), 2, &CancelToken::new(), Some(&progress)).unwrap();
        assert_eq!(progress.current("hash"), Some(3));
    }
}
