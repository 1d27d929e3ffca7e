//! Per-reference collection outcomes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Failure;
use crate::host::ReferenceId;
use crate::utils::plural_count;

/// Outcome of collecting one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionStatus {
    /// File is at `dest` (relative to the root); `reused` if it was already there
    Copied { dest: PathBuf, reused: bool },
    SkippedEmbedded,
    SkippedExcluded,
    Missing,
    Failed(Failure),
    /// Points at the copy made for another reference
    DeduplicatedTo(ReferenceId),
    Cancelled,
}

impl CollectionStatus {
    /// The reference ends up with a file in the destination tree.
    pub const fn is_collected(&self) -> bool {
        matches!(self, Self::Copied { .. } | Self::DeduplicatedTo(_))
    }

    /// Short label for summaries.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Copied { reused: false, .. } => "copied",
            Self::Copied { reused: true, .. } => "reused",
            Self::SkippedEmbedded => "embedded",
            Self::SkippedExcluded => "excluded",
            Self::Missing => "missing",
            Self::Failed(_) => "failed",
            Self::DeduplicatedTo(_) => "deduplicated",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Results of one collection run, keyed by reference.
#[derive(Debug, Clone)]
pub struct CollectionReport {
    root: PathBuf,
    results: BTreeMap<ReferenceId, CollectionStatus>,
}

impl CollectionReport {
    pub(crate) fn new(root: PathBuf, results: BTreeMap<ReferenceId, CollectionStatus>) -> Self {
        Self { root, results }
    }

    /// Destination root of the run.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn status(&self, id: ReferenceId) -> Option<&CollectionStatus> {
        self.results.get(&id)
    }

    /// Results in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ReferenceId, &CollectionStatus)> {
        self.results.iter().map(|(id, s)| (*id, s))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn count(&self, pred: impl Fn(&CollectionStatus) -> bool) -> usize {
        self.results.values().filter(|s| pred(s)).count()
    }

    /// References with a file of their own in the tree (reused included).
    pub fn copied(&self) -> usize {
        self.count(|s| matches!(s, CollectionStatus::Copied { .. }))
    }

    pub fn failed(&self) -> Vec<(ReferenceId, &Failure)> {
        self.results
            .iter()
            .filter_map(|(id, s)| match s {
                CollectionStatus::Failed(failure) => Some((*id, failure)),
                _ => None,
            })
            .collect()
    }

    /// Relative destination of `id`, following deduplication.
    pub fn destination_of(&self, id: ReferenceId) -> Option<&Path> {
        match self.results.get(&id)? {
            CollectionStatus::Copied { dest, .. } => Some(dest),
            CollectionStatus::DeduplicatedTo(canonical) => match self.results.get(canonical)? {
                CollectionStatus::Copied { dest, .. } => Some(dest),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for CollectionReport {
    /// `3 copied, 1 deduplicated, 1 missing`; zero counts are left out.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for status in self.results.values() {
            *counts.entry(status.label()).or_default() += 1;
        }
        if counts.is_empty() {
            return f.write_str(&plural_count(0, "reference"));
        }
        let parts: Vec<_> = counts.iter().map(|(label, n)| format!("{n} {label}")).collect();
        f.write_str(&parts.join(", "))
    }
}
