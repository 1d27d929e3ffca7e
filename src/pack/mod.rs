//! Pack and unpack: move file bytes into and out of the host's blob store.
//!
//! Both directions talk to the host on the calling thread, one reference
//! at a time. A failure on one reference never stops the others.

mod unpack;

pub use unpack::{UnpackReport, UnpackStatus, unpack};

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use rustc_hash::FxHashMap;

use crate::core::{CancelToken, CategorySet};
use crate::error::Failure;
use crate::host::{HostDocument, ReferenceId};
use crate::scan::ReferenceGraph;
use crate::utils::format_size;

/// Outcome of packing one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackStatus {
    Packed { bytes: u64 },
    AlreadyEmbedded,
    SkippedExcluded,
    Missing,
    Failed(Failure),
    Cancelled,
}

/// Results of one pack run, keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct PackReport {
    results: BTreeMap<ReferenceId, PackStatus>,
    /// Error from the final host `flush`, if any
    pub flush_error: Option<Failure>,
}

impl PackReport {
    pub fn status(&self, id: ReferenceId) -> Option<&PackStatus> {
        self.results.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReferenceId, &PackStatus)> {
        self.results.iter().map(|(id, s)| (*id, s))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn count(&self, pred: impl Fn(&PackStatus) -> bool) -> usize {
        self.results.values().filter(|s| pred(s)).count()
    }

    pub fn packed(&self) -> usize {
        self.count(|s| matches!(s, PackStatus::Packed { .. }))
    }

    pub fn failed(&self) -> Vec<(ReferenceId, &Failure)> {
        self.results
            .iter()
            .filter_map(|(id, s)| match s {
                PackStatus::Failed(failure) => Some((*id, failure)),
                _ => None,
            })
            .collect()
    }

    /// Bytes handed to the host, counted per reference.
    pub fn bytes(&self) -> u64 {
        self.results
            .values()
            .map(|s| match s {
                PackStatus::Packed { bytes } => *bytes,
                _ => 0,
            })
            .sum()
    }
}

impl fmt::Display for PackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} packed ({}), {} failed",
            self.packed(),
            format_size(self.bytes()),
            self.failed().len()
        )
    }
}

/// Embed every existing, non-embedded reference in `categories`.
///
/// References are grouped by source file. Each file is read once, handed
/// to every reference of its group, and dropped before the next file is
/// read, so at most one file's bytes are held at a time. Packed references
/// are marked embedded in `graph`, so a later collection skips them.
///
/// Missing references stay `Missing` even after cancellation; only groups
/// not yet read report `Cancelled`.
pub fn pack(
    host: &mut dyn HostDocument,
    graph: &mut ReferenceGraph,
    categories: &CategorySet,
    cancel: &CancelToken,
) -> PackReport {
    let mut results = BTreeMap::new();
    // Source file -> references sharing it, in first-seen order
    let mut groups: Vec<(PathBuf, Vec<ReferenceId>)> = Vec::new();
    let mut slots: FxHashMap<PathBuf, usize> = FxHashMap::default();

    for reference in graph.iter() {
        let status = if reference.is_embedded {
            PackStatus::AlreadyEmbedded
        } else if !categories.contains(&reference.category) {
            PackStatus::SkippedExcluded
        } else if let Some(source) = reference.source() {
            let slot = *slots.entry(source.to_path_buf()).or_insert_with(|| {
                groups.push((source.to_path_buf(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(reference.id);
            continue;
        } else {
            PackStatus::Missing
        };
        results.insert(reference.id, status);
    }

    for (source, ids) in groups {
        if cancel.is_cancelled() {
            results.extend(ids.into_iter().map(|id| (id, PackStatus::Cancelled)));
            continue;
        }

        let mut bytes = match fs::read(&source) {
            Ok(bytes) => bytes,
            Err(err) => {
                let failure = Failure::io(&source, &err);
                results.extend(
                    ids.into_iter()
                        .map(|id| (id, PackStatus::Failed(failure.clone()))),
                );
                continue;
            }
        };
        let len = bytes.len() as u64;

        let mut ids = ids.into_iter().peekable();
        while let Some(id) = ids.next() {
            let blob = if ids.peek().is_some() {
                bytes.clone()
            } else {
                std::mem::take(&mut bytes)
            };
            let status = match host.embed_blob(id, blob) {
                Ok(()) => {
                    if let Some(reference) = graph.get_mut(id) {
                        reference.is_embedded = true;
                    }
                    PackStatus::Packed { bytes: len }
                }
                Err(err) => PackStatus::Failed(Failure::host(&err)),
            };
            results.insert(id, status);
        }
    }

    let flush_error = host.flush().err().map(|err| Failure::host(&err));
    let report = PackReport {
        results,
        flush_error,
    };
    crate::log!("pack"; "{report}");
    report
}
