//! Relinker: write collected paths back through the host.
//!
//! The destination root becomes the project base of the document copy, so
//! every collected reference is rewritten to `//<category>/<file>`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::collect::{CollectionReport, CollectionStatus};
use crate::error::Failure;
use crate::host::{DocumentWriter, ReferenceId};
use crate::path::reduce_to_relative;
use crate::scan::ReferenceGraph;

/// Outcome of relinking one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelinkStatus {
    /// Now points at its collected copy
    Relinked(String),
    /// Not collected but still on disk; made absolute so the moved
    /// document keeps finding it
    Absolutized(String),
    /// Missing, failed or cancelled; stored path left as it was
    Unresolved,
    /// Embedded, or excluded but already absolute; nothing to rewrite
    Untouched,
    /// The host rejected the rewrite
    Failed(Failure),
}

/// Results of one relink pass, keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct RelinkReport {
    results: BTreeMap<ReferenceId, RelinkStatus>,
    /// Error from the final `flush`, if any
    pub flush_error: Option<Failure>,
}

impl RelinkReport {
    pub fn status(&self, id: ReferenceId) -> Option<&RelinkStatus> {
        self.results.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReferenceId, &RelinkStatus)> {
        self.results.iter().map(|(id, s)| (*id, s))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn relinked(&self) -> usize {
        self.count(|s| matches!(s, RelinkStatus::Relinked(_)))
    }

    /// References the caller should surface as broken.
    pub fn unresolved(&self) -> Vec<ReferenceId> {
        self.results
            .iter()
            .filter(|(_, s)| matches!(s, RelinkStatus::Unresolved))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, RelinkStatus::Failed(_)))
    }

    pub fn count(&self, pred: impl Fn(&RelinkStatus) -> bool) -> usize {
        self.results.values().filter(|s| pred(s)).count()
    }
}

impl fmt::Display for RelinkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} relinked, {} unresolved, {} failed",
            self.relinked(),
            self.unresolved().len(),
            self.failed()
        )
    }
}

/// Relink the document copy living at `dest_root`.
///
/// Never fails as a whole: host errors are recorded per reference and
/// `flush` errors in [`RelinkReport::flush_error`].
pub fn relink<W: DocumentWriter + ?Sized>(
    graph: &ReferenceGraph,
    report: &CollectionReport,
    writer: &mut W,
) -> RelinkReport {
    let root = report.root();
    rewrite(graph, report, writer, |rel| reduce_to_relative(&root.join(rel), root), true)
}

/// Relink the original document in place.
///
/// Collected files are referenced relative to `base` (the original project
/// directory) when they lie under it, absolute otherwise. References that
/// were not collected keep their stored path; excluded ones are reported
/// untouched since the original still resolves them.
pub fn relink_original<W: DocumentWriter + ?Sized>(
    graph: &ReferenceGraph,
    report: &CollectionReport,
    writer: &mut W,
    base: Option<&Path>,
) -> RelinkReport {
    let root = report.root();
    rewrite(
        graph,
        report,
        writer,
        |rel| {
            let target = root.join(rel);
            match base {
                Some(base) => reduce_to_relative(&target, base),
                None => target.to_string_lossy().into_owned(),
            }
        },
        false,
    )
}

fn rewrite<W: DocumentWriter + ?Sized>(
    graph: &ReferenceGraph,
    report: &CollectionReport,
    writer: &mut W,
    new_path: impl Fn(&Path) -> String,
    absolutize_skipped: bool,
) -> RelinkReport {
    let mut results = BTreeMap::new();

    for reference in graph {
        let id = reference.id;
        let wanted = match (report.status(id), report.destination_of(id)) {
            (_, Some(rel)) => Some((new_path(rel), true)),
            (Some(CollectionStatus::SkippedEmbedded), _) => None,
            // Still valid where the document already lives
            (Some(CollectionStatus::SkippedExcluded), _)
                if !absolutize_skipped || !reference.stored_path.is_project_relative() =>
            {
                None
            }
            (Some(CollectionStatus::SkippedExcluded), _) => {
                match reference.source() {
                    Some(source) => Some((source.to_string_lossy().into_owned(), false)),
                    None => {
                        results.insert(id, RelinkStatus::Unresolved);
                        continue;
                    }
                }
            }
            _ => {
                results.insert(id, RelinkStatus::Unresolved);
                continue;
            }
        };

        let status = match wanted {
            None => RelinkStatus::Untouched,
            Some((path, collected)) => match writer.set_path(id, &path) {
                Ok(()) if collected => RelinkStatus::Relinked(path),
                Ok(()) => RelinkStatus::Absolutized(path),
                Err(err) => RelinkStatus::Failed(Failure::host(&err)),
            },
        };
        results.insert(id, status);
    }

    let flush_error = writer.flush().err().map(|err| Failure::host(&err));
    if let Some(err) = &flush_error {
        crate::log!("error"; "failed to save relinked document: {err}");
    }

    let report = RelinkReport {
        results,
        flush_error,
    };
    crate::debug!("relink"; "{report}");
    report
}
