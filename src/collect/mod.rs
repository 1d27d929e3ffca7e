//! Collector: execute a destination plan.
//!
//! Copies run on a bounded worker pool. Every copy is atomic (temporary
//! sibling then rename), so a failed or cancelled run never leaves a
//! truncated file behind. Finished copies stay when later ones fail.

mod report;

pub use report::{CollectionReport, CollectionStatus};

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use rayon::prelude::*;

use crate::core::{CancelToken, io_pool};
use crate::error::{CollectError, Failure, FailureKind};
use crate::host::ReferenceId;
use crate::logger::ProgressLine;
use crate::plan::{DestinationPlan, PlanAction};
use crate::utils::copy_atomic;

/// One physical copy.
struct CopyUnit<'a> {
    id: ReferenceId,
    source: &'a Path,
    dest: &'a Path,
}

/// Carry out `plan`, copying sources into its destination root.
///
/// Results are deterministic per reference; completion order is not.
/// Aliases inherit the outcome of their canonical copy when it did not
/// succeed.
///
/// # Errors
///
/// Only when the worker pool cannot be started. Per-reference problems
/// are reported in the returned [`CollectionReport`].
pub fn collect(
    plan: &DestinationPlan,
    workers: usize,
    cancel: &CancelToken,
    progress: Option<&ProgressLine>,
) -> Result<CollectionReport, CollectError> {
    let root = plan.root();
    let mut results = BTreeMap::new();
    let mut units = Vec::new();

    for (id, action) in plan.iter() {
        let status = match action {
            PlanAction::Copy {
                source,
                dest,
                reuse: false,
                ..
            } => {
                units.push(CopyUnit { id, source, dest });
                continue;
            }
            PlanAction::Copy {
                dest, reuse: true, ..
            } => CollectionStatus::Copied {
                dest: dest.clone(),
                reused: true,
            },
            // Resolved once all copies are known
            PlanAction::Alias { .. } => continue,
            PlanAction::SkipEmbedded => CollectionStatus::SkippedEmbedded,
            PlanAction::SkipExcluded => CollectionStatus::SkippedExcluded,
            PlanAction::Missing => CollectionStatus::Missing,
        };
        results.insert(id, status);
    }

    let pool = io_pool(workers)?;
    let copied: Vec<_> = pool.install(|| {
        units
            .par_iter()
            .map(|unit| {
                let status = run_unit(unit, root, cancel);
                if let Some(progress) = progress {
                    progress.inc("copy");
                }
                (unit.id, status)
            })
            .collect()
    });
    results.extend(copied);

    for (id, action) in plan.iter() {
        if let PlanAction::Alias { canonical } = action {
            let status = match results.get(canonical) {
                Some(status) if status.is_collected() => CollectionStatus::DeduplicatedTo(*canonical),
                Some(status) => status.clone(),
                None => CollectionStatus::Missing,
            };
            results.insert(id, status);
        }
    }

    let report = CollectionReport::new(root.to_path_buf(), results);
    for (id, failure) in report.failed() {
        crate::debug!("collect"; "{id} failed: {failure}");
    }
    Ok(report)
}

fn run_unit(unit: &CopyUnit<'_>, root: &Path, cancel: &CancelToken) -> CollectionStatus {
    if cancel.is_cancelled() {
        return CollectionStatus::Cancelled;
    }

    let target = root.join(unit.dest);
    match copy_atomic(unit.source, &target) {
        Ok(_) => CollectionStatus::Copied {
            dest: unit.dest.to_path_buf(),
            reused: false,
        },
        // Source vanished after the scan
        Err(err) if err.kind() == io::ErrorKind::NotFound && !unit.source.exists() => {
            CollectionStatus::Missing
        }
        Err(err) => CollectionStatus::Failed(copy_failure(unit.source, &target, &err)),
    }
}

fn copy_failure(source: &Path, target: &Path, err: &io::Error) -> Failure {
    Failure::new(
        FailureKind::of(err),
        format!("{} -> {}: {err}", source.display(), target.display()),
    )
}
