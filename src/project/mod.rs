//! End-to-end project runs.
//!
//! ```text
//! preconditions ─▶ scan ─▶ detect ─▶ assign ─▶ collect ─▶ document copy ─▶ relink
//! ```
//!
//! Everything before `collect` is free of side effects on the destination,
//! so a failed precondition never leaves a half-made tree behind.
//!
//! [`pack_project`] is the config-driven counterpart for `pack`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::collect::{CollectionReport, collect};
use crate::config::CollectConfig;
use crate::core::CancelToken;
use crate::error::{CollectError, Failure};
use crate::hash::detect;
use crate::host::HostDocument;
use crate::logger::ProgressLine;
use crate::pack::{PackReport, pack};
use crate::plan::assign;
use crate::relink::{RelinkReport, relink, relink_original};
use crate::scan::{ReferenceGraph, ScanSummary, scan_host};
use crate::utils::plural_count;
use crate::{debug, log};

/// Everything a collection run produced.
#[derive(Debug, Clone)]
pub struct ProjectReport {
    pub destination: PathBuf,
    pub summary: ScanSummary,
    /// Content groups spanning more than one file
    pub duplicate_groups: usize,
    pub collection: CollectionReport,
    /// Where the document copy was written
    pub document_copy: Option<PathBuf>,
    /// Saving the document copy failed
    pub document_error: Option<Failure>,
    /// Relink of the document copy
    pub relink: Option<RelinkReport>,
    /// Relink of the original document (opt-in)
    pub original_relink: Option<RelinkReport>,
    pub cancelled: bool,
}

/// Collect every file `host` references into the configured destination.
///
/// # Errors
///
/// Only global preconditions abort the run, all before any file is written:
/// - no destination configured, or it lies inside a referenced file
/// - project-relative references in a never-saved document
/// - a document copy is requested but the document was never saved
///
/// Per-reference problems end up in the returned report.
pub fn collect_project(
    host: &mut dyn HostDocument,
    config: &CollectConfig,
    cancel: &CancelToken,
) -> Result<ProjectReport, CollectError> {
    config.apply_verbose();

    let destination = config
        .destination_dir()
        .ok_or_else(|| CollectError::Precondition("no destination configured".into()))?;

    let mut graph = scan_host(&*host, config.scan_options())?;
    let document_name = if config.document.copy {
        Some(document_file_name(host.document_path().as_deref())?)
    } else {
        None
    };
    check_destination(&graph, &destination)?;

    let summary = graph.summary();
    log!("scan"; "{summary}");

    fs::create_dir_all(&destination).map_err(|err| CollectError::from_io(&destination, err))?;

    let index = {
        let categories = &config.collect.categories;
        let progress = config.collect.progress.then(|| {
            ProgressLine::new("collect", &[("hash", graph.source_paths_in(categories).len())])
        });
        let index = detect(
            &graph,
            categories,
            config.collect.workers,
            cancel,
            progress.as_ref(),
        )?;
        if let Some(progress) = progress {
            progress.finish();
        }
        index
    };
    graph.annotate(&index);

    let duplicate_groups = index.duplicates().len();
    if duplicate_groups > 0 {
        debug!("collect"; "{} with identical content", plural_count(duplicate_groups, "group"));
    }

    let plan = assign(&graph, &index, &config.plan_options(document_name), &destination)?;
    let collection = {
        let progress = config
            .collect
            .progress
            .then(|| ProgressLine::new("collect", &[("copy", plan.copy_count())]));
        let collection = collect(&plan, config.collect.workers, cancel, progress.as_ref())?;
        if let Some(progress) = progress {
            progress.finish();
        }
        collection
    };
    log!("collect"; "{collection}");

    let mut report = ProjectReport {
        destination: destination.clone(),
        summary,
        duplicate_groups,
        collection,
        document_copy: None,
        document_error: None,
        relink: None,
        original_relink: None,
        cancelled: cancel.is_cancelled(),
    };

    if report.cancelled {
        log!("collect"; "cancelled, document left uncopied");
        return Ok(report);
    }

    if let Some(rel) = plan.document_dest() {
        let target = destination.join(rel);
        match host.save_copy(&target) {
            Ok(mut writer) => {
                if config.document.relink {
                    let relinked = relink(&graph, &report.collection, writer.as_mut());
                    log!("relink"; "{relinked}");
                    report.relink = Some(relinked);
                }
                report.document_copy = Some(target);
            }
            Err(err) => {
                log!("error"; "failed to save document copy: {err}");
                report.document_error = Some(Failure::host(&err));
            }
        }
    }

    if config.document.relink_original {
        let base = graph.project_base().map(Path::to_path_buf);
        let relinked = relink_original(&graph, &report.collection, host, base.as_deref());
        log!("relink"; "original: {relinked}");
        report.original_relink = Some(relinked);
    }

    Ok(report)
}

/// Embed the files of the configured `[pack] categories` into `host`.
///
/// # Errors
///
/// [`CollectError::Unresolvable`] when the document was never saved but
/// stores project-relative paths. Per-reference problems end up in the
/// returned report.
pub fn pack_project(
    host: &mut dyn HostDocument,
    config: &CollectConfig,
    cancel: &CancelToken,
) -> Result<PackReport, CollectError> {
    config.apply_verbose();

    let mut graph = scan_host(&*host, config.scan_options())?;
    debug!("pack"; "{}", graph.summary());
    Ok(pack(host, &mut graph, &config.pack.categories, cancel))
}

/// File name for the document copy.
fn document_file_name(document: Option<&Path>) -> Result<String, CollectError> {
    document
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CollectError::Precondition("the document must be saved before it can be copied".into())
        })
}

/// The destination may not be a referenced file or lie below one.
fn check_destination(graph: &ReferenceGraph, destination: &Path) -> Result<(), CollectError> {
    match graph.source_paths().into_iter().find(|source| destination.starts_with(source)) {
        Some(source) => Err(CollectError::Precondition(format!(
            "destination `{}` is inside referenced file `{}`",
            destination.display(),
            source.display()
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AssetCategory;
    use crate::host::{MemoryDocument, RawReference, ReferenceId};
    use crate::pack::PackStatus;
    use crate::path::normalize_path;
    use tempfile::TempDir;

    fn config(dest: &Path) -> CollectConfig {
        let mut config = CollectConfig::default();
        config.destination = Some(dest.to_path_buf());
        config.collect.progress = false;
        config
    }

    #[test]
    fn test_document_file_name() {
        assert_eq!(
            document_file_name(Some(Path::new("/p/scene.json"))).unwrap(),
            "scene.json"
        );
        assert!(matches!(
            document_file_name(None),
            Err(CollectError::Precondition(_))
        ));
    }

    #[test]
    fn test_no_destination_is_precondition() {
        let mut doc = MemoryDocument::new();
        let err = collect_project(&mut doc, &CollectConfig::default(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, CollectError::Precondition(_)));
    }

    #[test]
    fn test_destination_inside_source_file_rejected() {
        let dir = TempDir::new().unwrap();
        let base = normalize_path(dir.path());
        fs::write(base.join("a.png"), b"a").unwrap();
        let mut doc = MemoryDocument::saved_at(base.join("scene.json"));
        doc.push(RawReference::new(AssetCategory::Image, "A", "//a.png"));

        let err = collect_project(&mut doc, &config(&base.join("a.png/out")), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, CollectError::Precondition(ref m) if m.contains("inside")));
    }

    #[test]
    fn test_unsaved_copy_request_aborts_before_io() {
        let dir = TempDir::new().unwrap();
        let base = normalize_path(dir.path());
        fs::write(base.join("a.png"), b"a").unwrap();
        let mut doc = MemoryDocument::new();
        doc.push(RawReference::new(
            AssetCategory::Image,
            "A",
            base.join("a.png").to_str().unwrap(),
        ));

        let dest = base.join("out");
        let err = collect_project(&mut doc, &config(&dest), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, CollectError::Precondition(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_pack_project_uses_pack_categories() {
        let dir = TempDir::new().unwrap();
        let base = normalize_path(dir.path());
        fs::write(base.join("a.png"), b"image").unwrap();
        fs::write(base.join("mono.ttf"), b"font").unwrap();
        let mut doc = MemoryDocument::saved_at(base.join("scene.json"));
        doc.push(RawReference::new(AssetCategory::Image, "A", "//a.png"));
        doc.push(RawReference::new(AssetCategory::Font, "Mono", "//mono.ttf"));

        let config = crate::config::test_parse_config("[pack]\ncategories = [\"font\"]");
        let report = pack_project(&mut doc, &config, &CancelToken::new()).unwrap();

        assert_eq!(report.packed(), 1);
        assert_eq!(report.status(ReferenceId(0)), Some(&PackStatus::SkippedExcluded));
        assert_eq!(doc.blob(ReferenceId(1)), Some(&b"font"[..]));
        assert!(doc.blob(ReferenceId(0)).is_none());
    }

    #[test]
    fn test_cancelled_run_skips_document() {
        let dir = TempDir::new().unwrap();
        let base = normalize_path(dir.path()).join("project");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("a.png"), b"a").unwrap();
        let mut doc = MemoryDocument::saved_at(base.join("scene.json"));
        doc.push(RawReference::new(AssetCategory::Image, "A", "//a.png"));

        let cancel = CancelToken::new();
        cancel.cancel();
        let dest = normalize_path(dir.path()).join("out");
        let report = collect_project(&mut doc, &config(&dest), &cancel).unwrap();
        assert!(report.cancelled);
        assert!(report.document_copy.is_none());
        assert_eq!(report.collection.copied(), 0);
    }
}
