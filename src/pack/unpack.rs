//! Extract embedded blobs back to files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::core::CancelToken;
use crate::error::{CollectError, Failure, FailureKind};
use crate::hash::{ContentHash, hash_bytes};
use crate::host::{HostDocument, ReferenceId};
use crate::path::{StoredPath, normalize_path, reduce_to_relative};
use crate::plan::{NameClaims, NamingOptions, target_file_name};
use crate::scan::{AssetReference, ReferenceGraph};
use crate::utils::write_atomic;

/// Outcome of unpacking one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackStatus {
    /// Written to (or found identical at) `dest`; the reference now stores `stored`
    Unpacked {
        dest: PathBuf,
        stored: String,
        reused: bool,
    },
    NotEmbedded,
    Failed(Failure),
    Cancelled,
}

/// Results of one unpack run, keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct UnpackReport {
    results: BTreeMap<ReferenceId, UnpackStatus>,
    /// Error from the final host `flush`, if any
    pub flush_error: Option<Failure>,
}

impl UnpackReport {
    pub fn status(&self, id: ReferenceId) -> Option<&UnpackStatus> {
        self.results.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReferenceId, &UnpackStatus)> {
        self.results.iter().map(|(id, s)| (*id, s))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn count(&self, pred: impl Fn(&UnpackStatus) -> bool) -> usize {
        self.results.values().filter(|s| pred(s)).count()
    }

    pub fn unpacked(&self) -> usize {
        self.count(|s| matches!(s, UnpackStatus::Unpacked { .. }))
    }

    pub fn failed(&self) -> Vec<(ReferenceId, &Failure)> {
        self.results
            .iter()
            .filter_map(|(id, s)| match s {
                UnpackStatus::Failed(failure) => Some((*id, failure)),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for UnpackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unpacked, {} failed", self.unpacked(), self.failed().len())
    }
}

/// Extract every embedded reference into `dest_dir`.
///
/// Files are named like collected copies (category folders, datablock
/// renaming, `_N` suffixes). A file already present with identical bytes
/// is reused, and blobs with identical bytes and target name share one
/// file. The reference is repointed at the file (project-relative when it
/// lies under the project base) and its blob is released.
pub fn unpack(
    host: &mut dyn HostDocument,
    graph: &mut ReferenceGraph,
    dest_dir: &Path,
    naming: NamingOptions,
    cancel: &CancelToken,
) -> UnpackReport {
    let base = host.project_base_dir();
    let mut extractor = Extractor {
        claims: NameClaims::new(dest_dir),
        written: FxHashMap::default(),
        naming,
    };
    let mut results = BTreeMap::new();
    let ids: Vec<_> = graph.iter().map(|r| r.id).collect();

    for id in ids {
        let Some(reference) = graph.get_mut(id) else { continue };
        if !reference.is_embedded {
            results.insert(id, UnpackStatus::NotEmbedded);
            continue;
        }
        if cancel.is_cancelled() {
            results.insert(id, UnpackStatus::Cancelled);
            continue;
        }

        let status = match extractor.extract(host, id, reference, base.as_deref()) {
            Ok(status) => status,
            Err(err) => UnpackStatus::Failed(Failure::from(&err)),
        };
        results.insert(id, status);
    }

    let flush_error = host.flush().err().map(|err| Failure::host(&err));
    let report = UnpackReport {
        results,
        flush_error,
    };
    crate::log!("unpack"; "{report}");
    report
}

struct Extractor {
    claims: NameClaims,
    /// (content, relative target name) -> file written this run
    written: FxHashMap<(ContentHash, PathBuf), PathBuf>,
    naming: NamingOptions,
}

impl Extractor {
    fn extract(
        &mut self,
        host: &mut dyn HostDocument,
        id: ReferenceId,
        reference: &mut AssetReference,
        base: Option<&Path>,
    ) -> Result<UnpackStatus, CollectError> {
        let bytes = host.extract_blob(id)?;
        let hash = hash_bytes(&bytes);

        let dir = if self.naming.flatten {
            PathBuf::new()
        } else {
            PathBuf::from(reference.category.folder())
        };
        let name = target_file_name(reference, self.naming);
        let key = (hash, dir.join(name.to_lowercase()));

        let (rel, reused) = match self.written.get(&key) {
            Some(rel) => (rel.clone(), true),
            None => {
                let claim = self.claims.claim(&dir, &name, Some(hash))?;
                let rel = claim.path().to_path_buf();
                if !claim.is_reuse() {
                    let target = self.claims.root().join(&rel);
                    write_atomic(&target, &bytes).map_err(|err| CollectError::from_io(&target, err))?;
                }
                self.written.insert(key, rel.clone());
                (rel, claim.is_reuse())
            }
        };

        let dest = normalize_path(&self.claims.root().join(&rel));
        let stored = match base {
            Some(base) => reduce_to_relative(&dest, base),
            None => dest.to_string_lossy().into_owned(),
        };

        let previous = reference.stored_path.to_raw();
        host.set_path(id, &stored)?;
        if let Err(err) = host.release_blob(id) {
            // The blob is still there, so the reference must not move either
            let reason = match host.set_path(id, &previous) {
                Ok(()) => format!("{err}; path restored to `{previous}`"),
                Err(revert) => {
                    format!("{err}; restoring `{previous}` failed ({revert}), path is `{stored}`")
                }
            };
            return Ok(UnpackStatus::Failed(Failure::new(FailureKind::Host, reason)));
        }

        reference.stored_path = StoredPath::parse(&stored);
        reference.resolved_path = Some(dest.clone());
        reference.is_embedded = false;
        reference.exists = true;
        reference.size = bytes.len() as u64;
        reference.content_hash = Some(hash);

        Ok(UnpackStatus::Unpacked {
            dest,
            stored,
            reused,
        })
    }
}
