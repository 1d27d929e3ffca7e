//! Collision-safe destination planning.
//!
//! Decides, for every reference in a graph, what the collector does with it:
//!
//! | Reference                              | Action         |
//! |----------------------------------------|----------------|
//! | embedded                               | `SkipEmbedded` |
//! | category not included, or deselected   | `SkipExcluded` |
//! | unresolved or not on disk              | `Missing`      |
//! | same file (or content) as an earlier one | `Alias`      |
//! | anything else                          | `Copy`         |
//!
//! Invariant: no destination path receives two different contents.

mod claims;
mod name;

pub use claims::{Claim, MAX_SUFFIX, NameClaims};
pub use name::{FALLBACK_NAME, NamingOptions, sanitize_name, suffixed, target_file_name};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use crate::core::{AssetCategory, CategorySet};
use crate::error::CollectError;
use crate::hash::{ContentHash, DuplicateIndex};
use crate::host::ReferenceId;
use crate::scan::{AssetReference, ReferenceGraph};

/// Options for [`assign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    pub naming: NamingOptions,
    /// Copy identical content once and point every member at it.
    pub consolidate_duplicates: bool,
    /// Categories to collect; others become `SkipExcluded`.
    pub categories: CategorySet,
    /// Individual references left out of collection (`SkipExcluded`).
    pub deselected: FxHashSet<ReferenceId>,
    /// File name of the document copy, claimed at the root before any asset.
    pub document_name: Option<String>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            naming: NamingOptions::default(),
            consolidate_duplicates: false,
            categories: AssetCategory::all(),
            deselected: FxHashSet::default(),
            document_name: None,
        }
    }
}

/// What happens to one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    Copy {
        source: PathBuf,
        /// Relative to the destination root
        dest: PathBuf,
        hash: Option<ContentHash>,
        /// Identical file already at `dest`; nothing to write
        reuse: bool,
    },
    Alias {
        canonical: ReferenceId,
    },
    SkipEmbedded,
    SkipExcluded,
    Missing,
}

/// Per-reference actions plus the name ledger that produced them.
#[derive(Debug, Clone)]
pub struct DestinationPlan {
    actions: BTreeMap<ReferenceId, PlanAction>,
    claims: NameClaims,
    document: Option<PathBuf>,
}

impl DestinationPlan {
    /// Destination root every relative destination is under.
    pub fn root(&self) -> &Path {
        self.claims.root()
    }

    pub fn action(&self, id: ReferenceId) -> Option<&PlanAction> {
        self.actions.get(&id)
    }

    /// Actions in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ReferenceId, &PlanAction)> {
        self.actions.iter().map(|(id, action)| (*id, action))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of physical copies (reused files included).
    pub fn copy_count(&self) -> usize {
        self.actions
            .values()
            .filter(|a| matches!(a, PlanAction::Copy { .. }))
            .count()
    }

    /// Relative destination of `id`, following aliases.
    pub fn destination_of(&self, id: ReferenceId) -> Option<&Path> {
        match self.actions.get(&id)? {
            PlanAction::Copy { dest, .. } => Some(dest),
            PlanAction::Alias { canonical } => match self.actions.get(canonical)? {
                PlanAction::Copy { dest, .. } => Some(dest),
                _ => None,
            },
            _ => None,
        }
    }

    /// Relative path reserved for the document copy.
    pub fn document_dest(&self) -> Option<&Path> {
        self.document.as_deref()
    }

    pub fn claims(&self) -> &NameClaims {
        &self.claims
    }
}

/// Copy candidates that resolve to the same physical copy share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum CopyKey {
    Content(ContentHash),
    Source(PathBuf),
}

impl CopyKey {
    fn new(source: &Path, hash: Option<ContentHash>, consolidate: bool) -> Self {
        match hash {
            Some(hash) if consolidate => Self::Content(hash),
            _ => Self::Source(source.to_path_buf()),
        }
    }
}

/// Assign destinations under `dest_root` for every reference in `graph`.
///
/// Canonical members are chosen among copy candidates only: smallest source
/// path, then smallest id. Unhashed sources never share a destination
/// with anything but references to the same path.
///
/// # Errors
///
/// [`CollectError::NameCollisionUnresolved`] if a name runs out of suffixes.
pub fn assign(
    graph: &ReferenceGraph,
    index: &DuplicateIndex,
    options: &PlanOptions,
    dest_root: &Path,
) -> Result<DestinationPlan, CollectError> {
    let mut claims = NameClaims::new(dest_root);
    let document = options
        .document_name
        .as_deref()
        .map(|name| claims.claim(Path::new(""), name, None))
        .transpose()?
        .map(|claim| claim.path().to_path_buf());

    let mut actions = BTreeMap::new();
    let mut candidates: Vec<(&AssetReference, &Path, Option<ContentHash>)> = Vec::new();

    for reference in graph {
        let action = if reference.is_embedded {
            PlanAction::SkipEmbedded
        } else if !options.categories.contains(&reference.category)
            || options.deselected.contains(&reference.id)
        {
            PlanAction::SkipExcluded
        } else if let Some(source) = reference.source() {
            let hash = reference.content_hash.or_else(|| index.hash_of(source));
            candidates.push((reference, source, hash));
            continue;
        } else {
            PlanAction::Missing
        };
        actions.insert(reference.id, action);
    }

    // Smallest (path, id) per key is canonical
    let consolidate = options.consolidate_duplicates;
    let mut canonicals: BTreeMap<CopyKey, (&Path, ReferenceId)> = BTreeMap::new();
    for &(reference, source, hash) in &candidates {
        let entry = canonicals
            .entry(CopyKey::new(source, hash, consolidate))
            .or_insert((source, reference.id));
        if (source, reference.id) < *entry {
            *entry = (source, reference.id);
        }
    }

    for &(reference, source, hash) in &candidates {
        let Some(&(_, canonical)) = canonicals.get(&CopyKey::new(source, hash, consolidate)) else {
            continue;
        };
        if canonical != reference.id {
            actions.insert(reference.id, PlanAction::Alias { canonical });
            continue;
        }

        let dir = if options.naming.flatten {
            PathBuf::new()
        } else {
            PathBuf::from(reference.category.folder())
        };
        let name = target_file_name(reference, options.naming);
        let claim = claims.claim(&dir, &name, hash)?;
        crate::debug!("plan"; "{} -> {}", source.display(), claim.path().display());

        actions.insert(
            reference.id,
            PlanAction::Copy {
                source: source.to_path_buf(),
                reuse: claim.is_reuse(),
                dest: claim.path().to_path_buf(),
                hash,
            },
        );
    }

    Ok(DestinationPlan {
        actions,
        claims,
        document,
    })
}
