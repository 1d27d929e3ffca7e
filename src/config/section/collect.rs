//! `[collect]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [collect]
//! exclude_unused = true              # Skip data the active output never uses
//! consolidate_duplicates = true      # One copy per distinct content
//! categories = ["image", "sound"]    # Default: every category
//! workers = 4                        # Parallel hash/copy workers (1-64)
//! progress = true                    # Single-line progress counters
//! deselected = [3, 7]                # Reference ids to leave out
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use rustc_hash::FxHashSet;

use crate::core::{AssetCategory, CategorySet, DEFAULT_WORKERS, MAX_WORKERS};
use crate::host::ReferenceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectSection {
    pub exclude_unused: bool,
    pub consolidate_duplicates: bool,
    pub categories: CategorySet,
    pub workers: usize,
    pub progress: bool,
    /// References the user unticked; collected like an excluded category
    pub deselected: FxHashSet<ReferenceId>,
}

impl Default for CollectSection {
    fn default() -> Self {
        Self {
            exclude_unused: false,
            consolidate_duplicates: false,
            categories: AssetCategory::all(),
            workers: DEFAULT_WORKERS,
            progress: true,
            deselected: FxHashSet::default(),
        }
    }
}

impl CollectSection {
    pub const CATEGORIES: FieldPath = FieldPath::new("collect.categories");
    pub const WORKERS: FieldPath = FieldPath::new("collect.workers");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !(1..=MAX_WORKERS).contains(&self.workers) {
            diag.error_with_hint(
                Self::WORKERS,
                format!("{} workers is out of range", self.workers),
                format!("use a value between 1 and {MAX_WORKERS}"),
            );
        }
        if self.categories.is_empty() {
            diag.error_with_hint(
                Self::CATEGORIES,
                "no categories selected, nothing would be collected",
                "remove the field to collect every category",
            );
        }
    }
}
