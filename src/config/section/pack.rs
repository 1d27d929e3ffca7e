//! `[pack]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [pack]
//! categories = ["image", "font"]   # Default: every category
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::core::{AssetCategory, CategorySet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackSection {
    pub categories: CategorySet,
}

impl Default for PackSection {
    fn default() -> Self {
        Self {
            categories: AssetCategory::all(),
        }
    }
}

impl PackSection {
    pub const CATEGORIES: FieldPath = FieldPath::new("pack.categories");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.categories.is_empty() {
            diag.warn(Self::CATEGORIES, "no categories selected, pack will do nothing");
        }
    }
}
