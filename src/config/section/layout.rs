//! `[layout]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [layout]
//! flatten = false                # true: every file in the destination root
//! rename_to_datablock = false    # true: name files after their datablock
//! ```

use serde::{Deserialize, Serialize};

use crate::plan::NamingOptions;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSection {
    pub flatten: bool,
    pub rename_to_datablock: bool,
}

impl LayoutSection {
    pub const fn naming(self) -> NamingOptions {
        NamingOptions {
            flatten: self.flatten,
            rename_to_datablock: self.rename_to_datablock,
        }
    }
}
