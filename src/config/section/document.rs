//! `[document]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [document]
//! copy = true               # Save a copy of the document into the destination
//! relink = true             # Point the copy at the collected files
//! relink_original = false   # Rewrite the original document as well
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSection {
    pub copy: bool,
    pub relink: bool,
    pub relink_original: bool,
}

impl Default for DocumentSection {
    fn default() -> Self {
        Self {
            copy: true,
            relink: true,
            relink_original: false,
        }
    }
}

impl DocumentSection {
    pub const RELINK: FieldPath = FieldPath::new("document.relink");
    pub const RELINK_ORIGINAL: FieldPath = FieldPath::new("document.relink_original");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.relink && !self.copy {
            diag.error_with_hint(
                Self::RELINK,
                "relinking the copy requires a document copy",
                "set `document.copy = true`, or `document.relink = false`",
            );
        }
        if self.relink_original {
            diag.warn(
                Self::RELINK_ORIGINAL,
                "the original document will be rewritten to point at the collected files",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_document_defaults() {
        let config = test_parse_config("");
        assert!(config.document.copy);
        assert!(config.document.relink);
        assert!(!config.document.relink_original);
    }

    #[test]
    fn test_relink_requires_copy() {
        let config = test_parse_config("[document]\ncopy = false");
        let mut diag = ConfigDiagnostics::new();
        config.document.validate(&mut diag);
        assert_eq!(diag.errors().len(), 1);
        assert_eq!(diag.errors()[0].field, DocumentSection::RELINK);
    }
}
