//! Collection settings, usually from a `packrat.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [collect], [layout], [document], [pack]
//! ├── types/         # ConfigError, diagnostics, FieldPath
//! └── mod.rs         # CollectConfig (this file)
//! ```
//!
//! # Example
//!
//! ```toml
//! destination = "~/handoff/shot_010"   # Relative paths are relative to this file
//! verbose = false
//!
//! [collect]
//! exclude_unused = true
//! consolidate_duplicates = true
//!
//! [layout]
//! flatten = false
//!
//! [document]
//! copy = true
//! relink = true
//! ```

pub mod section;
pub mod types;

pub use section::{CollectSection, DocumentSection, LayoutSection, PackSection};
pub use types::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::log;
use crate::path::normalize_path;
use crate::plan::{NamingOptions, PlanOptions};
use crate::scan::ScanOptions;

/// Every caller-facing option of a collection run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Absolute path of the file this was loaded from (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Destination root; `~` is expanded
    pub destination: Option<PathBuf>,

    /// Print debug lines
    pub verbose: bool,

    pub collect: CollectSection,
    pub layout: LayoutSection,
    pub document: DocumentSection,
    pub pack: PackSection,
}

impl CollectConfig {
    pub const DESTINATION: FieldPath = FieldPath::new("destination");

    /// Parse configuration from a TOML string, warning about unknown fields.
    pub fn from_str(content: &str) -> Result<Self> {
        let (config, ignored) = Self::parse_with_ignored(content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, None);
        }
        Ok(config)
    }

    /// Load and validate a config file.
    ///
    /// A relative `destination` is taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, Some(path));
        }

        config.config_path = Some(normalize_path(path));
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: Option<&Path>) {
        let source = path
            .and_then(Path::file_name)
            .map_or_else(|| "config".into(), |n| n.to_string_lossy().into_owned());
        log!("warning"; "ignoring unknown fields in {source}: {}", fields.join(", "));
    }

    /// Check every section, printing warnings and returning all errors at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        if self
            .destination
            .as_ref()
            .is_some_and(|d| d.as_os_str().is_empty())
        {
            diag.error_with_hint(
                Self::DESTINATION,
                "destination is empty",
                "remove the field or give a directory",
            );
        }
        self.collect.validate(&mut diag);
        self.document.validate(&mut diag);
        self.pack.validate(&mut diag);

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Directory of the config file, if loaded from one.
    pub fn root(&self) -> Option<&Path> {
        self.config_path.as_deref().and_then(Path::parent)
    }

    /// Destination root with `~` expanded and relative paths anchored at
    /// the config file's directory. `None` if no destination is set.
    pub fn destination_dir(&self) -> Option<PathBuf> {
        let raw = self.destination.as_ref()?;
        let expanded = PathBuf::from(shellexpand::tilde(&raw.to_string_lossy()).into_owned());
        let full = match self.root() {
            Some(root) if expanded.is_relative() => root.join(expanded),
            _ => expanded,
        };
        Some(normalize_path(&full))
    }

    /// Turn on verbose logging if configured.
    pub fn apply_verbose(&self) {
        if self.verbose {
            crate::logger::set_verbose(true);
        }
    }

    pub const fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            exclude_unused: self.collect.exclude_unused,
        }
    }

    pub const fn naming(&self) -> NamingOptions {
        self.layout.naming()
    }

    /// Plan options; `document_name` reserves the document copy's file name.
    pub fn plan_options(&self, document_name: Option<String>) -> PlanOptions {
        PlanOptions {
            naming: self.naming(),
            consolidate_duplicates: self.collect.consolidate_duplicates,
            categories: self.collect.categories.clone(),
            deselected: self.collect.deselected.clone(),
            document_name,
        }
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Parse config, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> CollectConfig {
    let (parsed, ignored) = CollectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AssetCategory;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(CollectConfig::from_str("[collect\nworkers = 2").is_err());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "verbose = true\n[collect]\nworkerz = 3\n[unknown]\nx = 1";
        let (config, ignored) = CollectConfig::parse_with_ignored(content).unwrap();
        assert!(config.verbose);
        assert!(ignored.iter().any(|f| f.contains("workerz")));
        assert!(ignored.iter().any(|f| f.contains("unknown")));
    }

    #[test]
    fn test_plan_options_follow_sections() {
        let config = test_parse_config(
            "[collect]\nconsolidate_duplicates = true\ncategories = [\"font\"]\n[layout]\nflatten = true",
        );
        let options = config.plan_options(Some("scene.blend".into()));
        assert!(options.consolidate_duplicates);
        assert!(options.naming.flatten);
        assert!(options.categories.contains(&AssetCategory::Font));
        assert_eq!(options.categories.len(), 1);
        assert_eq!(options.document_name.as_deref(), Some("scene.blend"));
    }

    #[test]
    fn test_load_anchors_relative_destination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("packrat.toml");
        fs::write(&path, "destination = \"out/collected\"").unwrap();

        let config = CollectConfig::load(&path).unwrap();
        let expected = normalize_path(dir.path()).join("out").join("collected");
        assert_eq!(config.destination_dir(), Some(expected));
    }

    #[test]
    fn test_destination_tilde_expanded() {
        let config = test_parse_config("destination = \"~/collected\"");
        let dest = config.destination_dir().unwrap();
        assert!(dest.is_absolute());
        assert!(dest.ends_with("collected"));
        assert!(!dest.to_string_lossy().contains('~'));
    }

    #[test]
    fn test_load_reports_all_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("packrat.toml");
        fs::write(&path, "[collect]\nworkers = 0\n[document]\ncopy = false").unwrap();

        let err = CollectConfig::load(&path).unwrap_err();
        let Some(ConfigError::Diagnostics(diag)) = err.downcast_ref::<ConfigError>() else {
            panic!("expected diagnostics, got {err:?}");
        };
        assert_eq!(diag.errors().len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = CollectConfig::load(Path::new("/packrat-no-such-root/packrat.toml")).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::Io(..))));
    }
}
