//! Host document interface.
//!
//! The host application owns the document; this crate only sees a
//! snapshot of its references and sends requests back:
//!
//! | Direction | Call                     | Used by           |
//! |-----------|--------------------------|-------------------|
//! | read      | `enumerate_references`   | scan              |
//! | read      | `project_base_dir`       | scan, unpack      |
//! | write     | `set_path`               | relink, unpack    |
//! | write     | `embed_blob`             | pack              |
//! | read      | `extract_blob`           | unpack            |
//! | write     | `release_blob`           | unpack            |
//! | write     | `save_copy`              | project           |
//!
//! Implementations are not required to be thread-safe: every call happens
//! on the thread that owns the operation.

mod memory;

pub use memory::MemoryDocument;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::AssetCategory;

/// Position of a reference in the host's enumeration snapshot.
///
/// Only meaningful for the snapshot it came from. A document copy made with
/// [`HostDocument::save_copy`] enumerates in the same order, so ids stay
/// valid for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferenceId(pub usize);

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One raw reference record from the host (one datablock/path pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReference {
    /// Path string as stored (`//` prefix means project-relative)
    pub stored_path: String,
    pub category: AssetCategory,
    /// Human-readable datablock identifier
    pub datablock_name: String,
    /// Bytes are stored inside the document
    #[serde(default)]
    pub is_embedded: bool,
    /// Reachable from the active scene/output, as classified by the host
    #[serde(default = "default_used")]
    pub is_used: bool,
}

const fn default_used() -> bool {
    true
}

impl RawReference {
    /// A used, non-embedded reference.
    pub fn new(
        category: AssetCategory,
        datablock_name: impl Into<String>,
        stored_path: impl Into<String>,
    ) -> Self {
        Self {
            stored_path: stored_path.into(),
            category,
            datablock_name: datablock_name.into(),
            is_embedded: false,
            is_used: true,
        }
    }

    pub fn embedded(mut self) -> Self {
        self.is_embedded = true;
        self
    }

    pub fn unused(mut self) -> Self {
        self.is_used = false;
        self
    }
}

/// Errors reported by a host document.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown reference {0}")]
    UnknownReference(ReferenceId),

    #[error("reference {0} has no embedded data")]
    NotEmbedded(ReferenceId),

    #[error("document has never been saved")]
    Unsaved,

    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] io::Error),

    #[error("document manifest is invalid")]
    Manifest(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),
}

/// Receives path rewrites for one document (the original or a copy).
pub trait DocumentWriter {
    /// Point reference `id` at `new_path` (stored form).
    fn set_path(&mut self, id: ReferenceId, new_path: &str) -> Result<(), HostError>;

    /// Persist pending changes. Called once after a batch of `set_path`.
    fn flush(&mut self) -> Result<(), HostError> {
        Ok(())
    }
}

/// The host document model as seen by this crate.
pub trait HostDocument: DocumentWriter {
    /// Read-only snapshot of every external reference, in a stable order.
    fn enumerate_references(&self) -> Vec<RawReference>;

    /// File path of the saved document, `None` if never saved.
    fn document_path(&self) -> Option<PathBuf>;

    /// Directory project-relative paths resolve against.
    fn project_base_dir(&self) -> Option<PathBuf> {
        self.document_path()
            .and_then(|p| p.parent().map(Path::to_path_buf))
    }

    /// Store `bytes` inside the document for reference `id` and mark it embedded.
    fn embed_blob(&mut self, id: ReferenceId, bytes: Vec<u8>) -> Result<(), HostError>;

    /// Embedded bytes of reference `id`.
    fn extract_blob(&self, id: ReferenceId) -> Result<Vec<u8>, HostError>;

    /// Drop the embedded bytes of `id`; the reference then points at its path again.
    fn release_blob(&mut self, id: ReferenceId) -> Result<(), HostError>;

    /// Write a copy of the document to `dest` and return a writer for it.
    ///
    /// Path rewrites through the returned writer only affect the copy.
    fn save_copy(&self, dest: &Path) -> Result<Box<dyn DocumentWriter>, HostError>;
}
