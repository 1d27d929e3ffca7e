//! Error taxonomy for collection, relink and pack runs.
//!
//! Two levels:
//! - [`CollectError`]: aborts a whole operation (global preconditions only)
//! - [`Failure`]: one reference failed; recorded in the result set and the
//!   batch continues

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::host::HostError;

// ============================================================================
// CollectError
// ============================================================================

/// Errors that abort an operation before (or instead of) per-reference work.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Path cannot be made absolute (e.g. project-relative, document unsaved)
    #[error("cannot resolve `{path}`: {reason}")]
    Unresolvable { path: String, reason: &'static str },

    #[error("`{0}` does not exist")]
    Missing(PathBuf),

    #[error("permission denied for `{0}`")]
    PermissionDenied(PathBuf, #[source] io::Error),

    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] io::Error),

    /// The namer ran out of suffixes. Indicates a broken invariant.
    #[error("no free destination name left for `{0}`")]
    NameCollisionUnresolved(PathBuf),

    #[error("operation cancelled")]
    Cancelled,

    #[error("host document error")]
    Host(#[from] HostError),

    #[error("failed to start worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{0}")]
    Precondition(String),
}

impl CollectError {
    /// Classify an IO error on `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::Missing(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf(), err),
            _ => Self::Io(path.to_path_buf(), err),
        }
    }

    /// Project-relative path with no saved project to resolve against.
    pub fn unsaved(path: impl Into<String>) -> Self {
        Self::Unresolvable {
            path: path.into(),
            reason: "project-relative path but the document has never been saved",
        }
    }
}

// ============================================================================
// Failure (per-reference)
// ============================================================================

/// Category of a per-reference failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    PermissionDenied,
    Io,
    Host,
    NameCollisionUnresolved,
}

impl FailureKind {
    /// Classify an IO error.
    pub fn of(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io,
        }
    }
}

/// A per-reference failure, recorded in a report instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
}

impl Failure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    /// Classify an IO error on `path`, keeping the OS message.
    pub fn io(path: &Path, err: &io::Error) -> Self {
        Self::new(FailureKind::of(err), format!("{}: {err}", path.display()))
    }

    pub fn host(err: &HostError) -> Self {
        Self::new(FailureKind::Host, err.to_string())
    }
}

impl From<&CollectError> for Failure {
    fn from(err: &CollectError) -> Self {
        let kind = match err {
            CollectError::PermissionDenied(..) => FailureKind::PermissionDenied,
            CollectError::Host(_) => FailureKind::Host,
            CollectError::NameCollisionUnresolved(_) => FailureKind::NameCollisionUnresolved,
            _ => FailureKind::Io,
        };
        let reason = match std::error::Error::source(err) {
            Some(source) => format!("{err}: {source}"),
            None => err.to_string(),
        };
        Self::new(kind, reason)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classification() {
        let path = Path::new("/x/a.png");
        let err = CollectError::from_io(path, io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(err, CollectError::Missing(_)));

        let err = CollectError::from_io(
            path,
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, CollectError::PermissionDenied(..)));

        let err = CollectError::from_io(path, io::Error::other("disk full"));
        assert!(matches!(err, CollectError::Io(..)));
    }

    #[test]
    fn test_failure_keeps_source_message() {
        let err = CollectError::Io(PathBuf::from("a.png"), io::Error::other("disk full"));
        let failure = Failure::from(&err);
        assert_eq!(failure.kind, FailureKind::Io);
        assert!(failure.reason.contains("a.png"));
        assert!(failure.reason.contains("disk full"));
    }

    #[test]
    fn test_failure_io_permission() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let failure = Failure::io(Path::new("/locked/tex.png"), &err);
        assert_eq!(failure.kind, FailureKind::PermissionDenied);
        assert_eq!(failure.to_string(), "/locked/tex.png: denied");
    }

    #[test]
    fn test_unsaved_display() {
        let err = CollectError::unsaved("//textures/a.png");
        let display = err.to_string();
        assert!(display.contains("//textures/a.png"));
        assert!(display.contains("never been saved"));
    }
}
