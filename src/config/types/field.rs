//! Dotted config field paths for diagnostics.

use owo_colors::OwoColorize;
use std::fmt;

/// Path of a config field, e.g. `collect.workers`.
///
/// Sections expose their fields as associated constants so diagnostics
/// never spell a path by hand:
///
/// ```ignore
/// diag.error(CollectSection::WORKERS, "must be at least 1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath(pub &'static str);

impl FieldPath {
    #[inline]
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_args!("`{}`", self.0).bright_blue())
    }
}
