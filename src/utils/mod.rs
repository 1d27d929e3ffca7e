//! Small shared helpers.

mod fmt;
mod fs;

pub use fmt::{format_size, plural_count, plural_s};
pub use fs::{copy_atomic, write_atomic};
