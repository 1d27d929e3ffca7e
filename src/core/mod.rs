//! Core types - pure abstractions shared across the codebase.

mod cancel;
mod category;
mod pool;

pub use cancel::CancelToken;
pub use category::{AssetCategory, CategorySet};
pub use pool::{DEFAULT_WORKERS, MAX_WORKERS, io_pool};
