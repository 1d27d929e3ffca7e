//! Bounded worker pools for I/O-bound batches (hashing, copying).

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Default number of I/O workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Upper bound on I/O workers, keeps file-handle pressure sane.
pub const MAX_WORKERS: usize = 64;

/// Build a dedicated pool with `workers` threads, clamped to `1..=MAX_WORKERS`.
pub fn io_pool(workers: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(workers.clamp(1, MAX_WORKERS))
        .thread_name(|i| format!("packrat-io-{i}"))
        .build()
}
