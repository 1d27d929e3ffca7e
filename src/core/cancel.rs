//! Cooperative cancellation for collection, pack and unpack runs.
//!
//! Workers check the token between reference-level units of work. A unit
//! that already started (one copy, one hash) always runs to completion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Create a token that is cancelled by Ctrl+C.
    ///
    /// Installs the process-wide handler, so it can only succeed once per
    /// process.
    pub fn on_ctrlc() -> Result<Self, ctrlc::Error> {
        let token = Self::new();
        let handle = token.clone();
        ctrlc::set_handler(move || handle.cancel())?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
