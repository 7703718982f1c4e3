//! Cooperative cancellation for batch runs.
//!
//! The runner checks the token between documents and the pipeline checks it
//! before each retry attempt; nothing interrupts a remote call already in
//! flight (the per-call HTTP timeout bounds those). Cancelled documents
//! still produce an outcome, so a cancelled batch keeps the
//! one-outcome-per-document invariant.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Clonable cancellation flag shared between a batch run and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; never un-cancels.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
