//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to receive
//! real-time events as the runner works through the batch.
//!
//! Callbacks are the least-invasive integration point: callers can forward
//! events to a terminal progress bar, a channel, or a UI without the
//! library knowing how the host application communicates. All methods have
//! default no-op implementations so callers only override what they care
//! about.

use std::sync::Arc;

/// Called by the batch runner as it processes each document.
///
/// The runner is strictly sequential, so events for a batch arrive in
/// order and never concurrently. Implementations still must be
/// `Send + Sync` because the callback is shared behind an `Arc`.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any document is processed.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before a document's analysis begins.
    ///
    /// `fraction` is the completed share so far (`index / total`); it
    /// increases monotonically across the run and reaches 1.0 only in
    /// [`on_batch_complete`](Self::on_batch_complete).
    fn on_document_start(&self, index: usize, total: usize, name: &str, fraction: f64) {
        let _ = (index, total, name, fraction);
    }

    /// Called when a document's analysis produced a success record.
    fn on_document_complete(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a document's analysis failed (its outcome is still
    /// recorded; the batch continues).
    fn on_document_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once after the last document, with progress 1.0.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
