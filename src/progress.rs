//! Progress-callback trait for per-document review events.
//!
//! Inject an [`Arc<dyn ReviewProgressCallback>`] via
//! [`crate::config::ReviewConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through a batch. The CLI uses this to
//! drive its progress bar; library callers can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use paper2notion::{ReviewConfig, ReviewProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl ReviewProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, document_id: &str) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{}/{}] {} filed", index, total, document_id);
//!     }
//! }
//!
//! let config = ReviewConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { written: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each document.
///
/// Documents are processed one at a time, so calls never overlap, but the
/// trait is still `Send + Sync` because the batch future may move between
/// runtime threads. All methods default to no-ops.
pub trait ReviewProgressCallback: Send + Sync {
    /// Called once before the first document starts.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called when a document starts.
    ///
    /// # Arguments
    /// * `index`       — 1-indexed position in the batch
    /// * `total`       — batch size
    /// * `document_id` — task identifier (usually the BibTeX key)
    fn on_document_start(&self, index: usize, total: usize, document_id: &str) {
        let _ = (index, total, document_id);
    }

    /// Called when a document's page was written.
    fn on_document_complete(&self, index: usize, total: usize, document_id: &str) {
        let _ = (index, total, document_id);
    }

    /// Called when a document failed or was cancelled.
    ///
    /// `error` is the outcome message.
    fn on_document_error(&self, index: usize, total: usize, document_id: &str, error: &str) {
        let _ = (index, total, document_id, error);
    }

    /// Called once after the batch ends, interrupted or not.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReviewProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReviewConfig`].
pub type ProgressCallback = Arc<dyn ReviewProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        final_success: AtomicUsize,
    }

    impl ReviewProgressCallback for TrackingCallback {
        fn on_document_start(&self, _index: usize, _total: usize, _id: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _index: usize, _total: usize, _id: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _index: usize, _total: usize, _id: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.final_success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start(1, 2, "a");
        cb.on_document_complete(1, 2, "a");
        cb.on_document_error(2, 2, "b", "timeout");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_document_start(1, 2, "a");
        tracker.on_document_complete(1, 2, "a");
        tracker.on_document_start(2, 2, "b");
        tracker.on_document_error(2, 2, "b", "schema");
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.final_success.load(Ordering::SeqCst), 1);
    }
}
