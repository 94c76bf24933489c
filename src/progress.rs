//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the extractor pulls each page through its stages.
//!
//! Callers can forward events to a channel, a log, or a terminal progress
//! bar without the library knowing how the host application communicates.
//! The trait is `Send + Sync` so an extractor carrying it can move onto a
//! blocking thread (see [`crate::stream::extract_stream`]).
//!
//! # Example
//!
//! ```rust
//! use pdf_slicer::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FallbackCounter {
//!     fallbacks: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for FallbackCounter {
//!     fn on_stage_fallback(&self, page_no: usize, _from: &str, to: &str) {
//!         self.fallbacks.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_no}: retrying with {to}");
//!     }
//! }
//!
//! let counter = Arc::new(FallbackCounter { fallbacks: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extractor as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events for one extraction arrive sequentially, in
/// page order.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the page range is known, before any page is converted.
    ///
    /// # Arguments
    /// * `first_page` — 1-indexed first page
    /// * `last_page`  — 1-indexed last page (inclusive)
    fn on_extraction_start(&self, first_page: usize, last_page: usize) {
        let _ = (first_page, last_page);
    }

    /// Called before the first stage runs on a page.
    fn on_page_start(&self, page_no: usize) {
        let _ = page_no;
    }

    /// Called when a stage's result is rejected and the next stage is tried.
    ///
    /// # Arguments
    /// * `page_no` — 1-indexed page number
    /// * `from`    — stage whose result was rejected (`"fast"`)
    /// * `to`      — stage about to run (`"full-ocr"`)
    fn on_stage_fallback(&self, page_no: usize, from: &str, to: &str) {
        let _ = (page_no, from, to);
    }

    /// Called when a page was accepted from some stage.
    ///
    /// # Arguments
    /// * `page_no`     — 1-indexed page number
    /// * `slice_count` — number of slices the page will contribute
    fn on_page_complete(&self, page_no: usize, slice_count: usize) {
        let _ = (page_no, slice_count);
    }

    /// Called when no stage produced a document for a page.
    fn on_page_skipped(&self, page_no: usize) {
        let _ = page_no;
    }

    /// Called once after the last page of the range was pulled.
    ///
    /// # Arguments
    /// * `page_count`  — pages accepted
    /// * `slice_count` — slices numbered across the whole range
    fn on_extraction_complete(&self, page_count: usize, slice_count: usize) {
        let _ = (page_count, slice_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: Arc<AtomicUsize>,
        completes: Arc<AtomicUsize>,
        fallbacks: Arc<AtomicUsize>,
        skipped: Arc<AtomicUsize>,
        total_slices: Arc<AtomicUsize>,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_no: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_fallback(&self, _page_no: usize, _from: &str, _to: &str) {
            self.fallbacks.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_no: usize, _slice_count: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_skipped(&self, _page_no: usize) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }

        fn on_extraction_complete(&self, _page_count: usize, slice_count: usize) {
            self.total_slices.store(slice_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(1, 5);
        cb.on_page_start(1);
        cb.on_stage_fallback(1, "fast", "full-ocr");
        cb.on_page_complete(1, 12);
        cb.on_page_skipped(2);
        cb.on_extraction_complete(4, 40);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: Arc::new(AtomicUsize::new(0)),
            completes: Arc::new(AtomicUsize::new(0)),
            fallbacks: Arc::new(AtomicUsize::new(0)),
            skipped: Arc::new(AtomicUsize::new(0)),
            total_slices: Arc::new(AtomicUsize::new(0)),
        };

        tracker.on_page_start(1);
        tracker.on_page_complete(1, 4);
        tracker.on_page_start(2);
        tracker.on_stage_fallback(2, "fast", "full-ocr");
        tracker.on_page_complete(2, 0);
        tracker.on_page_start(3);
        tracker.on_page_skipped(3);
        tracker.on_extraction_complete(2, 4);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.fallbacks.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.total_slices.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ExtractionProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_extraction_start(1, 10);
        cb.on_page_start(1);
        cb.on_page_complete(1, 3);
    }
}
