//! Progress-callback trait for per-file conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through a batch.
//!
//! Each method corresponds to one `(status, progress)` pair of the job it
//! names:
//!
//! | method | status | progress |
//! |--------|--------|----------|
//! | `on_job_start` | converting | 0 |
//! | `on_job_progress` | converting | heartbeat value |
//! | `on_job_complete` | completed | 100 |
//! | `on_job_error` | error | 0 |
//! | `on_job_cancelled` | cancelled | 0 |
//!
//! Files are converted one at a time, so every event of file *i* arrives
//! before the first event of file *i + 1*. Progress is a heartbeat, not a
//! measurement: do not read it as "bytes processed".
//!
//! # Example
//!
//! ```rust
//! use fileconv::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_job_complete(&self, index: usize, total: usize, output_name: &str, _bytes: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{}/{} done: #{} → {}", done, total, index, output_name);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is the 0-based position of the file in the
/// batch and `total` the batch size.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after the conversion key resolved and before any file starts.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// A file entered `Converting`.
    fn on_job_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Heartbeat moved the file's progress to `percent`.
    fn on_job_progress(&self, index: usize, total: usize, percent: u8) {
        let _ = (index, total, percent);
    }

    /// The file converted and its output was delivered.
    fn on_job_complete(&self, index: usize, total: usize, output_name: &str, bytes: usize) {
        let _ = (index, total, output_name, bytes);
    }

    /// The file failed; the rest of the batch continues.
    fn on_job_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// The batch was cancelled before this file started.
    fn on_job_cancelled(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called once after every file reached a terminal state.
    fn on_batch_complete(&self, total: usize, completed: usize) {
        let _ = (total, completed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        ticks: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        batch_total: AtomicUsize,
        batch_completed: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total: usize) {
            self.batch_total.store(total, Ordering::SeqCst);
        }

        fn on_job_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_progress(&self, _index: usize, _total: usize, _percent: u8) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_complete(&self, _index: usize, _total: usize, _name: &str, _bytes: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_error(&self, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, completed: usize) {
            self.batch_completed.store(completed, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_job_start(0, 2, "a.svg");
        cb.on_job_progress(0, 2, 10);
        cb.on_job_complete(0, 2, "converted-a.png", 42);
        cb.on_job_error(1, 2, "some error");
        cb.on_job_cancelled(1, 2);
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(2);
        tracker.on_job_start(0, 2, "a.png");
        tracker.on_job_progress(0, 2, 10);
        tracker.on_job_complete(0, 2, "converted-a.webp", 100);
        tracker.on_job_start(1, 2, "b.png");
        tracker.on_job_error(1, 2, "could not decode input");
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.ticks.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.batch_completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(1);
        cb.on_job_start(0, 1, "x.svg");
    }
}
