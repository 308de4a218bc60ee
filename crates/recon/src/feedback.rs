//! Host capabilities injected into a run: cancellation and progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Host-side hooks polled by the engine between records.
///
/// Must be `Sync`: neighbour queries may poll it from worker threads.
pub trait Feedback: Sync {
    /// Checked between records. Once true, the run stops cleanly and
    /// returns what it has fully produced.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Progress in percent, 0..=100.
    fn set_progress(&self, _percent: f64) {}
}

/// Feedback for headless runs: never cancels, discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {}

/// Shared cancellation flag a host can flip from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Feedback for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Throttled percentage reporter over a known number of steps.
pub(crate) struct Progress<'a> {
    feedback: &'a dyn Feedback,
    total: usize,
    last: i64,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(feedback: &'a dyn Feedback, total: usize) -> Self {
        Self { feedback, total, last: -1 }
    }

    pub(crate) fn step(&mut self, done: usize) {
        if self.total == 0 {
            return;
        }
        let pct = (done as f64 * 100.0 / self.total as f64).min(100.0);
        if pct as i64 > self.last {
            self.last = pct as i64;
            self.feedback.set_progress(pct);
        }
    }
}
