use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives per-row feedback while a batch runs.
pub trait ProgressReporter {
    /// Called after each row, successful or not.
    fn on_progress(&self, done: usize, total: usize, status: &str);

    /// Called when a row fails. `row` is zero-based.
    fn on_error(&self, row: usize, message: &str);
}

/// Reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn on_progress(&self, done: usize, total: usize, status: &str) {
        tracing::info!(done, total, "{status}");
    }

    fn on_error(&self, row: usize, message: &str) {
        tracing::warn!(row = row + 1, "{message}");
    }
}

/// Discards all feedback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn on_progress(&self, _done: usize, _total: usize, _status: &str) {}

    fn on_error(&self, _row: usize, _message: &str) {}
}

/// Shared flag asking a running batch to stop before its next row.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }
}
