use docmerge_core::batch::progress::ProgressReporter;

/// Prints one line per row on stderr.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn on_progress(&self, done: usize, total: usize, status: &str) {
        let pct = if total == 0 { 100 } else { done * 100 / total };
        eprintln!("[{done}/{total} {pct:>3}%] {status}");
    }

    fn on_error(&self, row: usize, message: &str) {
        eprintln!("  error in row {}: {message}", row + 1);
    }
}
