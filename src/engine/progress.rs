//! Progress bar utilities for displaying collection status

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    /// Create a new progress bar configuration
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " results"
    )))
}

/// Update progress bar if available.
/// Uses try_lock so a contended bar skips an update instead of blocking the collector.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Final refresh and newline so log lines after the bar start on a clean line.
pub fn finish_progress_bar(pb: &ProgressBar) {
    if let Ok(mut pb) = pb.lock() {
        let _ = pb.refresh();
        eprintln!();
    }
}

/// Bar for a verbose run with `expected` results; None when not verbose.
pub fn setup_progress(verbose: bool, expected: usize) -> Option<ProgressBar> {
    verbose.then(|| {
        create_progress_bar(ProgressBarConfig::new(
            expected,
            "Collecting",
            Animation::Classic,
        ))
    })
}
