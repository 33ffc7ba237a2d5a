//! Progress reporting
//!
//! Encoders and decoders notify a [`ProgressObserver`] at entry boundaries
//! only. Nothing inside the byte-level parse loop knows about progress.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Which operation an observer is watching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Compress,
    Extract,
}

/// Receives entry-boundary notifications
pub trait ProgressObserver {
    /// Called once before the first entry. `total_bytes` is the archive size
    /// when extracting; unknown when compressing.
    fn start(&mut self, operation: Operation, total_bytes: Option<u64>);

    /// Called after each entry has been fully processed. `consumed` is the
    /// number of archive bytes the entry occupies, including its header.
    fn entry(&mut self, path: &str, raw_size: u64, consumed: u64);

    /// Called once after the last entry
    fn finish(&mut self);
}

/// No-op progress observer
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn start(&mut self, _operation: Operation, _total_bytes: Option<u64>) {}
    fn entry(&mut self, _path: &str, _raw_size: u64, _consumed: u64) {}
    fn finish(&mut self) {}
}

/// Terminal progress bar
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    enabled: bool,
    entries: u64,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new(enabled: bool) -> Self {
        Self {
            bar: None,
            enabled,
            entries: 0,
        }
    }

    /// Entries seen since the last `start`
    pub fn entries(&self) -> u64 {
        self.entries
    }

    fn spinner(message: &str) -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
        {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    fn byte_bar(message: &str, total: u64) -> ProgressBar {
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%)",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

impl ProgressObserver for ProgressReporter {
    fn start(&mut self, operation: Operation, total_bytes: Option<u64>) {
        self.entries = 0;
        if !self.enabled {
            return;
        }

        let bar = match (operation, total_bytes) {
            (Operation::Extract, Some(total)) => Self::byte_bar("Extracting", total),
            (Operation::Extract, None) => Self::spinner("Extracting"),
            (Operation::Compress, _) => Self::spinner("Compressing"),
        };
        self.bar = Some(bar);
    }

    fn entry(&mut self, path: &str, _raw_size: u64, consumed: u64) {
        self.entries += 1;
        if let Some(bar) = &self.bar {
            if bar.length().is_some() {
                bar.inc(consumed);
            } else {
                bar.inc(1);
            }
            bar.set_message(path.to_string());
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message("Complete");
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
