//! Progress bar implementation for CLI operations.

use console::Term;
use hammer_core::OperationHandle;
use hammer_core::OperationProgress;
use hammer_core::OperationResult;
use hammer_core::progress::LatestProgress;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// CLI progress bar fed from engine snapshots.
///
/// Displays bytes processed, throughput and ETA when stderr is a TTY.
/// Automatically cleans up on drop.
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    /// Creates a new CLI progress bar with an unknown length.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);

        // Template: "Extracting docs/a.txt [████████░░░░] 4.2 MiB/10.0 MiB (5.1 MiB/s, 2s)"
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{msg} [{bar:40.cyan/blue}] {binary_bytes}/{binary_total_bytes} ({binary_bytes_per_sec}, {eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        Self { bar }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show(quiet: bool, json: bool) -> bool {
        !quiet && !json && Term::stderr().is_term()
    }

    /// Moves the bar to the state described by `progress`.
    pub fn update(&self, progress: &OperationProgress) {
        if self.bar.length() != Some(progress.total_bytes) {
            self.bar.set_length(progress.total_bytes);
        }
        self.bar.set_position(progress.processed_bytes);
        self.bar.set_message(status_line(progress));
    }

    /// Number of bytes the bar currently shows.
    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Waits for `handle`, drawing the latest snapshot from `latest` while the
/// operation runs when `show` is set.
pub fn wait(handle: OperationHandle, latest: &LatestProgress, show: bool) -> OperationResult {
    if show {
        let progress = CliProgress::new();
        while !handle.is_finished() {
            if let Some(snapshot) = latest.take() {
                progress.update(&snapshot);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
    handle.join()
}

fn status_line(progress: &OperationProgress) -> String {
    if progress.current_file.is_empty() {
        return progress.operation.verb().to_string();
    }
    format!("{} {}", progress.operation.verb(), progress.current_file)
}
