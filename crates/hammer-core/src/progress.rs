//! Progress channel from running operations to their caller.
//!
//! Operations push [`OperationProgress`] snapshots into a [`ProgressSink`].
//! Sinks must return quickly and must never block the producing thread:
//! the provided sinks either drop the snapshot or overwrite the previous
//! one.
//!
//! Snapshots are pushed at entry boundaries and, while a single large
//! entry is streaming, every [`BYTE_REPORT_INTERVAL`] bytes.

use std::fmt;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::mpsc::SyncSender;
use std::sync::mpsc::TrySendError;
use std::time::Duration;
use std::time::Instant;

/// Minimum number of bytes between two mid-entry progress snapshots (1 MB).
pub const BYTE_REPORT_INTERVAL: u64 = 1024 * 1024;

/// Kind of operation a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Creating a new archive.
    Compress,
    /// Extracting entries to disk.
    Extract,
    /// Integrity test.
    Test,
    /// Removing entries by rebuild.
    Delete,
    /// Adding entries by rebuild.
    Add,
}

impl OperationKind {
    /// Verb used at the start of status text.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Compress => "Compressing",
            Self::Extract => "Extracting",
            Self::Test => "Testing",
            Self::Delete => "Processing",
            Self::Add => "Adding",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Compress => "compress",
            Self::Extract => "extract",
            Self::Test => "test",
            Self::Delete => "delete",
            Self::Add => "add",
        };
        f.write_str(name)
    }
}

/// Point-in-time snapshot of a running operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationProgress {
    /// Operation producing the snapshot.
    pub operation: OperationKind,
    /// Entry or source file currently being processed.
    pub current_file: String,
    /// Bytes processed so far.
    pub processed_bytes: u64,
    /// Bytes expected in total, 0 when unknown.
    pub total_bytes: u64,
    /// Files completed so far.
    pub processed_files: usize,
    /// Files expected in total.
    pub total_files: usize,
    /// Time since the operation started.
    pub elapsed: Duration,
    /// Estimated time remaining, when it can be computed.
    pub estimated_remaining: Option<Duration>,
    /// Average throughput since start.
    pub bytes_per_second: f64,
    /// The operation polls a cancellation token.
    pub can_cancel: bool,
    /// Human-readable status line.
    pub status: String,
}

impl OperationProgress {
    /// Percentage of bytes processed, 0 when the total is unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// use hammer_core::progress::OperationKind;
    /// use hammer_core::progress::OperationProgress;
    ///
    /// let mut progress = OperationProgress::new(OperationKind::Extract);
    /// assert_eq!(progress.percent_complete(), 0.0);
    ///
    /// progress.total_bytes = 200;
    /// progress.processed_bytes = 50;
    /// assert_eq!(progress.percent_complete(), 25.0);
    /// ```
    #[must_use]
    pub fn percent_complete(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.processed_bytes as f64 / self.total_bytes as f64 * 100.0
    }

    /// Creates an empty snapshot for `operation`.
    #[must_use]
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            current_file: String::new(),
            processed_bytes: 0,
            total_bytes: 0,
            processed_files: 0,
            total_files: 0,
            elapsed: Duration::ZERO,
            estimated_remaining: None,
            bytes_per_second: 0.0,
            can_cancel: true,
            status: String::new(),
        }
    }
}

/// Receiver of progress snapshots.
///
/// Implementations are called from the operation's worker thread and must
/// not block it.
///
/// Any `Fn(&OperationProgress) + Send + Sync` closure is a sink:
///
/// ```
/// use hammer_core::progress::OperationKind;
/// use hammer_core::progress::OperationProgress;
/// use hammer_core::progress::ProgressSink;
///
/// let sink = |p: &OperationProgress| println!("{:.1}%", p.percent_complete());
/// sink.report(&OperationProgress::new(OperationKind::Test));
/// ```
pub trait ProgressSink: Send + Sync {
    /// Receives one snapshot.
    fn report(&self, progress: &OperationProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&OperationProgress) + Send + Sync,
{
    fn report(&self, progress: &OperationProgress) {
        self(progress);
    }
}

/// Sink that discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _progress: &OperationProgress) {}
}

/// Sink that keeps only the most recent snapshot.
///
/// Useful for UIs that poll on their own schedule.
#[derive(Debug, Default)]
pub struct LatestProgress {
    slot: Mutex<Option<OperationProgress>>,
}

impl LatestProgress {
    /// Creates an empty holder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the most recent snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<OperationProgress> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns the most recent snapshot.
    pub fn take(&self) -> Option<OperationProgress> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl ProgressSink for LatestProgress {
    fn report(&self, progress: &OperationProgress) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(progress.clone());
    }
}

/// Sink forwarding snapshots over a bounded channel.
///
/// When the channel is full the snapshot is dropped instead of blocking.
/// A disconnected receiver is ignored.
#[derive(Debug)]
pub struct ChannelProgress {
    tx: SyncSender<OperationProgress>,
}

impl ChannelProgress {
    /// Wraps the sending half of `std::sync::mpsc::sync_channel`.
    #[must_use]
    pub fn new(tx: SyncSender<OperationProgress>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, progress: &OperationProgress) {
        match self.tx.try_send(progress.clone()) {
            Ok(()) | Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Tracks running totals for one operation and emits snapshots.
pub(crate) struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    snapshot: OperationProgress,
    started: Instant,
    unreported_bytes: u64,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(
        sink: &'a dyn ProgressSink,
        operation: OperationKind,
        total_files: usize,
        total_bytes: u64,
    ) -> Self {
        let mut snapshot = OperationProgress::new(operation);
        snapshot.total_files = total_files;
        snapshot.total_bytes = total_bytes;
        Self {
            sink,
            snapshot,
            started: Instant::now(),
            unreported_bytes: 0,
        }
    }

    pub(crate) fn start_entry(&mut self, name: &str) {
        self.snapshot.current_file.clear();
        self.snapshot.current_file.push_str(name);
        self.snapshot.status = format!("{}: {name}", self.snapshot.operation.verb());
    }

    /// Records streamed bytes, emitting a snapshot every interval.
    pub(crate) fn add_bytes(&mut self, bytes: u64) {
        self.snapshot.processed_bytes = self.snapshot.processed_bytes.saturating_add(bytes);
        self.unreported_bytes = self.unreported_bytes.saturating_add(bytes);
        if self.unreported_bytes >= BYTE_REPORT_INTERVAL {
            self.emit();
        }
    }

    /// Marks the current entry done and emits a snapshot.
    pub(crate) fn finish_entry(&mut self) {
        self.snapshot.processed_files += 1;
        self.emit();
    }

    /// Emits a snapshot without changing counters.
    pub(crate) fn emit(&mut self) {
        self.unreported_bytes = 0;
        self.refresh_rates();
        self.sink.report(&self.snapshot);
    }

    #[cfg(test)]
    pub(crate) fn processed_bytes(&self) -> u64 {
        self.snapshot.processed_bytes
    }

    fn refresh_rates(&mut self) {
        let elapsed = self.started.elapsed();
        self.snapshot.elapsed = elapsed;

        let secs = elapsed.as_secs_f64();
        let processed = self.snapshot.processed_bytes;
        self.snapshot.bytes_per_second = if secs > 0.0 {
            processed as f64 / secs
        } else {
            0.0
        };

        let total = self.snapshot.total_bytes;
        self.snapshot.estimated_remaining = if processed > 0 && total > processed {
            let remaining = (total - processed) as f64 / processed as f64;
            Some(elapsed.mul_f64(remaining))
        } else if total > 0 && processed >= total {
            Some(Duration::ZERO)
        } else {
            None
        };
    }
}
