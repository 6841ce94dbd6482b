//! Terminal result of an operation.

use crate::ArchiveError;
use crate::progress::OperationKind;
use std::time::Duration;

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Every item was processed.
    Completed,
    /// The operation ran to the end but some items failed.
    CompletedWithErrors,
    /// Cancellation was observed before the end.
    Cancelled,
    /// The operation was aborted by an archive-level failure.
    Failed,
}

/// The single result produced by every operation call.
#[derive(Debug)]
pub struct OperationResult {
    /// Operation that produced the result.
    pub operation: OperationKind,
    /// `true` only for [`Outcome::Completed`].
    pub success: bool,
    /// Terminal state.
    pub outcome: Outcome,
    /// Human-readable summary.
    pub message: String,
    /// Archive-level failure cause, if any.
    pub error: Option<ArchiveError>,
    /// Items processed successfully, in processing order.
    pub processed: Vec<String>,
    /// Per-item failures, in processing order.
    pub errors: Vec<String>,
    /// Non-fatal notices.
    pub warnings: Vec<String>,
    /// Wall-clock duration of the operation.
    pub duration: Duration,
}

impl OperationResult {
    /// Creates an empty result that will be completed later.
    #[must_use]
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            success: false,
            outcome: Outcome::Failed,
            message: String::new(),
            error: None,
            processed: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Shortcut for a result that failed before any work started.
    #[must_use]
    pub fn rejected(operation: OperationKind, error: ArchiveError) -> Self {
        let mut result = Self::new(operation);
        result.fail(error);
        result
    }

    /// Records a per-item failure.
    pub fn add_error(&mut self, item: &str, error: &ArchiveError) {
        self.errors.push(format!("{item}: {error}"));
    }

    /// Records a warning.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Marks the operation as finished and sets the summary message.
    pub fn complete(&mut self) {
        if self.errors.is_empty() {
            self.success = true;
            self.outcome = Outcome::Completed;
            self.message = success_message(self.operation).to_string();
        } else {
            self.success = false;
            self.outcome = Outcome::CompletedWithErrors;
            self.message = partial_message(self.operation, self.errors.len());
        }
    }

    /// Marks the operation as cancelled.
    pub fn cancel(&mut self) {
        self.success = false;
        self.outcome = Outcome::Cancelled;
        self.message = format!("{} cancelled by user", noun(self.operation));
    }

    /// Marks the operation as failed with `error` as its cause.
    ///
    /// A [`ArchiveError::Cancelled`] cause is turned into a cancellation.
    pub fn fail(&mut self, error: ArchiveError) {
        if error.is_cancellation() {
            self.cancel();
            return;
        }
        self.success = false;
        self.outcome = Outcome::Failed;
        self.message = format!("{} failed: {error}", noun(self.operation));
        self.error = Some(error);
    }

    /// Returns `true` if the operation ended in cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.outcome == Outcome::Cancelled
    }
}

const fn noun(operation: OperationKind) -> &'static str {
    match operation {
        OperationKind::Compress => "Compression",
        OperationKind::Extract => "Extraction",
        OperationKind::Test => "Archive test",
        OperationKind::Delete => "Deleting files",
        OperationKind::Add => "Adding files",
    }
}

const fn success_message(operation: OperationKind) -> &'static str {
    match operation {
        OperationKind::Compress => "Compression completed successfully",
        OperationKind::Extract => "Extraction completed successfully",
        OperationKind::Test => "Archive test passed",
        OperationKind::Delete => "Files deleted successfully",
        OperationKind::Add => "Files added successfully",
    }
}

fn partial_message(operation: OperationKind, errors: usize) -> String {
    match operation {
        OperationKind::Test => format!("Archive test found {errors} errors"),
        other => format!("{} completed with {errors} errors", noun(other)),
    }
}
