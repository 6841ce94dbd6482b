//! The archive operations: extract, compress, test, add and delete.
//!
//! Each operation runs to completion on the calling thread and returns
//! exactly one [`OperationResult`]; failures are folded into the result
//! instead of being returned as `Err`. [`crate::ArchiveEngine`] wraps these
//! functions to run them on background threads.

mod compress;
mod extract;
mod inspect;
mod mutate;
mod verify;

pub use compress::compress;
pub use extract::extract;
pub use inspect::list_entries;
pub use inspect::open_archive;
pub use mutate::add_files;
pub use mutate::delete_entries;
pub use verify::test_archive;

use crate::ArchiveError;
use crate::Result;
use crate::cancel::CancellationToken;
use crate::config::CompressionConfig;
use crate::formats::ArchiveFormat;
use crate::progress::NoopProgress;
use crate::progress::OperationKind;
use crate::progress::ProgressSink;
use crate::report::OperationResult;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Progress sink and cancellation token shared by one running operation.
#[derive(Clone)]
pub struct OperationContext {
    /// Receives progress snapshots.
    pub progress: Arc<dyn ProgressSink>,
    /// Polled before every entry and every copied chunk.
    pub cancel: CancellationToken,
}

impl OperationContext {
    /// Creates a context with no progress consumer and a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self {
            progress: Arc::new(NoopProgress),
            cancel: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Runs `body` and folds its outcome into a finished result.
fn run_operation<F>(kind: OperationKind, target: &Path, body: F) -> OperationResult
where
    F: FnOnce(&mut OperationResult) -> Result<()>,
{
    info!(operation = %kind, path = %target.display(), "operation started");
    let started = Instant::now();

    let mut result = OperationResult::new(kind);
    match body(&mut result) {
        Ok(()) => result.complete(),
        Err(err) => result.fail(err),
    }
    result.duration = started.elapsed();

    info!(
        operation = %kind,
        outcome = ?result.outcome,
        processed = result.processed.len(),
        errors = result.errors.len(),
        elapsed_ms = result.duration.as_millis(),
        "operation finished"
    );
    result
}

/// Maps an error raised inside an archive writer.
///
/// Some writers swallow the cancellation error raised by the source
/// stream; the token tells what really happened.
fn writer_failure(err: ArchiveError, cancel: &CancellationToken) -> ArchiveError {
    if cancel.is_cancelled() {
        ArchiveError::Cancelled
    } else {
        err
    }
}

/// Notices for configuration options `format` cannot honor.
fn unsupported_option_warnings(format: ArchiveFormat, config: &CompressionConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let solid_by_nature = matches!(
        format,
        ArchiveFormat::TarGz | ArchiveFormat::TarBz2 | ArchiveFormat::TarXz | ArchiveFormat::TarZst
    );
    if config.create_solid_archive && !solid_by_nature {
        warnings.push(format!(
            "{format} archives are written non-solid, solid option ignored"
        ));
    }
    if config.split_volume_size > 0 && !format.capabilities().can_multi_volume() {
        warnings.push(format!(
            "{format} does not support split volumes, writing a single file"
        ));
    }
    // 7z hides names whenever a password encrypts the archive.
    let names_hidden = format == ArchiveFormat::SevenZip && config.password().is_some();
    if config.encrypt_file_names && !names_hidden {
        warnings.push(format!(
            "{format} cannot encrypt file names, names are stored in clear text"
        ));
    }
    warnings
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::report::Outcome;

    #[test]
    fn test_run_operation_success() {
        let result = run_operation(OperationKind::Test, Path::new("a.zip"), |result| {
            result.processed.push("x".into());
            Ok(())
        });
        assert!(result.success);
        assert_eq!(result.outcome, Outcome::Completed);
        assert_eq!(result.processed, vec!["x".to_string()]);
    }

    #[test]
    fn test_run_operation_failure_and_cancel() {
        let result = run_operation(OperationKind::Compress, Path::new("a.zip"), |_| {
            Err(ArchiveError::PasswordRequired)
        });
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.error.unwrap().is_password_error());

        let result = run_operation(OperationKind::Compress, Path::new("a.zip"), |_| {
            Err(ArchiveError::Cancelled)
        });
        assert!(result.is_cancelled());
    }

    #[test]
    fn test_writer_failure_prefers_cancellation() {
        let cancel = CancellationToken::new();
        let err = writer_failure(ArchiveError::InvalidArchive("x".into()), &cancel);
        assert!(matches!(err, ArchiveError::InvalidArchive(_)));

        cancel.cancel();
        let err = writer_failure(ArchiveError::InvalidArchive("x".into()), &cancel);
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_option_warnings() {
        let config = CompressionConfig::default()
            .with_solid(true)
            .with_split_volume_size(1024);
        assert_eq!(unsupported_option_warnings(ArchiveFormat::Zip, &config).len(), 2);
        assert_eq!(unsupported_option_warnings(ArchiveFormat::TarXz, &config).len(), 1);
        assert!(unsupported_option_warnings(ArchiveFormat::Zip, &CompressionConfig::default()).is_empty());

        let hidden = CompressionConfig::default()
            .with_encrypt_file_names(true)
            .with_password("pw");
        assert!(unsupported_option_warnings(ArchiveFormat::SevenZip, &hidden).is_empty());
        assert_eq!(unsupported_option_warnings(ArchiveFormat::Zip, &hidden).len(), 1);
    }
}
