//! Background execution of archive operations.
//!
//! [`ArchiveEngine`] runs every operation on its own named thread and hands
//! back an [`OperationHandle`] immediately. Operations on different
//! archives share nothing but the progress sink, so any number of them may
//! run at once. Two mutations of the same archive path must not overlap;
//! the engine does not serialize them.

use crate::ArchiveError;
use crate::Result;
use crate::cancel::CancellationToken;
use crate::config::CompressionConfig;
use crate::config::ExtractOptions;
use crate::formats::ArchiveFormat;
use crate::operations;
use crate::operations::OperationContext;
use crate::progress::NoopProgress;
use crate::progress::OperationKind;
use crate::progress::ProgressSink;
use crate::report::OperationResult;
use crate::types::ArchiveEntry;
use crate::types::ArchiveMetadata;
use std::any::Any;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use tracing::error;

/// Entry point for running archive operations off the calling thread.
///
/// # Examples
///
/// ```no_run
/// use hammer_core::ArchiveEngine;
/// use hammer_core::CompressionConfig;
/// use hammer_core::formats::ArchiveFormat;
/// use hammer_core::progress::LatestProgress;
/// use std::sync::Arc;
///
/// let progress = Arc::new(LatestProgress::new());
/// let engine = ArchiveEngine::new().with_progress(progress.clone());
///
/// let handle = engine.compress(
///     vec!["photos".into()],
///     "photos.zip",
///     ArchiveFormat::Zip,
///     CompressionConfig::default(),
/// );
/// while !handle.is_finished() {
///     if let Some(p) = progress.latest() {
///         println!("{:.0}% {}", p.percent_complete(), p.current_file);
///     }
///     std::thread::sleep(std::time::Duration::from_millis(100));
/// }
/// let result = handle.join();
/// println!("{}", result.message);
/// ```
#[derive(Clone)]
pub struct ArchiveEngine {
    progress: Arc<dyn ProgressSink>,
}

impl ArchiveEngine {
    /// Creates an engine that discards progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sink every operation started by this engine reports to.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Starts an extraction. See [`operations::extract`].
    pub fn extract(
        &self,
        archive: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        options: ExtractOptions,
    ) -> OperationHandle {
        let archive = archive.into();
        let output_dir = output_dir.into();
        self.spawn(OperationKind::Extract, move |ctx| {
            operations::extract(&archive, &output_dir, &options, ctx)
        })
    }

    /// Starts creating an archive. See [`operations::compress`].
    pub fn compress(
        &self,
        sources: Vec<PathBuf>,
        archive: impl Into<PathBuf>,
        format: ArchiveFormat,
        config: CompressionConfig,
    ) -> OperationHandle {
        let archive = archive.into();
        self.spawn(OperationKind::Compress, move |ctx| {
            operations::compress(&sources, &archive, format, &config, ctx)
        })
    }

    /// Starts an integrity test. See [`operations::test_archive`].
    pub fn test(&self, archive: impl Into<PathBuf>, password: Option<String>) -> OperationHandle {
        let archive = archive.into();
        self.spawn(OperationKind::Test, move |ctx| {
            operations::test_archive(&archive, password.as_deref(), ctx)
        })
    }

    /// Starts adding files to an archive. See [`operations::add_files`].
    pub fn add(
        &self,
        archive: impl Into<PathBuf>,
        sources: Vec<PathBuf>,
        config: CompressionConfig,
    ) -> OperationHandle {
        let archive = archive.into();
        self.spawn(OperationKind::Add, move |ctx| {
            operations::add_files(&archive, &sources, &config, ctx)
        })
    }

    /// Starts deleting entries from an archive. See
    /// [`operations::delete_entries`].
    pub fn delete(
        &self,
        archive: impl Into<PathBuf>,
        targets: Vec<String>,
        config: CompressionConfig,
    ) -> OperationHandle {
        let archive = archive.into();
        self.spawn(OperationKind::Delete, move |ctx| {
            operations::delete_entries(&archive, &targets, &config, ctx)
        })
    }

    /// Lists the entries of an archive on the calling thread.
    ///
    /// # Errors
    ///
    /// See [`operations::list_entries`].
    pub fn list_entries(&self, archive: &Path, password: Option<&str>) -> Result<Vec<ArchiveEntry>> {
        operations::list_entries(archive, password)
    }

    /// Summarizes an archive on the calling thread.
    ///
    /// # Errors
    ///
    /// See [`operations::open_archive`].
    pub fn open_archive(&self, archive: &Path, password: Option<&str>) -> Result<ArchiveMetadata> {
        operations::open_archive(archive, password)
    }

    fn spawn<F>(&self, kind: OperationKind, work: F) -> OperationHandle
    where
        F: FnOnce(&OperationContext) -> OperationResult + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let ctx = OperationContext {
            progress: Arc::clone(&self.progress),
            cancel: cancel.clone(),
        };

        let spawned = thread::Builder::new()
            .name(format!("hammer-{kind}"))
            .spawn(move || work(&ctx));
        let state = match spawned {
            Ok(handle) => HandleState::Running(handle),
            Err(err) => {
                error!(operation = %kind, error = %err, "worker thread not started");
                HandleState::Ready(OperationResult::rejected(kind, err.into()))
            }
        };

        OperationHandle {
            kind,
            cancel,
            state,
        }
    }
}

impl Default for ArchiveEngine {
    fn default() -> Self {
        Self {
            progress: Arc::new(NoopProgress),
        }
    }
}

impl fmt::Debug for ArchiveEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveEngine").finish_non_exhaustive()
    }
}

enum HandleState {
    Running(JoinHandle<OperationResult>),
    Ready(OperationResult),
}

/// Handle on an operation running in the background.
///
/// Dropping the handle detaches the operation; it still runs to the end.
pub struct OperationHandle {
    kind: OperationKind,
    cancel: CancellationToken,
    state: HandleState,
}

impl OperationHandle {
    /// Operation this handle belongs to.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Requests cancellation. The operation stops at its next checkpoint
    /// and reports [`crate::Outcome::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token shared with the running operation.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns `true` once the result is available without blocking.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.state {
            HandleState::Running(handle) => handle.is_finished(),
            HandleState::Ready(_) => true,
        }
    }

    /// Waits for the operation and returns its result.
    ///
    /// A worker that panicked yields a failed result.
    pub fn join(self) -> OperationResult {
        match self.state {
            HandleState::Ready(result) => result,
            HandleState::Running(handle) => handle.join().unwrap_or_else(|panic| {
                let reason = panic_message(panic.as_ref());
                error!(operation = %self.kind, reason, "worker thread panicked");
                OperationResult::rejected(
                    self.kind,
                    ArchiveError::Io(std::io::Error::other(format!(
                        "worker thread panicked: {reason}"
                    ))),
                )
            }),
        }
    }
}

impl fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandle")
            .field("kind", &self.kind)
            .field("finished", &self.is_finished())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
