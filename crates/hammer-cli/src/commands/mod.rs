//! Subcommand implementations.

pub mod add;
pub mod completion;
pub mod compress;
pub mod delete;
pub mod extract;
pub mod formats;
pub mod info;
pub mod list;
pub mod test;

use crate::error::result_error;
use crate::output::OutputFormatter;
use crate::progress;
use anyhow::Result;
use hammer_core::ArchiveEngine;
use hammer_core::OperationHandle;
use hammer_core::progress::LatestProgress;
use std::sync::Arc;
use tracing::debug;

/// Starts an operation on the engine, waits for it while drawing progress,
/// renders the result and turns an unsuccessful one into an error.
fn run<F>(formatter: &dyn OutputFormatter, show_progress: bool, start: F) -> Result<()>
where
    F: FnOnce(&ArchiveEngine) -> OperationHandle,
{
    let latest = Arc::new(LatestProgress::new());
    let engine = ArchiveEngine::new().with_progress(latest.clone());

    let handle = start(&engine);
    let result = progress::wait(handle, &latest, show_progress);
    debug!(
        operation = %result.operation,
        outcome = ?result.outcome,
        processed = result.processed.len(),
        "operation returned"
    );

    formatter.format_result(&result)?;
    if result.success {
        Ok(())
    } else {
        Err(result_error(&result))
    }
}
