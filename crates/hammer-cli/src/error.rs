//! Error conversion utilities for CLI.
//!
//! Converts hammer-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use hammer_core::ArchiveError;
use hammer_core::OperationResult;
use std::path::Path;

/// Returns a hint for errors the user can fix from the command line.
pub fn hint(err: &ArchiveError) -> Option<&'static str> {
    match err {
        ArchiveError::PasswordRequired => {
            Some("The archive is encrypted. Supply the password with --password.")
        }
        ArchiveError::InvalidPassword => Some("Check the password and try again."),
        ArchiveError::UnknownFormat { .. } => {
            Some("Run `hammer formats` to see the supported file extensions.")
        }
        ArchiveError::UnsupportedOperation { .. } => Some(
            "Run `hammer formats` to see which formats can be read, written or encrypted.",
        ),
        ArchiveError::InvalidArchive(_) => {
            Some("The archive may be corrupted or truncated. Try `hammer test`.")
        }
        _ => None,
    }
}

/// Converts `ArchiveError` to user-friendly anyhow error with context
pub fn convert_archive_error(err: &ArchiveError, archive: &Path) -> anyhow::Error {
    with_hint(&err.to_string(), hint(err))
        .context(format!("Error processing '{}'", archive.display()))
}

/// Adds context to a core result about archive operations
pub fn add_archive_context<T>(
    result: hammer_core::Result<T>,
    archive: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_archive_error(&e, archive))
}

/// Builds the error reported for an unsuccessful operation result.
pub fn result_error(result: &OperationResult) -> anyhow::Error {
    with_hint(&result.message, result.error.as_ref().and_then(hint))
}

fn with_hint(message: &str, hint: Option<&str>) -> anyhow::Error {
    match hint {
        Some(hint) => anyhow!("{message}\nHINT: {hint}"),
        None => anyhow!("{message}"),
    }
}
