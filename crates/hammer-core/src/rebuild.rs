//! Staged archive writes.
//!
//! Every archive the engine writes (a fresh compress or a rebuild for add
//! and delete) is built in a temporary file next to the target and only
//! swapped into place once the writer finished cleanly. Dropping a
//! [`StagedArchive`] without committing removes the temporary file, so the
//! target path either keeps its previous content or holds a complete new
//! archive.

use crate::ArchiveError;
use crate::Result;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::debug;
use tracing::warn;

/// Suffix of temporary archives.
pub const TEMP_SUFFIX: &str = ".tmp";

/// An archive being written to a temporary sibling of its final path.
#[derive(Debug)]
pub struct StagedArchive {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedArchive {
    /// Creates the temporary file in the target's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist or is not
    /// writable.
    pub fn create(target: &Path) -> Result<Self> {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = target
            .file_name()
            .map_or_else(|| "archive".into(), |n| n.to_string_lossy());

        let temp = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)?;
        debug!(temp = %temp.path().display(), target = %target.display(), "staging archive");

        Ok(Self {
            temp,
            target: target.to_path_buf(),
        })
    }

    /// Path of the temporary file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Final path the archive is committed to.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Returns a new handle on the temporary file for a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle cannot be duplicated.
    pub fn file(&self) -> Result<File> {
        Ok(self.temp.as_file().try_clone()?)
    }

    /// Moves the temporary file over the target.
    ///
    /// An existing target's permissions carry over to the new file. The
    /// move is a rename; where the platform refuses to rename over an
    /// existing file, the original is removed first and the rename retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the swap fails. Before the original is removed,
    /// a failure leaves it untouched and deletes the temporary file.
    pub fn commit(self) -> Result<()> {
        let Self { temp, target } = self;

        if let Ok(existing) = std::fs::metadata(&target) {
            std::fs::set_permissions(temp.path(), existing.permissions())?;
        }

        match temp.persist(&target) {
            Ok(_) => {
                debug!(target = %target.display(), "archive committed");
                Ok(())
            }
            Err(err) if target.exists() => {
                debug!(
                    target = %target.display(),
                    error = %err.error,
                    "rename refused, replacing original"
                );
                std::fs::remove_file(&target)?;
                err.file
                    .persist(&target)
                    .map(|_| ())
                    .map_err(|e| ArchiveError::Io(e.error))
            }
            Err(err) => Err(ArchiveError::Io(err.error)),
        }
    }

    /// Drops the temporary file without touching the target.
    pub fn abandon(self) {
        warn!(temp = %self.temp.path().display(), "discarding staged archive");
    }
}
