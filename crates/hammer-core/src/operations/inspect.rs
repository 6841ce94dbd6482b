//! Read-only archive queries.

use crate::Result;
use crate::formats::open_reader;
use crate::types::ArchiveEntry;
use crate::types::ArchiveMetadata;
use std::path::Path;

/// Lists every entry of `archive`, directories included, in archive order.
///
/// # Errors
///
/// Returns an error if the archive is missing, of unknown or unreadable
/// format, corrupt, or encrypted without a matching password.
pub fn list_entries(archive: &Path, password: Option<&str>) -> Result<Vec<ArchiveEntry>> {
    open_reader(archive, password)?.entries()
}

/// Summarizes `archive`.
///
/// `created` is taken from the filesystem when the platform records it.
///
/// # Errors
///
/// Same conditions as [`list_entries`].
///
/// # Examples
///
/// ```no_run
/// use hammer_core::operations::open_archive;
/// use std::path::Path;
///
/// let info = open_archive(Path::new("backup.tar.xz"), None)?;
/// println!(
///     "{} files, {} bytes, {:.1}% saved",
///     info.entry_count,
///     info.total_size,
///     info.compression_ratio()
/// );
/// # Ok::<(), hammer_core::ArchiveError>(())
/// ```
pub fn open_archive(archive: &Path, password: Option<&str>) -> Result<ArchiveMetadata> {
    let mut metadata = open_reader(archive, password)?.metadata()?;
    metadata.created = std::fs::metadata(archive)
        .and_then(|m| m.created())
        .ok();
    Ok(metadata)
}
