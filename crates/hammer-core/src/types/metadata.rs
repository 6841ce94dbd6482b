//! Whole-archive summary.

use crate::formats::ArchiveFormat;
use crate::types::ArchiveEntry;
use std::path::PathBuf;
use std::time::SystemTime;

/// Summary of an archive file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMetadata {
    /// Path the archive was opened from.
    pub path: PathBuf,
    /// Detected container format.
    pub format: ArchiveFormat,
    /// Sum of uncompressed file sizes.
    pub total_size: u64,
    /// Sum of stored file sizes.
    pub total_compressed_size: u64,
    /// Number of non-directory entries.
    pub entry_count: usize,
    /// At least one entry is encrypted.
    pub is_encrypted: bool,
    /// Entries share one compression stream.
    pub is_solid: bool,
    /// Archive spans several volumes.
    pub is_multi_volume: bool,
    /// Archive-level comment.
    pub comment: String,
    /// Filesystem creation time of the archive file, when available.
    pub created: Option<SystemTime>,
}

impl ArchiveMetadata {
    /// Builds a summary from a full entry listing.
    ///
    /// Directory entries are excluded from every count and total.
    #[must_use]
    pub fn from_entries(path: PathBuf, format: ArchiveFormat, entries: &[ArchiveEntry]) -> Self {
        let files = entries.iter().filter(|e| !e.is_directory);

        let mut metadata = Self {
            path,
            format,
            total_size: 0,
            total_compressed_size: 0,
            entry_count: 0,
            is_encrypted: false,
            is_solid: false,
            is_multi_volume: false,
            comment: String::new(),
            created: None,
        };

        for entry in files {
            metadata.total_size = metadata.total_size.saturating_add(entry.size);
            metadata.total_compressed_size = metadata
                .total_compressed_size
                .saturating_add(entry.compressed_size);
            metadata.entry_count += 1;
            metadata.is_encrypted |= entry.is_encrypted;
        }

        metadata
    }

    /// Overall compression ratio in percent, 0 for empty archives.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        (1.0 - self.total_compressed_size as f64 / self.total_size as f64) * 100.0
    }
}
