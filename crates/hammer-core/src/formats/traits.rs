//! Reader and writer contracts implemented by every format handler.

use crate::Result;
use crate::cancel::CancellationToken;
use crate::formats::ArchiveFormat;
use crate::types::ArchiveEntry;
use crate::types::ArchiveMetadata;
use crate::types::EntryLink;
use std::io::Read;
use std::time::SystemTime;

/// Tells a reader whether to keep enumerating after an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Move on to the next entry.
    Continue,
    /// Stop enumeration; the visit returns `Ok(())`.
    Stop,
}

/// Callback receiving each entry and its data stream in archive order.
///
/// The stream is `Err` when this single entry cannot be opened (for
/// instance a wrong password on one encrypted ZIP member). Returning `Err`
/// from the callback aborts the whole visit with that error. Data the
/// callback does not read is skipped by the reader.
pub type EntryVisitor<'a> =
    dyn FnMut(&ArchiveEntry, Result<&mut dyn Read>) -> Result<Visit> + 'a;

/// Open handle on an existing archive.
///
/// Implementations own the underlying file for their whole lifetime and
/// release it on drop.
pub trait ArchiveReader {
    /// Container format of the archive.
    fn format(&self) -> ArchiveFormat;

    /// Lists every entry, directories included, in archive order.
    ///
    /// Entries are fresh snapshots on every call.
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>>;

    /// Streams every entry, in archive order, through `visitor`.
    ///
    /// Only one pass is guaranteed; call it at most once per handle.
    fn visit(&mut self, visitor: &mut EntryVisitor<'_>) -> Result<()>;

    /// Summarizes the archive.
    fn metadata(&mut self) -> Result<ArchiveMetadata>;

    /// Lets long scans behind [`Self::entries`] and [`Self::metadata`]
    /// stop with [`crate::ArchiveError::Cancelled`] once `cancel` fires.
    ///
    /// Readers whose listings come from a header ignore it.
    fn watch_cancellation(&mut self, _cancel: &CancellationToken) {}
}

/// Header of an entry pushed into an [`ArchiveWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Archive-relative path, `/` separated, without trailing separator.
    pub path: String,
    /// Exact number of bytes the data stream will yield.
    pub size: u64,
    /// Modification time to record.
    pub modified: Option<SystemTime>,
    /// Unix permission bits to record.
    pub mode: Option<u32>,
    /// Link target, for [`ArchiveWriter::add_link`].
    pub link: Option<EntryLink>,
}

impl EntryHeader {
    /// Creates a header with no timestamp or mode.
    #[must_use]
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            modified: None,
            mode: None,
            link: None,
        }
    }

    /// Builds a header that reproduces an existing entry.
    #[must_use]
    pub fn from_entry(entry: &ArchiveEntry) -> Self {
        Self {
            path: entry.path.clone(),
            size: entry.size,
            modified: entry.modified,
            mode: entry.attributes.map(|mode| mode & 0o7777),
            link: entry.link.clone(),
        }
    }

    /// Sets the modification time.
    #[must_use]
    pub fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }

    /// Sets the permission bits.
    #[must_use]
    pub fn with_mode(mut self, mode: Option<u32>) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the link target.
    #[must_use]
    pub fn with_link(mut self, link: Option<EntryLink>) -> Self {
        self.link = link;
        self
    }
}

/// Write-side options resolved from the compression configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterOptions {
    /// Codec effort, 0-9.
    pub level: u8,
    /// Password for encrypted entries.
    pub password: Option<String>,
    /// Archive-level comment, for formats that store one.
    pub comment: Option<String>,
    /// File name recorded in single-stream headers.
    pub stream_name: Option<String>,
}

/// Append-only archive writer.
///
/// Entries are written in the order they are pushed. An entry cannot be
/// rewritten once pushed; that is why mutations rebuild the archive.
pub trait ArchiveWriter {
    /// Writes a directory entry.
    fn add_directory(&mut self, header: &EntryHeader) -> Result<()>;

    /// Writes a file entry, streaming exactly `header.size` bytes from
    /// `data`. Returns the number of bytes written.
    fn add_file(&mut self, header: &EntryHeader, data: &mut dyn Read) -> Result<u64>;

    /// Writes the link entry described by `header.link`.
    ///
    /// Containers without link records return
    /// [`crate::ArchiveError::UnsupportedOperation`].
    fn add_link(&mut self, header: &EntryHeader) -> Result<()>;

    /// Takes back the file entry whose [`Self::add_file`] just failed
    /// because its source could not be read.
    ///
    /// Returns `Ok(false)` when the container cannot drop a partly written
    /// entry; the archive under construction is then unusable.
    fn discard_partial(&mut self) -> Result<bool> {
        Ok(false)
    }

    /// Writes trailers and flushes the container.
    fn finish(self: Box<Self>) -> Result<()>;
}
