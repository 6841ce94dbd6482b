//! Chunked copying with cancellation checkpoints and progress accounting.
//!
//! All entry data flows through these helpers so that every long stream
//! polls the cancellation token once per chunk.

use crate::ArchiveError;
use crate::Result;
use crate::cancel::CancellationToken;
use crate::progress::ProgressReporter;
use std::io::Read;
use std::io::Write;
use std::io::{self};

/// Buffer size for file copies (64KB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Chunk size used when draining entries during an integrity test.
pub const TEST_CHUNK_SIZE: usize = 8192;

/// Reusable heap buffer for chunked copies.
///
/// One buffer is allocated per operation and reused for every entry.
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Vec<u8>,
}

impl CopyBuffer {
    /// Creates a 64KB copy buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_size(COPY_BUFFER_SIZE)
    }

    /// Creates a buffer of `size` bytes (at least one).
    #[must_use]
    pub fn with_size(size: usize) -> Self {
        Self {
            buf: vec![0u8; size.max(1)],
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `reader` into `writer` chunk by chunk.
///
/// Cancellation is checked before every chunk and progress is updated
/// after every chunk. Returns the number of bytes copied.
///
/// # Errors
///
/// Returns [`ArchiveError::Cancelled`] when cancellation is observed, or
/// the underlying I/O error from either side.
pub(crate) fn copy_with_progress<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
    cancel: &CancellationToken,
    reporter: &mut ProgressReporter<'_>,
) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut total: u64 = 0;

    loop {
        cancel.check()?;

        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ArchiveError::Io(e)),
        };

        writer.write_all(&buffer.buf[..bytes_read])?;

        total = total.saturating_add(bytes_read as u64);
        reporter.add_bytes(bytes_read as u64);
    }

    Ok(total)
}

/// Reads `reader` to its end, polling `cancel` before every chunk.
///
/// Returns the number of bytes read.
///
/// # Errors
///
/// Returns [`ArchiveError::Cancelled`] when cancellation is observed, or
/// the read error wrapped in [`ArchiveError::Io`].
pub(crate) fn drain<R: Read + ?Sized>(
    reader: &mut R,
    buffer: &mut CopyBuffer,
    cancel: &CancellationToken,
) -> Result<u64> {
    let mut total: u64 = 0;
    loop {
        cancel.check()?;
        match reader.read(&mut buffer.buf) {
            Ok(0) => return Ok(total),
            Ok(n) => total = total.saturating_add(n as u64),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ArchiveError::Io(e)),
        }
    }
}

/// Reader wrapper feeding an archive writer from a source file.
///
/// Every `read` call polls the cancellation token and records the bytes
/// handed to the writer. A cancellation surfaces to the writer as an
/// `io::Error` wrapping [`ArchiveError::Cancelled`]; use
/// [`into_archive_error`] to recover it. A read error of the wrapped
/// source is kept aside so callers can tell it apart from a failure of the
/// writer; see [`TrackedReader::take_source_error`].
pub(crate) struct TrackedReader<'r, 'p, R: Read + ?Sized> {
    inner: &'r mut R,
    cancel: &'r CancellationToken,
    reporter: &'r mut ProgressReporter<'p>,
    source_error: Option<io::Error>,
}

impl<'r, 'p, R: Read + ?Sized> TrackedReader<'r, 'p, R> {
    pub(crate) fn new(
        inner: &'r mut R,
        cancel: &'r CancellationToken,
        reporter: &'r mut ProgressReporter<'p>,
    ) -> Self {
        Self {
            inner,
            cancel,
            reporter,
            source_error: None,
        }
    }

    /// Takes the error the wrapped source failed with, if it failed.
    pub(crate) const fn take_source_error(&mut self) -> Option<io::Error> {
        self.source_error.take()
    }
}

impl<R: Read + ?Sized> Read for TrackedReader<'_, '_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::other(ArchiveError::Cancelled));
        }
        let n = match self.inner.read(buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Err(e),
            Err(e) => {
                let forwarded = io::Error::new(e.kind(), e.to_string());
                self.source_error = Some(e);
                return Err(forwarded);
            }
        };
        self.reporter.add_bytes(n as u64);
        Ok(n)
    }
}

/// Recovers an [`ArchiveError`] smuggled through an `io::Error`.
pub(crate) fn into_archive_error(err: io::Error) -> ArchiveError {
    let is_wrapped = err
        .get_ref()
        .is_some_and(|inner| inner.is::<ArchiveError>());
    if !is_wrapped {
        return ArchiveError::Io(err);
    }
    match err.into_inner().map(|inner| inner.downcast::<ArchiveError>()) {
        Some(Ok(archive_err)) => *archive_err,
        Some(Err(other)) => ArchiveError::Io(io::Error::other(other)),
        None => ArchiveError::Io(io::Error::other("unknown I/O error")),
    }
}
