//! Creation of new archives from files and directories.

use super::OperationContext;
use super::run_operation;
use super::unsupported_option_warnings;
use super::writer_failure;
use crate::ArchiveError;
use crate::Result;
use crate::config::CompressionConfig;
use crate::copy::TrackedReader;
use crate::formats::ArchiveFormat;
use crate::formats::ArchiveWriter;
use crate::formats::EntryHeader;
use crate::formats::WriterOptions;
use crate::formats::open_writer;
use crate::progress::OperationKind;
use crate::progress::ProgressReporter;
use crate::rebuild::StagedArchive;
use crate::report::OperationResult;
use crate::report::Outcome;
use crate::walker::SourceFile;
use crate::walker::collect_sources;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::warn;

/// Writes `sources` into a new `format` archive at `archive`.
///
/// Directories are walked recursively and only regular files are stored.
/// The archive is built in a temporary file and moved to `archive` once
/// complete, replacing any existing file. A source file that cannot be
/// opened is recorded as an error and skipped. One that fails partway
/// through reading is skipped the same way when the writer can take back
/// the partial entry (ZIP); otherwise, as with any failure of the archive
/// writer itself, the operation aborts and leaves `archive` untouched.
///
/// The processed list holds the source paths that were stored. It is
/// emptied when the operation is cancelled or fails, since no archive is
/// produced then.
///
/// # Examples
///
/// ```no_run
/// use hammer_core::CompressionConfig;
/// use hammer_core::formats::ArchiveFormat;
/// use hammer_core::operations::OperationContext;
/// use hammer_core::operations::compress;
/// use std::path::Path;
/// use std::path::PathBuf;
///
/// let result = compress(
///     &[PathBuf::from("src"), PathBuf::from("Cargo.toml")],
///     Path::new("snapshot.tar.zst"),
///     ArchiveFormat::TarZst,
///     &CompressionConfig::default().with_compression_level(9),
///     &OperationContext::new(),
/// );
/// assert!(result.success, "{}", result.message);
/// ```
pub fn compress(
    sources: &[PathBuf],
    archive: &Path,
    format: ArchiveFormat,
    config: &CompressionConfig,
    ctx: &OperationContext,
) -> OperationResult {
    let mut result = run_operation(OperationKind::Compress, archive, |result| {
        build_archive(sources, archive, format, config, ctx, result)
    });
    if matches!(result.outcome, Outcome::Failed | Outcome::Cancelled) {
        result.processed.clear();
    }
    result
}

fn build_archive(
    sources: &[PathBuf],
    archive: &Path,
    format: ArchiveFormat,
    config: &CompressionConfig,
    ctx: &OperationContext,
    result: &mut OperationResult,
) -> Result<()> {
    config.validate()?;
    if format == ArchiveFormat::Unknown {
        return Err(ArchiveError::UnknownFormat {
            path: archive.to_path_buf(),
        });
    }
    if !format.capabilities().can_write() {
        return Err(ArchiveError::UnsupportedOperation {
            format,
            operation: "writing",
        });
    }
    if sources.is_empty() {
        return Err(ArchiveError::InvalidConfig {
            reason: "no source paths given".into(),
        });
    }

    let set = collect_sources(sources, config)?;
    if format.is_single_stream() && set.files.len() > 1 {
        return Err(ArchiveError::UnsupportedOperation {
            format,
            operation: "more than one entry",
        });
    }
    result.warnings.extend(unsupported_option_warnings(format, config));
    result.warnings.extend(set.warnings.iter().cloned());
    for (item, err) in &set.failures {
        result.add_error(item, err);
    }

    let options = WriterOptions {
        level: config.compression_level,
        password: config.password().map(str::to_string),
        comment: None,
        stream_name: set
            .files
            .first()
            .and_then(|f| f.path.file_name())
            .map(|n| n.to_string_lossy().into_owned()),
    };
    store_sources(&set.files, archive, format, &options, ctx, result)?;

    if config.delete_after_compression && result.errors.is_empty() {
        remove_sources(sources, result);
    }
    Ok(())
}

/// Writes `files` into a staged `format` archive and commits it to
/// `archive`.
fn store_sources(
    files: &[SourceFile],
    archive: &Path,
    format: ArchiveFormat,
    options: &WriterOptions,
    ctx: &OperationContext,
    result: &mut OperationResult,
) -> Result<()> {
    let staged = StagedArchive::create(archive)?;
    let mut writer = open_writer(staged.file()?, format, options)?;

    let total_size = files.iter().map(|f| f.size).sum();
    let mut reporter = ProgressReporter::new(
        ctx.progress.as_ref(),
        OperationKind::Compress,
        files.len(),
        total_size,
    );

    for source in files {
        ctx.cancel.check()?;
        reporter.start_entry(&source.archive_path);
        let stored = File::open(&source.path)
            .map_err(|e| SourceError::Unreadable(e.into()))
            .and_then(|mut file| {
                write_source(writer.as_mut(), source, &mut file, ctx, &mut reporter)
            });
        match stored {
            Ok(written) => {
                debug!(source = %source.path.display(), written, "source stored");
                result.processed.push(source.path.display().to_string());
            }
            Err(SourceError::Unreadable(err)) => {
                warn!(source = %source.path.display(), error = %err, "source skipped");
                result.add_error(&source.path.display().to_string(), &err);
            }
            Err(SourceError::Writer(err)) => return Err(writer_failure(err, &ctx.cancel)),
        }
        reporter.finish_entry();
    }

    writer.finish()?;
    staged.commit()
}

/// Failure while storing one source file.
pub(super) enum SourceError {
    /// The source could not be read and nothing of it is left in the
    /// archive; the archive is still consistent.
    Unreadable(ArchiveError),
    /// The writer failed, or holds part of an entry it cannot drop; the
    /// archive under construction is unusable.
    Writer(ArchiveError),
}

/// Streams one opened source file into `writer`.
///
/// When reading `file` fails partway, the writer is asked to drop the
/// partial entry; only if it can is the failure reported as
/// [`SourceError::Unreadable`].
pub(super) fn write_source(
    writer: &mut dyn ArchiveWriter,
    source: &SourceFile,
    file: &mut File,
    ctx: &OperationContext,
    reporter: &mut ProgressReporter<'_>,
) -> std::result::Result<u64, SourceError> {
    let header = EntryHeader::new(&source.archive_path, source.size)
        .with_modified(source.modified)
        .with_mode(source.mode);

    let mut tracked = TrackedReader::new(file, &ctx.cancel, reporter);
    let err = match writer.add_file(&header, &mut tracked) {
        Ok(written) => return Ok(written),
        Err(err) => err,
    };
    let Some(source_err) = tracked.take_source_error() else {
        return Err(SourceError::Writer(err));
    };
    match writer.discard_partial() {
        Ok(true) => {
            debug!(entry = %source.archive_path, "partial entry discarded");
            Err(SourceError::Unreadable(source_err.into()))
        }
        Ok(false) => Err(SourceError::Writer(err)),
        Err(discard_err) => Err(SourceError::Writer(discard_err)),
    }
}

fn remove_sources(sources: &[PathBuf], result: &mut OperationResult) {
    for source in sources {
        let removed = if source.is_dir() {
            std::fs::remove_dir_all(source)
        } else {
            std::fs::remove_file(source)
        };
        if let Err(err) = removed {
            result.add_warning(format!("{}: not removed: {err}", source.display()));
        }
    }
}
