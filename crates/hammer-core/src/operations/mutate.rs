//! Adding and deleting entries by rebuilding the archive.
//!
//! Archive writers are append-only, so both mutations stream the kept
//! entries of the original into a [`StagedArchive`], append any new files
//! and swap the result over the original. Any failure before the swap
//! discards the staged file and leaves the original byte-identical.

use super::OperationContext;
use super::compress::SourceError;
use super::compress::write_source;
use super::run_operation;
use super::unsupported_option_warnings;
use super::writer_failure;
use crate::ArchiveError;
use crate::Result;
use crate::config::CompressionConfig;
use crate::copy::TrackedReader;
use crate::formats::ArchiveReader;
use crate::formats::EntryHeader;
use crate::formats::Visit;
use crate::formats::WriterOptions;
use crate::formats::open_reader;
use crate::formats::open_writer;
use crate::progress::OperationKind;
use crate::progress::ProgressReporter;
use crate::rebuild::StagedArchive;
use crate::report::OperationResult;
use crate::report::Outcome;
use crate::types::ArchiveEntry;
use crate::walker::SourceFile;
use crate::walker::collect_sources;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::warn;

/// Adds `sources` to an existing archive.
///
/// Archive paths follow the same rules as [`super::compress`]. An existing
/// entry whose path equals an added path is replaced. The archive keeps its
/// format; `config` supplies the password used to read it, the level for
/// the rebuilt entries and, for formats that encrypt, the password for the
/// new ones.
///
/// Every source is opened before the rebuild starts. One that cannot be
/// opened is recorded as an error and the entry it would replace is kept.
/// A source that fails partway through reading aborts the operation when it
/// replaces an existing entry; otherwise it is recorded and skipped.
///
/// The processed list holds the added source paths and is emptied when the
/// operation is cancelled or fails.
pub fn add_files(
    archive: &Path,
    sources: &[PathBuf],
    config: &CompressionConfig,
    ctx: &OperationContext,
) -> OperationResult {
    let result = run_operation(OperationKind::Add, archive, |result| {
        config.validate()?;
        if sources.is_empty() {
            return Err(ArchiveError::InvalidConfig {
                reason: "no source paths given".into(),
            });
        }
        let set = collect_sources(sources, config)?;
        result.warnings.extend(set.warnings.iter().cloned());
        for (item, err) in &set.failures {
            result.add_error(item, err);
        }

        let mut additions = Vec::with_capacity(set.files.len());
        for source in &set.files {
            match File::open(&source.path) {
                Ok(file) => additions.push(Addition { source, file }),
                Err(err) => {
                    let err = ArchiveError::from(err);
                    warn!(source = %source.path.display(), error = %err, "source skipped");
                    result.add_error(&source.path.display().to_string(), &err);
                }
            }
        }
        let replaced: HashSet<&str> = additions
            .iter()
            .map(|a| a.source.archive_path.as_str())
            .collect();

        let mut reader = open_reader(archive, config.password())?;
        reader.watch_cancellation(&ctx.cancel);
        result
            .warnings
            .extend(unsupported_option_warnings(reader.format(), config));
        rebuild(
            archive,
            reader.as_mut(),
            &|entry: &ArchiveEntry| replaced.contains(entry.path.as_str()),
            additions,
            config,
            ctx,
            result,
        )
    });
    discard_on_abort(result)
}

/// Removes entries from an existing archive.
///
/// A target matches the entry with exactly that path and, for directories,
/// everything underneath it. Targets that match nothing are reported as
/// warnings; when no target matches at all the archive is left untouched.
///
/// The processed list holds the removed entry paths in archive order and
/// is emptied when the operation is cancelled or fails.
///
/// # Examples
///
/// ```no_run
/// use hammer_core::CompressionConfig;
/// use hammer_core::operations::OperationContext;
/// use hammer_core::operations::delete_entries;
/// use std::path::Path;
///
/// let result = delete_entries(
///     Path::new("site.zip"),
///     &["cache".to_string(), "debug.log".to_string()],
///     &CompressionConfig::default(),
///     &OperationContext::new(),
/// );
/// println!("removed {:?}", result.processed);
/// ```
pub fn delete_entries(
    archive: &Path,
    targets: &[String],
    config: &CompressionConfig,
    ctx: &OperationContext,
) -> OperationResult {
    let result = run_operation(OperationKind::Delete, archive, |result| {
        let mut reader = open_reader(archive, config.password())?;
        reader.watch_cancellation(&ctx.cancel);
        let entries = reader.entries()?;
        let doomed = |entry: &ArchiveEntry| targets.iter().any(|t| entry.is_within(t));

        for target in targets {
            if !entries.iter().any(|e| e.is_within(target)) {
                result.add_warning(format!("{target}: not found in archive"));
            }
        }
        let removed: Vec<String> = entries
            .iter()
            .filter(|&e| doomed(e))
            .map(|e| e.path.clone())
            .collect();
        if removed.is_empty() {
            debug!(archive = %archive.display(), "nothing to delete");
            return Ok(());
        }

        rebuild(archive, reader.as_mut(), &doomed, Vec::new(), config, ctx, result)?;
        result.processed = removed;
        Ok(())
    });
    discard_on_abort(result)
}

fn discard_on_abort(mut result: OperationResult) -> OperationResult {
    if matches!(result.outcome, Outcome::Failed | Outcome::Cancelled) {
        result.processed.clear();
    }
    result
}

/// A source to append, opened before the rebuild starts.
struct Addition<'s> {
    source: &'s SourceFile,
    file: File,
}

/// Rewrites `archive` without the entries `skip` selects, then appends
/// `additions`.
///
/// Failing to copy an existing entry is fatal: the rebuilt archive would
/// silently lose data. The same holds for an addition that replaces an
/// existing entry and cannot be read; other unreadable additions are
/// skipped. Links are carried over as links.
fn rebuild(
    archive: &Path,
    reader: &mut dyn ArchiveReader,
    skip: &dyn Fn(&ArchiveEntry) -> bool,
    additions: Vec<Addition<'_>>,
    config: &CompressionConfig,
    ctx: &OperationContext,
    result: &mut OperationResult,
) -> Result<()> {
    let format = reader.format();
    let capabilities = format.capabilities();
    if format.is_single_stream() {
        return Err(ArchiveError::UnsupportedOperation {
            format,
            operation: "adding or deleting entries",
        });
    }
    if !capabilities.can_write() {
        return Err(ArchiveError::UnsupportedOperation {
            format,
            operation: "writing",
        });
    }

    let entries = reader.entries()?;
    let comment = reader.metadata()?.comment;
    let present: HashSet<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    let kept = entries
        .iter()
        .filter(|&e| !e.is_directory && !e.is_link() && !skip(e));
    let (kept_files, kept_bytes) =
        kept.fold((0usize, 0u64), |(n, bytes), e| (n + 1, bytes.saturating_add(e.size)));
    let added_bytes: u64 = additions.iter().map(|a| a.source.size).sum();

    let staged = StagedArchive::create(archive)?;
    let options = WriterOptions {
        level: config.compression_level,
        password: config
            .password()
            .filter(|_| capabilities.can_encrypt())
            .map(str::to_string),
        comment: Some(comment).filter(|c| !c.is_empty()),
        stream_name: None,
    };
    let mut writer = open_writer(staged.file()?, format, &options)?;

    let kind = result.operation;
    let mut reporter = ProgressReporter::new(
        ctx.progress.as_ref(),
        kind,
        kept_files + additions.len(),
        kept_bytes.saturating_add(added_bytes),
    );

    reader.visit(&mut |entry, stream| {
        ctx.cancel.check()?;
        if skip(entry) {
            debug!(entry = %entry.path, "entry dropped");
            return Ok(Visit::Continue);
        }
        let header = EntryHeader::from_entry(entry);
        if entry.is_directory {
            writer.add_directory(&header)?;
            return Ok(Visit::Continue);
        }
        if entry.is_link() {
            writer
                .add_link(&header)
                .map_err(|e| e.context(&format!("copying {}", entry.path)))?;
            return Ok(Visit::Continue);
        }

        reporter.start_entry(&entry.path);
        let data = stream.map_err(|e| e.context(&format!("copying {}", entry.path)))?;
        let mut tracked = TrackedReader::new(data, &ctx.cancel, &mut reporter);
        writer
            .add_file(&header, &mut tracked)
            .map_err(|e| writer_failure(e, &ctx.cancel).context(&format!("copying {}", entry.path)))?;
        reporter.finish_entry();
        Ok(Visit::Continue)
    })?;

    for mut addition in additions {
        let source = addition.source;
        ctx.cancel.check()?;
        reporter.start_entry(&source.archive_path);
        match write_source(writer.as_mut(), source, &mut addition.file, ctx, &mut reporter) {
            Ok(_) => result.processed.push(source.path.display().to_string()),
            // The entry it replaces is already gone from the rebuilt archive.
            Err(SourceError::Unreadable(err))
                if present.contains(source.archive_path.as_str()) =>
            {
                return Err(err.context(&format!("replacing {}", source.archive_path)));
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
    staged.commit()?;
    debug!(archive = %archive.display(), operation = %kind, "archive rebuilt");
    Ok(())
}
