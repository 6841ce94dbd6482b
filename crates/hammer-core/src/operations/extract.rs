//! Extraction of archive entries to disk.

use super::OperationContext;
use super::run_operation;
use crate::ArchiveError;
use crate::Result;
use crate::config::ExtractOptions;
use crate::config::ExtractionConfig;
use crate::config::OverwritePolicy;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_progress;
use crate::formats::Visit;
use crate::formats::open_reader;
use crate::paths::archive_stem;
use crate::paths::safe_join;
use crate::paths::unique_path;
use crate::progress::OperationKind;
use crate::progress::ProgressReporter;
use crate::report::OperationResult;
use crate::types::ArchiveEntry;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::warn;

/// Extracts the files of `archive` under `output_dir`.
///
/// Entries are written in archive order. A failing entry is recorded in
/// the result's error list and extraction moves on; cancellation stops
/// before the next entry and keeps the list of files written so far.
/// Every file is written to a temporary sibling first, so an interrupted
/// entry never leaves a partial file behind.
///
/// # Examples
///
/// ```no_run
/// use hammer_core::ExtractOptions;
/// use hammer_core::operations::OperationContext;
/// use hammer_core::operations::extract;
/// use std::path::Path;
///
/// let options = ExtractOptions::new().with_selection(["docs"]);
/// let result = extract(
///     Path::new("backup.zip"),
///     Path::new("restore"),
///     &options,
///     &OperationContext::new(),
/// );
/// println!("{}: {} files", result.message, result.processed.len());
/// ```
pub fn extract(
    archive: &Path,
    output_dir: &Path,
    options: &ExtractOptions,
    ctx: &OperationContext,
) -> OperationResult {
    run_operation(OperationKind::Extract, archive, |result| {
        extract_into(archive, output_dir, options, ctx, result)
    })
}

fn extract_into(
    archive: &Path,
    output_dir: &Path,
    options: &ExtractOptions,
    ctx: &OperationContext,
    result: &mut OperationResult,
) -> Result<()> {
    let mut reader = open_reader(archive, options.password.as_deref())?;
    reader.watch_cancellation(&ctx.cancel);
    let entries = reader.entries()?;

    let selection = options.selection.as_deref();
    let wanted = |entry: &ArchiveEntry| {
        selection.is_none_or(|targets| targets.iter().any(|t| entry.is_within(t)))
    };

    if let Some(targets) = selection {
        for target in targets {
            if !entries.iter().any(|e| e.is_within(target)) {
                result.add_warning(format!("{target}: not found in archive"));
            }
        }
    }

    let (total_files, total_bytes) = entries
        .iter()
        .filter(|&e| !e.is_directory && !e.is_link() && wanted(e))
        .fold((0usize, 0u64), |(n, bytes), e| (n + 1, bytes.saturating_add(e.size)));
    debug!(total_files, total_bytes, "extraction planned");

    let root = if options.config.create_subfolder {
        output_dir.join(archive_stem(archive))
    } else {
        output_dir.to_path_buf()
    };
    std::fs::create_dir_all(&root)?;

    let mut reporter = ProgressReporter::new(
        ctx.progress.as_ref(),
        OperationKind::Extract,
        total_files,
        total_bytes,
    );
    let mut buffer = CopyBuffer::new();
    let config = &options.config;

    reader.visit(&mut |entry, stream| {
        if !wanted(entry) {
            return Ok(Visit::Continue);
        }
        ctx.cancel.check()?;

        if entry.is_directory {
            if let Err(err) = safe_join(&root, &entry.path)
                .and_then(|dir| std::fs::create_dir_all(dir).map_err(ArchiveError::from))
            {
                warn!(entry = %entry.path, error = %err, "directory not created");
                result.add_error(&entry.path, &err);
            }
            return Ok(Visit::Continue);
        }
        if let Some(link) = &entry.link {
            debug!(entry = %entry.path, target = link.target(), "link skipped");
            result.add_warning(format!("{}: link to {} not extracted", entry.path, link.target()));
            return Ok(Visit::Continue);
        }

        reporter.start_entry(&entry.path);
        let written = stream.and_then(|data| {
            write_entry(entry, data, &root, config, &mut buffer, ctx, &mut reporter)
        });
        match written {
            Ok(Some(dest)) => {
                debug!(entry = %entry.path, dest = %dest.display(), "entry extracted");
                result.processed.push(entry.path.clone());
            }
            Ok(None) => {
                reporter.add_bytes(entry.size);
                result.add_warning(format!("{}: already exists, skipped", entry.path));
            }
            Err(err) if err.is_cancellation() => return Err(err),
            Err(err) => {
                warn!(entry = %entry.path, error = %err, "entry failed");
                result.add_error(&entry.path, &err);
            }
        }
        reporter.finish_entry();
        Ok(Visit::Continue)
    })
}

/// Writes one file entry. Returns `None` when the overwrite policy skipped it.
fn write_entry(
    entry: &ArchiveEntry,
    data: &mut dyn Read,
    root: &Path,
    config: &ExtractionConfig,
    buffer: &mut CopyBuffer,
    ctx: &OperationContext,
    reporter: &mut ProgressReporter<'_>,
) -> Result<Option<PathBuf>> {
    let mut dest = safe_join(root, &entry.path)?;
    if dest.symlink_metadata().is_ok() {
        match config.overwrite {
            OverwritePolicy::Overwrite => {}
            OverwritePolicy::SkipExisting => return Ok(None),
            OverwritePolicy::KeepBoth => dest = unique_path(&dest),
        }
    }

    let parent = dest.parent().unwrap_or(root);
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{}.", entry.name))
        .suffix(".part")
        .tempfile_in(parent)?;
    copy_with_progress(data, temp.as_file_mut(), buffer, &ctx.cancel, reporter)?;

    if config.preserve_timestamps
        && let Some(modified) = entry.modified
    {
        temp.as_file().set_modified(modified)?;
    }
    apply_mode(temp.as_file(), entry.attributes)?;

    temp.persist(&dest).map_err(|e| ArchiveError::Io(e.error))?;
    Ok(Some(dest))
}

#[cfg(unix)]
fn apply_mode(file: &File, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let bits = mode.map_or(0o644, |m| m & 0o777);
    file.set_permissions(std::fs::Permissions::from_mode(bits))?;
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_file: &File, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::report::Outcome;
    use crate::test_utils::create_test_zip;
    use crate::test_utils::write_fixture;

    fn fixture(dir: &Path) -> PathBuf {
        let zip = create_test_zip(&[
            ("docs/", b""),
            ("docs/a.txt", b"alpha"),
            ("docs/b.txt", b"bravo"),
            ("top.txt", b"top"),
        ]);
        write_fixture(dir, "fixture.zip", &zip)
    }

    #[test]
    fn test_extract_everything() {
        let temp = tempfile::tempdir().unwrap();
        let archive = fixture(temp.path());
        let out = temp.path().join("out");

        let result = extract(&archive, &out, &ExtractOptions::new(), &OperationContext::new());

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.processed, vec!["docs/a.txt", "docs/b.txt", "top.txt"]);
        assert_eq!(std::fs::read(out.join("docs/a.txt")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(out.join("top.txt")).unwrap(), b"top");
        assert_eq!(std::fs::read_dir(out.join("docs")).unwrap().count(), 2);
    }

    #[test]
    fn test_extract_selection() {
        let temp = tempfile::tempdir().unwrap();
        let archive = fixture(temp.path());
        let out = temp.path().join("out");

        let options = ExtractOptions::new().with_selection(["docs/b.txt", "missing.txt"]);
        let result = extract(&archive, &out, &options, &OperationContext::new());

        assert!(result.success);
        assert_eq!(result.processed, vec!["docs/b.txt"]);
        assert_eq!(result.warnings, vec!["missing.txt: not found in archive"]);
        assert!(!out.join("top.txt").exists());
    }

    #[test]
    fn test_skip_existing_and_keep_both() {
        let temp = tempfile::tempdir().unwrap();
        let archive = fixture(temp.path());
        let out = temp.path().join("out");
        write_fixture(&out, "top.txt", b"mine");

        let skip = ExtractOptions::new()
            .with_selection(["top.txt"])
            .with_config(ExtractionConfig::new().with_overwrite(OverwritePolicy::SkipExisting));
        let result = extract(&archive, &out, &skip, &OperationContext::new());
        assert!(result.success);
        assert!(result.processed.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(std::fs::read(out.join("top.txt")).unwrap(), b"mine");

        let keep = ExtractOptions::new()
            .with_selection(["top.txt"])
            .with_config(ExtractionConfig::new().with_overwrite(OverwritePolicy::KeepBoth));
        let result = extract(&archive, &out, &keep, &OperationContext::new());
        assert!(result.success);
        assert_eq!(std::fs::read(out.join("top.txt")).unwrap(), b"mine");
        assert_eq!(std::fs::read(out.join("top (1).txt")).unwrap(), b"top");
    }

    #[test]
    fn test_links_are_reported_not_extracted() {
        let temp = tempfile::tempdir().unwrap();
        let tar = crate::test_utils::create_test_tar(&[("a.txt", b"alpha"), ("latest -> a.txt", b"")]);
        let archive = write_fixture(temp.path(), "links.tar", &tar);
        let out = temp.path().join("out");

        let result = extract(&archive, &out, &ExtractOptions::new(), &OperationContext::new());

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.processed, vec!["a.txt"]);
        assert_eq!(result.warnings, vec!["latest: link to a.txt not extracted"]);
        assert!(out.join("latest").symlink_metadata().is_err());
    }

    #[test]
    fn test_traversal_entry_is_a_per_entry_error() {
        let temp = tempfile::tempdir().unwrap();
        let zip = create_test_zip(&[("../evil.txt", b"x"), ("fine.txt", b"ok")]);
        let archive = write_fixture(temp.path(), "evil.zip", &zip);
        let out = temp.path().join("out");

        let result = extract(&archive, &out, &ExtractOptions::new(), &OperationContext::new());

        assert_eq!(result.outcome, Outcome::CompletedWithErrors);
        assert_eq!(result.processed, vec!["fine.txt"]);
        assert_eq!(result.errors.len(), 1);
        assert!(!temp.path().join("evil.txt").exists());
    }

    #[test]
    fn test_subfolder() {
        let temp = tempfile::tempdir().unwrap();
        let archive = fixture(temp.path());
        let out = temp.path().join("out");

        let options =
            ExtractOptions::new().with_config(ExtractionConfig::new().with_create_subfolder(true));
        let result = extract(&archive, &out, &options, &OperationContext::new());
        assert!(result.success);
        assert!(out.join("fixture/docs/a.txt").is_file());
    }

    #[test]
    fn test_cancelled_before_start() {
        let temp = tempfile::tempdir().unwrap();
        let archive = fixture(temp.path());
        let out = temp.path().join("out");

        let ctx = OperationContext::new();
        ctx.cancel.cancel();
        let result = extract(&archive, &out, &ExtractOptions::new(), &ctx);

        assert!(result.is_cancelled());
        assert!(!result.success);
        assert!(result.processed.is_empty());
        assert!(!out.join("top.txt").exists());
    }

    #[test]
    fn test_missing_archive_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let result = extract(
            &temp.path().join("none.zip"),
            temp.path(),
            &ExtractOptions::new(),
            &OperationContext::new(),
        );
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(matches!(result.error, Some(ArchiveError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_mode_applied() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let archive = fixture(temp.path());
        let out = temp.path().join("out");
        extract(&archive, &out, &ExtractOptions::new(), &OperationContext::new());

        let mode = std::fs::metadata(out.join("top.txt")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
