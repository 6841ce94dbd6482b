//! Integrity testing.

use super::OperationContext;
use super::run_operation;
use crate::ArchiveError;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::TEST_CHUNK_SIZE;
use crate::copy::copy_with_progress;
use crate::formats::Visit;
use crate::formats::open_reader;
use crate::progress::OperationKind;
use crate::progress::ProgressReporter;
use crate::report::OperationResult;
use std::io;
use std::path::Path;
use tracing::debug;
use tracing::warn;

/// Decodes every file entry of `archive` without writing anything.
///
/// Each entry is drained in small chunks with a cancellation check per
/// chunk. An entry that fails to decode, fails its checksum or yields a
/// different number of bytes than its header announces is recorded as an
/// error, and the scan continues with the next entry.
pub fn test_archive(
    archive: &Path,
    password: Option<&str>,
    ctx: &OperationContext,
) -> OperationResult {
    run_operation(OperationKind::Test, archive, |result| {
        scan(archive, password, ctx, result)
    })
}

fn scan(
    archive: &Path,
    password: Option<&str>,
    ctx: &OperationContext,
    result: &mut OperationResult,
) -> Result<()> {
    let mut reader = open_reader(archive, password)?;
    reader.watch_cancellation(&ctx.cancel);
    let format = reader.format();
    if !format.capabilities().can_test() {
        return Err(ArchiveError::UnsupportedOperation {
            format,
            operation: "testing",
        });
    }

    let (total_files, total_bytes) = reader
        .entries()?
        .iter()
        .filter(|e| !e.is_directory)
        .fold((0usize, 0u64), |(n, bytes), e| (n + 1, bytes.saturating_add(e.size)));

    let mut reporter =
        ProgressReporter::new(ctx.progress.as_ref(), OperationKind::Test, total_files, total_bytes);
    let mut buffer = CopyBuffer::with_size(TEST_CHUNK_SIZE);

    reader.visit(&mut |entry, stream| {
        if entry.is_directory {
            return Ok(Visit::Continue);
        }
        ctx.cancel.check()?;
        reporter.start_entry(&entry.path);

        let drained = stream.and_then(|data| {
            copy_with_progress(data, &mut io::sink(), &mut buffer, &ctx.cancel, &mut reporter)
        });
        match drained {
            Ok(read) if read == entry.size => {
                debug!(entry = %entry.path, bytes = read, "entry ok");
                result.processed.push(entry.path.clone());
            }
            Ok(read) => {
                let err = ArchiveError::InvalidArchive(format!(
                    "size mismatch: expected {} bytes, decoded {read}",
                    entry.size
                ));
                warn!(entry = %entry.path, error = %err, "entry failed test");
                result.add_error(&entry.path, &err);
            }
            Err(err) if err.is_cancellation() => return Err(err),
            Err(err) => {
                warn!(entry = %entry.path, error = %err, "entry failed test");
                result.add_error(&entry.path, &err);
            }
        }
        reporter.finish_entry();
        Ok(Visit::Continue)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::report::Outcome;
    use crate::test_utils::create_test_tar;
    use crate::test_utils::create_test_zip;
    use crate::test_utils::write_fixture;

    #[test]
    fn test_clean_archive_passes() {
        let temp = tempfile::tempdir().unwrap();
        let tar = create_test_tar(&[("d/", b""), ("d/a", b"aaa"), ("b", b"bb")]);
        let archive = write_fixture(temp.path(), "ok.tar", &tar);

        let result = test_archive(&archive, None, &OperationContext::new());
        assert!(result.success);
        assert_eq!(result.message, "Archive test passed");
        assert_eq!(result.processed, vec!["d/a", "b"]);
    }

    #[test]
    fn test_corrupt_entry_is_reported_and_scan_continues() {
        let temp = tempfile::tempdir().unwrap();
        let mut zip = create_test_zip(&[("first.txt", b"first payload"), ("second.txt", b"second")]);
        let pos = zip
            .windows(13)
            .position(|w| w == b"first payload")
            .unwrap();
        zip[pos] ^= 0xff;
        let archive = write_fixture(temp.path(), "bad.zip", &zip);

        let result = test_archive(&archive, None, &OperationContext::new());
        assert_eq!(result.outcome, Outcome::CompletedWithErrors);
        assert_eq!(result.message, "Archive test found 1 errors");
        assert_eq!(result.processed, vec!["second.txt"]);
        assert!(result.errors[0].starts_with("first.txt: "));
    }

    #[test]
    fn test_cancelled_test() {
        let temp = tempfile::tempdir().unwrap();
        let archive = write_fixture(temp.path(), "a.zip", &create_test_zip(&[("a", b"a")]));
        let ctx = OperationContext::new();
        ctx.cancel.cancel();

        let result = test_archive(&archive, None, &ctx);
        assert!(result.is_cancelled());
        assert_eq!(result.message, "Archive test cancelled by user");
    }

    #[test]
    fn test_not_an_archive() {
        let temp = tempfile::tempdir().unwrap();
        let archive = write_fixture(temp.path(), "fake.zip", b"definitely not a zip");
        let result = test_archive(&archive, None, &OperationContext::new());
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(matches!(result.error, Some(ArchiveError::InvalidArchive(_))));
    }
}
