//! Format registry, detection and per-format reader/writer handlers.
//!
//! [`open_reader`] and [`open_writer`] are the only places that dispatch on
//! [`ArchiveFormat`]; everything above them works through the
//! [`ArchiveReader`] and [`ArchiveWriter`] traits.

pub mod compression;
mod detect;
mod registry;
pub mod sevenz;
pub mod single;
pub mod tar;
pub mod traits;
pub mod zip;

pub use detect::detect_format;
pub use detect::sniff_format;
pub use registry::ArchiveFormat;
pub use registry::FormatCapabilities;
pub use registry::FormatInfo;
pub use registry::format_info;
pub use registry::supported_formats;
pub use traits::ArchiveReader;
pub use traits::ArchiveWriter;
pub use traits::EntryHeader;
pub use traits::EntryVisitor;
pub use traits::Visit;
pub use traits::WriterOptions;

use crate::ArchiveError;
use crate::Result;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Resolves the format of an existing archive file.
///
/// The file name is tried first; magic bytes are only consulted when the
/// name is not recognized.
///
/// # Errors
///
/// Returns [`ArchiveError::NotFound`] if the file does not exist and
/// [`ArchiveError::UnknownFormat`] if neither name nor content match.
pub fn resolve_format(path: &Path) -> Result<ArchiveFormat> {
    if !path.is_file() {
        return Err(ArchiveError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let mut format = detect_format(path);
    if format == ArchiveFormat::Unknown {
        format = sniff_format(path);
        debug!(path = %path.display(), %format, "format resolved from content");
    }
    if format == ArchiveFormat::Unknown {
        return Err(ArchiveError::UnknownFormat {
            path: path.to_path_buf(),
        });
    }
    Ok(format)
}

/// Opens `path` with the handler for its format.
///
/// # Errors
///
/// - [`ArchiveError::NotFound`] / [`ArchiveError::UnknownFormat`] from
///   [`resolve_format`]
/// - [`ArchiveError::UnsupportedOperation`] for recognized formats that
///   cannot be read
/// - format and password errors from the handler
///
/// # Examples
///
/// ```no_run
/// use hammer_core::formats::open_reader;
/// use std::path::Path;
///
/// let mut reader = open_reader(Path::new("backup.zip"), None)?;
/// for entry in reader.entries()? {
///     println!("{} ({} bytes)", entry.path, entry.size);
/// }
/// # Ok::<(), hammer_core::ArchiveError>(())
/// ```
pub fn open_reader(path: &Path, password: Option<&str>) -> Result<Box<dyn ArchiveReader>> {
    let format = resolve_format(path)?;
    if !format.capabilities().can_read() {
        return Err(ArchiveError::UnsupportedOperation {
            format,
            operation: "reading",
        });
    }

    debug!(path = %path.display(), %format, "opening archive");
    let reader: Box<dyn ArchiveReader> = match format {
        ArchiveFormat::Zip => Box::new(zip::ZipReader::open(path, password)?),
        ArchiveFormat::SevenZip => Box::new(sevenz::SevenZipReader::open(path, password)?),
        f if f.is_tar() => Box::new(tar::TarReader::open(path, f)?),
        f if f.is_single_stream() => Box::new(single::SingleStreamReader::open(path, f)?),
        other => {
            return Err(ArchiveError::UnsupportedOperation {
                format: other,
                operation: "reading",
            });
        }
    };
    Ok(reader)
}

/// Creates a writer for `format` on an already-open, empty file.
///
/// # Errors
///
/// Returns [`ArchiveError::UnsupportedOperation`] if the format cannot be
/// written, or if a password is set for a format without encryption.
pub fn open_writer(
    file: File,
    format: ArchiveFormat,
    options: &WriterOptions,
) -> Result<Box<dyn ArchiveWriter>> {
    let capabilities = format.capabilities();
    if !capabilities.can_write() {
        return Err(ArchiveError::UnsupportedOperation {
            format,
            operation: "writing",
        });
    }
    if options.password.is_some() && !capabilities.can_encrypt() {
        return Err(ArchiveError::UnsupportedOperation {
            format,
            operation: "encryption",
        });
    }

    let writer: Box<dyn ArchiveWriter> = match format {
        ArchiveFormat::Zip => Box::new(zip::ZipArchiveWriter::new(file, options)),
        ArchiveFormat::SevenZip => Box::new(sevenz::SevenZipWriter::new(file, options)?),
        f if f.is_tar() => Box::new(tar::TarArchiveWriter::new(file, f, options)?),
        f if f.is_single_stream() => Box::new(single::SingleStreamWriter::new(file, f, options)?),
        other => {
            return Err(ArchiveError::UnsupportedOperation {
                format: other,
                operation: "writing",
            });
        }
    };
    Ok(writer)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_zip;
    use crate::test_utils::write_fixture;

    #[test]
    fn test_open_reader_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let result = open_reader(&temp.path().join("absent.zip"), None);
        assert!(matches!(result, Err(ArchiveError::NotFound { .. })));
    }

    #[test]
    fn test_open_reader_unknown_format() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_fixture(temp.path(), "notes.txt", b"just text");
        assert!(matches!(
            open_reader(&path, None),
            Err(ArchiveError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_open_reader_sniffs_unnamed_zip() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_fixture(temp.path(), "download.bin", &create_test_zip(&[("a", b"1")]));
        let reader = open_reader(&path, None).unwrap();
        assert_eq!(reader.format(), ArchiveFormat::Zip);
    }

    #[test]
    fn test_recognized_but_unreadable() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_fixture(temp.path(), "old.rar", b"Rar!\x1a\x07\x00");
        assert!(matches!(
            open_reader(&path, None),
            Err(ArchiveError::UnsupportedOperation {
                format: ArchiveFormat::Rar,
                ..
            })
        ));
    }

    #[test]
    fn test_open_writer_rejects_password_without_encryption() {
        let temp = tempfile::tempdir().unwrap();
        let file = File::create(temp.path().join("a.tar")).unwrap();
        let options = WriterOptions {
            password: Some("pw".into()),
            ..WriterOptions::default()
        };
        assert!(matches!(
            open_writer(file, ArchiveFormat::Tar, &options),
            Err(ArchiveError::UnsupportedOperation {
                operation: "encryption",
                ..
            })
        ));
    }

    #[test]
    fn test_open_writer_rejects_read_only_format() {
        let temp = tempfile::tempdir().unwrap();
        let file = File::create(temp.path().join("a.iso")).unwrap();
        assert!(matches!(
            open_writer(file, ArchiveFormat::Iso, &WriterOptions::default()),
            Err(ArchiveError::UnsupportedOperation { .. })
        ));
    }
}
