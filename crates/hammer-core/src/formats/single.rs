//! Single-stream compressed files (`.gz`, `.bz2`, `.lzma`, `.xz`, `.zst`).
//!
//! These containers hold exactly one unnamed entry. Its name comes from
//! the gzip header when present, otherwise from the archive file name with
//! the compression suffix removed. The uncompressed size is not recorded
//! by most of these formats, so listings decode the whole stream once,
//! checking the cancellation token handed to
//! [`ArchiveReader::watch_cancellation`] between chunks.

use crate::ArchiveError;
use crate::Result;
use crate::cancel::CancellationToken;
use crate::copy::CopyBuffer;
use crate::copy::drain;
use crate::copy::into_archive_error;
use crate::formats::ArchiveFormat;
use crate::formats::compression::CompressionCodec;
use crate::formats::compression::StreamEncoder;
use crate::formats::traits::ArchiveReader;
use crate::formats::traits::ArchiveWriter;
use crate::formats::traits::EntryHeader;
use crate::formats::traits::EntryVisitor;
use crate::formats::traits::WriterOptions;
use crate::types::ArchiveEntry;
use crate::types::ArchiveMetadata;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::io::{self};
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;

const FALLBACK_ENTRY_NAME: &str = "data";

/// Reader over a single-stream compressed file.
pub struct SingleStreamReader {
    path: PathBuf,
    file: File,
    format: ArchiveFormat,
    codec: CompressionCodec,
    entry: Option<ArchiveEntry>,
    cancel: CancellationToken,
}

impl SingleStreamReader {
    /// Opens the file and checks that the stream decodes.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidArchive`] if the first bytes do not
    /// decode, or [`ArchiveError::UnsupportedOperation`] if `format` is not
    /// a single-stream format.
    pub fn open(path: &Path, format: ArchiveFormat) -> Result<Self> {
        let codec = CompressionCodec::for_format(format).ok_or(ArchiveError::UnsupportedOperation {
            format,
            operation: "single-stream reading",
        })?;
        let reader = Self {
            path: path.to_path_buf(),
            file: File::open(path)?,
            format,
            codec,
            entry: None,
            cancel: CancellationToken::new(),
        };

        reader
            .stream()?
            .take(1)
            .read_to_end(&mut Vec::new())
            .map_err(|e| reader.corrupt(&e))?;
        Ok(reader)
    }

    fn rewound(&self) -> Result<BufReader<File>> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(BufReader::new(file))
    }

    fn stream(&self) -> Result<Box<dyn Read>> {
        self.codec.decoder(self.rewound()?)
    }

    fn corrupt(&self, err: &io::Error) -> ArchiveError {
        ArchiveError::InvalidArchive(format!("corrupt {} stream: {err}", self.format))
    }

    /// Name and mtime from the gzip header, if any.
    fn gzip_header(&self) -> Result<(Option<String>, Option<SystemTime>)> {
        if self.codec != CompressionCodec::Gzip {
            return Ok((None, None));
        }
        let decoder = flate2::read::GzDecoder::new(self.rewound()?);
        let Some(header) = decoder.header() else {
            return Ok((None, None));
        };
        let name = header
            .filename()
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .filter(|name| !name.is_empty());
        let mtime = Some(header.mtime())
            .filter(|&secs| secs != 0)
            .and_then(|secs| SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(u64::from(secs))));
        Ok((name, mtime))
    }

    fn describe(&mut self) -> Result<ArchiveEntry> {
        if let Some(entry) = &self.entry {
            return Ok(entry.clone());
        }

        let (header_name, header_mtime) = self.gzip_header()?;
        let name = header_name.unwrap_or_else(|| stripped_name(&self.path));

        let size = match drain(&mut self.stream()?, &mut CopyBuffer::new(), &self.cancel) {
            Ok(size) => size,
            Err(ArchiveError::Io(e)) => return Err(self.corrupt(&e)),
            Err(other) => return Err(other),
        };
        let stat = self.file.metadata()?;

        let mut entry = ArchiveEntry::new(&name, false);
        entry.size = size;
        entry.compressed_size = stat.len();
        entry.modified = header_mtime.or_else(|| stat.modified().ok());
        entry.compression_method = self.codec.label().to_string();

        self.entry = Some(entry.clone());
        Ok(entry)
    }
}

/// Archive file name without its last extension.
fn stripped_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| FALLBACK_ENTRY_NAME.to_string())
}

impl ArchiveReader for SingleStreamReader {
    fn format(&self) -> ArchiveFormat {
        self.format
    }

    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        Ok(vec![self.describe()?])
    }

    fn visit(&mut self, visitor: &mut EntryVisitor<'_>) -> Result<()> {
        let entry = self.describe()?;
        let mut stream = self.stream()?;
        visitor(&entry, Ok(&mut stream))?;
        Ok(())
    }

    fn metadata(&mut self) -> Result<ArchiveMetadata> {
        let entries = self.entries()?;
        Ok(ArchiveMetadata::from_entries(self.path.clone(), self.format, &entries))
    }

    fn watch_cancellation(&mut self, cancel: &CancellationToken) {
        self.cancel = cancel.clone();
    }
}

/// Writer producing a single-stream compressed file.
///
/// The first file entry becomes the stream content; a second one is
/// rejected.
pub struct SingleStreamWriter {
    format: ArchiveFormat,
    codec: CompressionCodec,
    level: u8,
    stream_name: Option<String>,
    sink: Option<BufWriter<File>>,
    encoder: Option<StreamEncoder<BufWriter<File>>>,
}

impl SingleStreamWriter {
    /// Prepares a writer for `format` on `file`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::UnsupportedOperation`] if `format` is not a
    /// single-stream format.
    pub fn new(file: File, format: ArchiveFormat, options: &WriterOptions) -> Result<Self> {
        let codec = CompressionCodec::for_format(format).ok_or(ArchiveError::UnsupportedOperation {
            format,
            operation: "single-stream writing",
        })?;
        Ok(Self {
            format,
            codec,
            level: options.level,
            stream_name: options.stream_name.clone(),
            sink: Some(BufWriter::new(file)),
            encoder: None,
        })
    }
}

impl ArchiveWriter for SingleStreamWriter {
    fn add_directory(&mut self, _header: &EntryHeader) -> Result<()> {
        Err(ArchiveError::UnsupportedOperation {
            format: self.format,
            operation: "directory entries",
        })
    }

    fn add_file(&mut self, header: &EntryHeader, data: &mut dyn Read) -> Result<u64> {
        let Some(sink) = self.sink.take() else {
            return Err(ArchiveError::UnsupportedOperation {
                format: self.format,
                operation: "more than one entry",
            });
        };

        let name = self
            .stream_name
            .clone()
            .unwrap_or_else(|| header.path.rsplit('/').next().unwrap_or_default().to_string());
        let mtime = header
            .modified
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .and_then(|d| u32::try_from(d.as_secs()).ok())
            .unwrap_or(0);

        let encoder = self.encoder.insert(self.codec.encoder(sink, self.level, Some(&name), mtime)?);
        io::copy(data, encoder).map_err(into_archive_error)
    }

    fn add_link(&mut self, _header: &EntryHeader) -> Result<()> {
        Err(ArchiveError::UnsupportedOperation {
            format: self.format,
            operation: "link entries",
        })
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let Self {
            codec,
            level,
            sink,
            encoder,
            ..
        } = *self;
        let mut sink = match (encoder, sink) {
            (Some(encoder), _) => encoder.finish()?,
            // No entry was pushed: write a valid empty stream.
            (None, Some(sink)) => codec.encoder(sink, level, None, 0)?.finish()?,
            (None, None) => return Ok(()),
        };
        sink.flush()?;
        sink.get_ref().sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::formats::traits::Visit;

    fn write_stream(path: &Path, format: ArchiveFormat, name: &str, data: &[u8]) {
        let mut writer: Box<dyn ArchiveWriter> = Box::new(
            SingleStreamWriter::new(File::create(path).unwrap(), format, &WriterOptions::default()).unwrap(),
        );
        writer
            .add_file(&EntryHeader::new(name, data.len() as u64), &mut &data[..])
            .unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn test_gzip_name_from_header() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("renamed.gz");
        write_stream(&path, ArchiveFormat::GZip, "dir/original.txt", b"payload");

        let mut reader = SingleStreamReader::open(&path, ArchiveFormat::GZip).unwrap();
        let entries = reader.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "original.txt");
        assert_eq!(entries[0].size, 7);
    }

    #[test]
    fn test_name_from_file_stem() {
        let temp = tempfile::tempdir().unwrap();
        for (file, format) in [
            ("notes.txt.bz2", ArchiveFormat::BZip2),
            ("notes.txt.xz", ArchiveFormat::Xz),
            ("notes.txt.lzma", ArchiveFormat::Lzma),
            ("notes.txt.zst", ArchiveFormat::Zstd),
        ] {
            let path = temp.path().join(file);
            write_stream(&path, format, "ignored", b"twelve bytes");

            let mut reader = SingleStreamReader::open(&path, format).unwrap();
            let entries = reader.entries().unwrap();
            assert_eq!(entries[0].path, "notes.txt", "{format}");
            assert_eq!(entries[0].size, 12, "{format}");

            let mut content = Vec::new();
            reader
                .visit(&mut |_, stream| {
                    stream?.read_to_end(&mut content)?;
                    Ok(Visit::Continue)
                })
                .unwrap();
            assert_eq!(content, b"twelve bytes", "{format}");
        }
    }

    #[test]
    fn test_second_entry_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let mut writer = SingleStreamWriter::new(
            File::create(temp.path().join("x.gz")).unwrap(),
            ArchiveFormat::GZip,
            &WriterOptions::default(),
        )
        .unwrap();
        writer.add_file(&EntryHeader::new("a", 1), &mut &b"a"[..]).unwrap();
        let second = writer.add_file(&EntryHeader::new("b", 1), &mut &b"b"[..]);
        assert!(matches!(
            second,
            Err(ArchiveError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            writer.add_directory(&EntryHeader::new("d", 0)),
            Err(ArchiveError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_sizing_pass_observes_cancellation() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("big.xz");
        write_stream(&path, ArchiveFormat::Xz, "big", &vec![3u8; 512 * 1024]);

        let mut reader = SingleStreamReader::open(&path, ArchiveFormat::Xz).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        reader.watch_cancellation(&cancel);
        assert!(matches!(reader.entries(), Err(ArchiveError::Cancelled)));
        assert!(matches!(reader.metadata(), Err(ArchiveError::Cancelled)));

        reader.watch_cancellation(&CancellationToken::new());
        assert_eq!(reader.entries().unwrap()[0].size, 512 * 1024);
    }

    #[test]
    fn test_corrupt_stream() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("bad.xz");
        std::fs::write(&path, b"not xz at all").unwrap();
        assert!(matches!(
            SingleStreamReader::open(&path, ArchiveFormat::Xz),
            Err(ArchiveError::InvalidArchive(_))
        ));
    }

    #[test]
    fn test_stripped_name() {
        assert_eq!(stripped_name(Path::new("/tmp/a.tar.gz")), "a.tar");
        assert_eq!(stripped_name(Path::new("log.gz")), "log");
    }
}
