//! TAR family reader and writer (`.tar`, `.tar.gz`, `.tar.bz2`, `.tar.xz`,
//! `.tar.zst`).
//!
//! Tar streams are sequential, so every listing or visit re-reads the
//! archive from the start through a fresh decoder. Regular files,
//! directories and links are exposed; device nodes and FIFOs are skipped.

use crate::ArchiveError;
use crate::Result;
use crate::copy::into_archive_error;
use crate::formats::ArchiveFormat;
use crate::formats::compression::CompressionCodec;
use crate::formats::compression::StreamEncoder;
use crate::formats::traits::ArchiveReader;
use crate::formats::traits::ArchiveWriter;
use crate::formats::traits::EntryHeader;
use crate::formats::traits::EntryVisitor;
use crate::formats::traits::Visit;
use crate::formats::traits::WriterOptions;
use crate::types::ArchiveEntry;
use crate::types::ArchiveMetadata;
use crate::types::EntryLink;
use crate::types::normalize_entry_path;
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
use tar::EntryType;

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_LINK_MODE: u32 = 0o777;

/// Reader over a plain or compressed tar archive.
pub struct TarReader {
    path: PathBuf,
    file: File,
    format: ArchiveFormat,
    codec: Option<CompressionCodec>,
}

impl TarReader {
    /// Opens the archive and checks that the first header parses.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidArchive`] if the stream cannot be
    /// decoded as tar.
    pub fn open(path: &Path, format: ArchiveFormat) -> Result<Self> {
        let reader = Self {
            path: path.to_path_buf(),
            file: File::open(path)?,
            format,
            codec: CompressionCodec::for_format(format),
        };

        let mut archive = reader.archive()?;
        let mut entries = archive.entries().map_err(|e| reader.corrupt(&e))?;
        if let Some(Err(e)) = entries.next() {
            return Err(reader.corrupt(&e));
        }
        drop(entries);

        Ok(reader)
    }

    fn archive(&self) -> Result<tar::Archive<Box<dyn Read>>> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(0))?;
        let buffered = BufReader::new(file);
        let stream: Box<dyn Read> = match self.codec {
            Some(codec) => codec.decoder(buffered)?,
            None => Box::new(buffered),
        };
        Ok(tar::Archive::new(stream))
    }

    fn corrupt(&self, err: &io::Error) -> ArchiveError {
        ArchiveError::InvalidArchive(format!("corrupt {} stream: {err}", self.format))
    }

    fn method(&self) -> &'static str {
        self.codec.map_or("Stored", CompressionCodec::label)
    }
}

fn entry_from_tar<R: Read>(entry: &tar::Entry<'_, R>, method: &str) -> Result<Option<ArchiveEntry>> {
    let header = entry.header();
    let kind = header.entry_type();
    let is_directory = kind.is_dir();
    let link = match kind {
        EntryType::Symlink => link_target(entry)?.map(EntryLink::Symbolic),
        EntryType::Link => {
            link_target(entry)?.map(|target| EntryLink::Hard(normalize_entry_path(&target)))
        }
        _ => None,
    };
    if !is_directory && link.is_none() && !kind.is_file() && kind != EntryType::Continuous {
        return Ok(None);
    }

    let path = entry.path()?;
    let mut archive_entry = ArchiveEntry::new(&path.to_string_lossy(), is_directory);
    if !is_directory && link.is_none() {
        archive_entry.size = entry.size();
        archive_entry.compressed_size = entry.size();
    }
    archive_entry.modified = header
        .mtime()
        .ok()
        .and_then(|secs| SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(secs)));
    archive_entry.attributes = header.mode().ok();
    archive_entry.compression_method = method.to_string();
    archive_entry.link = link;

    Ok(Some(archive_entry))
}

fn link_target<R: Read>(entry: &tar::Entry<'_, R>) -> Result<Option<String>> {
    Ok(entry
        .link_name()?
        .map(|target| target.to_string_lossy().into_owned())
        .filter(|target| !target.is_empty()))
}

impl ArchiveReader for TarReader {
    fn format(&self) -> ArchiveFormat {
        self.format
    }

    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let method = self.method();
        let mut archive = self.archive()?;
        let mut out = Vec::new();

        for entry in archive.entries().map_err(|e| self.corrupt(&e))? {
            let entry = entry.map_err(|e| self.corrupt(&e))?;
            if let Some(info) = entry_from_tar(&entry, method)? {
                out.push(info);
            }
        }
        Ok(out)
    }

    fn visit(&mut self, visitor: &mut EntryVisitor<'_>) -> Result<()> {
        let method = self.method();
        let mut archive = self.archive()?;

        for entry in archive.entries().map_err(|e| self.corrupt(&e))? {
            let mut entry = entry.map_err(|e| self.corrupt(&e))?;
            let Some(info) = entry_from_tar(&entry, method)? else {
                continue;
            };
            if visitor(&info, Ok(&mut entry))? == Visit::Stop {
                break;
            }
        }
        Ok(())
    }

    fn metadata(&mut self) -> Result<ArchiveMetadata> {
        let entries = self.entries()?;
        let mut metadata = ArchiveMetadata::from_entries(self.path.clone(), self.format, &entries);
        if self.codec.is_some() {
            metadata.total_compressed_size = self.file.metadata()?.len();
            metadata.is_solid = true;
        }
        Ok(metadata)
    }
}

/// Writer producing a tar archive, optionally through a stream codec.
pub struct TarArchiveWriter {
    builder: tar::Builder<StreamEncoder<BufWriter<File>>>,
}

impl TarArchiveWriter {
    /// Starts a tar archive of `format` on `file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the codec cannot be initialized.
    pub fn new(file: File, format: ArchiveFormat, options: &WriterOptions) -> Result<Self> {
        let sink = BufWriter::new(file);
        let stream = match CompressionCodec::for_format(format) {
            Some(codec) => codec.encoder(sink, options.level, None, 0)?,
            None => StreamEncoder::Plain(sink),
        };
        Ok(Self {
            builder: tar::Builder::new(stream),
        })
    }
}

fn mtime_secs(modified: Option<SystemTime>) -> u64 {
    modified
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs())
}

impl ArchiveWriter for TarArchiveWriter {
    fn add_directory(&mut self, header: &EntryHeader) -> Result<()> {
        let mut tar_header = tar::Header::new_gnu();
        tar_header.set_entry_type(EntryType::Directory);
        tar_header.set_size(0);
        tar_header.set_mode(header.mode.unwrap_or(DEFAULT_DIR_MODE));
        tar_header.set_mtime(mtime_secs(header.modified));
        self.builder
            .append_data(&mut tar_header, format!("{}/", header.path), io::empty())?;
        Ok(())
    }

    fn add_file(&mut self, header: &EntryHeader, data: &mut dyn Read) -> Result<u64> {
        let mut tar_header = tar::Header::new_gnu();
        tar_header.set_entry_type(EntryType::Regular);
        tar_header.set_size(header.size);
        tar_header.set_mode(header.mode.unwrap_or(DEFAULT_FILE_MODE));
        tar_header.set_mtime(mtime_secs(header.modified));

        let mut limited = data.take(header.size);
        self.builder
            .append_data(&mut tar_header, &header.path, &mut limited)
            .map_err(into_archive_error)?;

        if limited.limit() > 0 {
            return Err(ArchiveError::InvalidArchive(format!(
                "{}: source ended {} bytes short of its recorded size",
                header.path,
                limited.limit()
            )));
        }
        Ok(header.size)
    }

    fn add_link(&mut self, header: &EntryHeader) -> Result<()> {
        let Some(link) = &header.link else {
            return Err(ArchiveError::InvalidConfig {
                reason: format!("{}: link entry without a target", header.path),
            });
        };
        let mut tar_header = tar::Header::new_gnu();
        tar_header.set_entry_type(match link {
            EntryLink::Symbolic(_) => EntryType::Symlink,
            EntryLink::Hard(_) => EntryType::Link,
        });
        tar_header.set_size(0);
        tar_header.set_mode(header.mode.unwrap_or(DEFAULT_LINK_MODE));
        tar_header.set_mtime(mtime_secs(header.modified));
        self.builder
            .append_link(&mut tar_header, &header.path, link.target())?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let stream = self.builder.into_inner()?;
        let mut sink = stream.finish()?;
        sink.flush()?;
        sink.get_ref().sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_tar;
    use crate::test_utils::write_fixture;

    fn write_archive(path: &Path, format: ArchiveFormat, files: &[(&str, &[u8])]) {
        let options = WriterOptions {
            level: 6,
            ..WriterOptions::default()
        };
        let mut writer: Box<dyn ArchiveWriter> =
            Box::new(TarArchiveWriter::new(File::create(path).unwrap(), format, &options).unwrap());
        for (name, data) in files {
            if let Some(dir) = name.strip_suffix('/') {
                writer.add_directory(&EntryHeader::new(dir, 0)).unwrap();
            } else {
                let header = EntryHeader::new(*name, data.len() as u64).with_mode(Some(0o600));
                writer.add_file(&header, &mut &data[..]).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_reads_plain_tar() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_fixture(
            temp.path(),
            "t.tar",
            &create_test_tar(&[("docs/", b""), ("docs/a.txt", b"alpha")]),
        );

        let mut reader = TarReader::open(&path, ArchiveFormat::Tar).unwrap();
        let entries = reader.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_directory);
        assert_eq!(entries[0].path, "docs");
        assert_eq!(entries[1].path, "docs/a.txt");
        assert_eq!(entries[1].size, 5);
        assert_eq!(entries[1].compression_method, "Stored");
    }

    #[test]
    fn test_compressed_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        for (name, format) in [
            ("a.tar", ArchiveFormat::Tar),
            ("a.tar.gz", ArchiveFormat::TarGz),
            ("a.tar.bz2", ArchiveFormat::TarBz2),
            ("a.tar.xz", ArchiveFormat::TarXz),
            ("a.tar.zst", ArchiveFormat::TarZst),
        ] {
            let path = temp.path().join(name);
            write_archive(&path, format, &[("src/", b""), ("src/main.rs", b"fn main() {}")]);

            let mut reader = TarReader::open(&path, format).unwrap();
            let entries = reader.entries().unwrap();
            assert_eq!(entries.len(), 2, "{format}");
            assert_eq!(entries[1].attributes, Some(0o600), "{format}");

            let mut body = String::new();
            reader
                .visit(&mut |entry, stream| {
                    if !entry.is_directory {
                        stream?.read_to_string(&mut body)?;
                    }
                    Ok(Visit::Continue)
                })
                .unwrap();
            assert_eq!(body, "fn main() {}", "{format}");
        }
    }

    #[test]
    fn test_metadata_of_compressed_tar_is_solid() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("m.tar.gz");
        write_archive(&path, ArchiveFormat::TarGz, &[("x", &[7u8; 4096])]);

        let mut reader = TarReader::open(&path, ArchiveFormat::TarGz).unwrap();
        let metadata = reader.metadata().unwrap();
        assert!(metadata.is_solid);
        assert_eq!(metadata.total_size, 4096);
        assert_eq!(
            metadata.total_compressed_size,
            std::fs::metadata(&path).unwrap().len()
        );
    }

    #[test]
    fn test_short_source_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let options = WriterOptions::default();
        let mut writer =
            TarArchiveWriter::new(File::create(temp.path().join("s.tar")).unwrap(), ArchiveFormat::Tar, &options)
                .unwrap();
        let result = writer.add_file(&EntryHeader::new("s", 10), &mut &b"short"[..]);
        assert!(matches!(result, Err(ArchiveError::InvalidArchive(_))));
    }

    #[test]
    fn test_links_are_listed_and_rewritten() {
        let temp = tempfile::tempdir().unwrap();
        let source = write_fixture(
            temp.path(),
            "links.tar",
            &create_test_tar(&[("a.txt", b"alpha"), ("latest -> a.txt", b"")]),
        );

        let entries = TarReader::open(&source, ArchiveFormat::Tar).unwrap().entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].path, "latest");
        assert_eq!(entries[1].size, 0);
        assert_eq!(entries[1].link, Some(EntryLink::Symbolic("a.txt".into())));

        let copy = temp.path().join("copy.tar.gz");
        let mut writer: Box<dyn ArchiveWriter> = Box::new(
            TarArchiveWriter::new(File::create(&copy).unwrap(), ArchiveFormat::TarGz, &WriterOptions::default())
                .unwrap(),
        );
        writer
            .add_link(&EntryHeader::from_entry(&entries[1]))
            .unwrap();
        writer
            .add_link(&EntryHeader::new("again", 0).with_link(Some(EntryLink::Hard("a.txt".into()))))
            .unwrap();
        writer.finish().unwrap();

        let rewritten = TarReader::open(&copy, ArchiveFormat::TarGz).unwrap().entries().unwrap();
        let links: Vec<_> = rewritten.iter().map(|e| (e.path.as_str(), e.link.clone())).collect();
        assert_eq!(
            links,
            [
                ("latest", Some(EntryLink::Symbolic("a.txt".into()))),
                ("again", Some(EntryLink::Hard("a.txt".into()))),
            ]
        );
    }

    #[test]
    fn test_link_without_target_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let mut writer = TarArchiveWriter::new(
            File::create(temp.path().join("l.tar")).unwrap(),
            ArchiveFormat::Tar,
            &WriterOptions::default(),
        )
        .unwrap();
        assert!(matches!(
            writer.add_link(&EntryHeader::new("dangling", 0)),
            Err(ArchiveError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_fixture(temp.path(), "bad.tar.gz", b"this is not gzip data at all");
        assert!(matches!(
            TarReader::open(&path, ArchiveFormat::TarGz),
            Err(ArchiveError::InvalidArchive(_))
        ));
    }
}
