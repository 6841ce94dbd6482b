//! 7z reader and writer on top of `sevenz-rust2`.
//!
//! The header is parsed once at open time for listings. Visiting decodes
//! the archive through the crate's callback API; entries without a data
//! stream (directories and empty files) are delivered after the entries
//! that carry data.
//!
//! Unix permissions travel in the high 16 bits of the Windows attribute
//! word, flagged with `FILE_ATTRIBUTE_UNIX_EXTENSION`, as 7-Zip does.
//! Packed sizes are recorded per block, so only the first file of each
//! block reports a compressed size.

use crate::ArchiveError;
use crate::Result;
use crate::formats::ArchiveFormat;
use crate::formats::traits::ArchiveReader;
use crate::formats::traits::ArchiveWriter;
use crate::formats::traits::EntryHeader;
use crate::formats::traits::EntryVisitor;
use crate::formats::traits::Visit;
use crate::formats::traits::WriterOptions;
use crate::types::ArchiveEntry;
use crate::types::ArchiveMetadata;
use crate::types::normalize_entry_path;
use sevenz_rust2::Archive;
use sevenz_rust2::Block;
use sevenz_rust2::EncoderConfiguration;
use sevenz_rust2::EncoderMethod;
use sevenz_rust2::NtTime;
use sevenz_rust2::Password;
use sevenz_rust2::encoder_options::AesEncoderOptions;
use sevenz_rust2::encoder_options::Lzma2Options;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::{self};
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;

const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x10;
const FILE_ATTRIBUTE_ARCHIVE: u32 = 0x20;
const FILE_ATTRIBUTE_UNIX_EXTENSION: u32 = 0x8000;
const S_IFREG: u32 = 0o100_000;
const S_IFDIR: u32 = 0o040_000;

fn password_of(password: Option<&str>) -> Password {
    password.map_or_else(Password::empty, Password::from)
}

/// Reader over a 7z archive file.
pub struct SevenZipReader {
    path: PathBuf,
    file: File,
    password: Option<String>,
    is_solid: bool,
    listing: Vec<ArchiveEntry>,
}

impl SevenZipReader {
    /// Opens the archive and parses its header.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::PasswordRequired`] for header-encrypted archives
    ///   opened without a password
    /// - [`ArchiveError::InvalidPassword`] if the header does not decrypt
    /// - [`ArchiveError::InvalidArchive`] for anything that is not 7z
    pub fn open(path: &Path, password: Option<&str>) -> Result<Self> {
        let file = File::open(path)?;
        let mut source = BufReader::new(file.try_clone()?);
        let archive = Archive::read(&mut source, &password_of(password))?;
        debug!(
            path = %path.display(),
            entries = archive.files.len(),
            solid = archive.is_solid,
            "opened 7z archive"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            password: password.map(str::to_string),
            is_solid: archive.is_solid,
            listing: listing(&archive),
        })
    }
}

fn listing(archive: &Archive) -> Vec<ArchiveEntry> {
    archive
        .files
        .iter()
        .enumerate()
        .map(|(index, file)| {
            let block = archive
                .stream_map
                .file_block_index
                .get(index)
                .copied()
                .flatten()
                .and_then(|b| archive.blocks.get(b));
            entry_from_7z(file, block)
        })
        .collect()
}

fn is_aes(id: &[u8]) -> bool {
    id == EncoderMethod::ID_AES256_SHA256
}

fn entry_from_7z(entry: &sevenz_rust2::ArchiveEntry, block: Option<&Block>) -> ArchiveEntry {
    let mut info = ArchiveEntry::new(&entry.name, entry.is_directory());
    if !info.is_directory {
        info.size = entry.size;
        info.compressed_size = entry.compressed_size;
    }
    if entry.has_crc {
        info.crc32 = u32::try_from(entry.crc).unwrap_or_default();
    }
    if entry.has_last_modified_date {
        info.modified = Some(SystemTime::from(entry.last_modified_date));
    }
    if entry.has_windows_attributes && entry.windows_attributes & FILE_ATTRIBUTE_UNIX_EXTENSION != 0 {
        info.attributes = Some(entry.windows_attributes >> 16);
    }

    match block {
        Some(block) => {
            let mut ids = block.coders.iter().map(sevenz_rust2::Coder::encoder_method_id);
            info.is_encrypted = ids.clone().any(is_aes);
            info.compression_method = ids
                .find(|id| !is_aes(id))
                .and_then(EncoderMethod::by_id)
                .map_or_else(|| "Unknown".to_string(), |method| method.name().to_string());
        }
        None => info.compression_method = "Stored".to_string(),
    }
    info
}

impl ArchiveReader for SevenZipReader {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::SevenZip
    }

    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        Ok(self.listing.clone())
    }

    fn visit(&mut self, visitor: &mut EntryVisitor<'_>) -> Result<()> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(0))?;
        let source = BufReader::new(file);

        // The callback API joins entry names onto a directory it creates
        // if missing; hand it the archive's own directory, which exists.
        let anchor = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        // The callback does not say which header record it is decoding.
        let by_path: HashMap<&str, &ArchiveEntry> =
            self.listing.iter().map(|e| (e.path.as_str(), e)).collect();

        let mut failure: Option<ArchiveError> = None;
        let outcome = sevenz_rust2::decompress_with_extract_fn_and_password(
            source,
            &anchor,
            password_of(self.password.as_deref()),
            |entry: &sevenz_rust2::ArchiveEntry,
             reader: &mut dyn Read,
             _dest: &PathBuf|
             -> std::result::Result<bool, sevenz_rust2::Error> {
                let info = by_path
                    .get(normalize_entry_path(&entry.name).as_str())
                    .map_or_else(|| entry_from_7z(entry, None), |info| (*info).clone());
                match visitor(&info, Ok(&mut *reader)) {
                    Ok(Visit::Continue) => {
                        io::copy(reader, &mut io::sink())?;
                        Ok(true)
                    }
                    Ok(Visit::Stop) => Ok(false),
                    Err(e) => {
                        failure = Some(e);
                        Err(sevenz_rust2::Error::Other("entry visit aborted".into()))
                    }
                }
            },
        );

        if let Some(err) = failure {
            return Err(err);
        }
        outcome?;
        Ok(())
    }

    fn metadata(&mut self) -> Result<ArchiveMetadata> {
        let entries = self.entries()?;
        let mut metadata =
            ArchiveMetadata::from_entries(self.path.clone(), ArchiveFormat::SevenZip, &entries);
        metadata.total_compressed_size = self.file.metadata()?.len();
        metadata.is_solid = self.is_solid;
        Ok(metadata)
    }
}

/// Writer producing a non-solid 7z archive with LZMA2.
///
/// With a password every data block and the header are AES-256
/// encrypted, so listing the archive needs the password too.
pub struct SevenZipWriter {
    writer: sevenz_rust2::ArchiveWriter<File>,
}

impl SevenZipWriter {
    /// Starts a 7z archive on `file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature header cannot be reserved.
    pub fn new(file: File, options: &WriterOptions) -> Result<Self> {
        let mut writer = sevenz_rust2::ArchiveWriter::new(file)?;
        let lzma2: EncoderConfiguration = Lzma2Options::from_level(u32::from(options.level)).into();
        let methods = match options.password.as_deref() {
            Some(password) => vec![AesEncoderOptions::new(Password::from(password)).into(), lzma2],
            None => vec![lzma2],
        };
        writer.set_content_methods(methods);
        Ok(Self { writer })
    }
}

fn set_unix_mode(entry: &mut sevenz_rust2::ArchiveEntry, mode: Option<u32>, is_directory: bool) {
    let Some(mode) = mode else {
        return;
    };
    let (dos, kind) = if is_directory {
        (FILE_ATTRIBUTE_DIRECTORY, S_IFDIR)
    } else {
        (FILE_ATTRIBUTE_ARCHIVE, S_IFREG)
    };
    entry.has_windows_attributes = true;
    entry.windows_attributes = dos | FILE_ATTRIBUTE_UNIX_EXTENSION | ((kind | (mode & 0o7777)) << 16);
}

fn set_modified(entry: &mut sevenz_rust2::ArchiveEntry, modified: Option<SystemTime>) {
    if let Some(time) = modified.and_then(|t| NtTime::try_from(t).ok()) {
        entry.has_last_modified_date = true;
        entry.last_modified_date = time;
    }
}

impl ArchiveWriter for SevenZipWriter {
    fn add_directory(&mut self, header: &EntryHeader) -> Result<()> {
        let mut entry = sevenz_rust2::ArchiveEntry::new_directory(&header.path);
        set_unix_mode(&mut entry, header.mode, true);
        set_modified(&mut entry, header.modified);
        self.writer.push_archive_entry::<&[u8]>(entry, None)?;
        Ok(())
    }

    fn add_file(&mut self, header: &EntryHeader, data: &mut dyn Read) -> Result<u64> {
        let mut entry = sevenz_rust2::ArchiveEntry::new_file(&header.path);
        set_unix_mode(&mut entry, header.mode, false);
        set_modified(&mut entry, header.modified);
        let written = self.writer.push_archive_entry(entry, Some(data))?;
        Ok(written.size)
    }

    fn add_link(&mut self, _header: &EntryHeader) -> Result<()> {
        Err(ArchiveError::UnsupportedOperation {
            format: ArchiveFormat::SevenZip,
            operation: "link entries",
        })
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let file = self.writer.finish()?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn writer(path: &Path, password: Option<&str>) -> Box<dyn ArchiveWriter> {
        let options = WriterOptions {
            level: 6,
            password: password.map(str::to_string),
            ..WriterOptions::default()
        };
        Box::new(SevenZipWriter::new(File::create(path).unwrap(), &options).unwrap())
    }

    fn build(path: &Path) {
        let mut writer = writer(path, None);
        writer
            .add_directory(&EntryHeader::new("notes", 0).with_mode(Some(0o750)))
            .unwrap();
        writer
            .add_file(
                &EntryHeader::new("notes/todo.txt", 9).with_mode(Some(0o640)),
                &mut &b"buy bread"[..],
            )
            .unwrap();
        writer
            .add_file(&EntryHeader::new("readme", 5), &mut &b"hello"[..])
            .unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn test_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a.7z");
        build(&path);

        let mut reader = SevenZipReader::open(&path, None).unwrap();
        let entries = reader.entries().unwrap();
        assert_eq!(entries.len(), 3);

        let todo = entries.iter().find(|e| e.path == "notes/todo.txt").unwrap();
        assert_eq!(todo.size, 9);
        assert_eq!(todo.attributes.map(|m| m & 0o7777), Some(0o640));

        let notes = entries.iter().find(|e| e.path == "notes").unwrap();
        assert!(notes.is_directory);

        let mut seen = Vec::new();
        reader
            .visit(&mut |entry, stream| {
                let mut data = Vec::new();
                stream?.read_to_end(&mut data)?;
                seen.push((entry.path.clone(), data));
                Ok(Visit::Continue)
            })
            .unwrap();
        assert!(seen.contains(&("notes/todo.txt".to_string(), b"buy bread".to_vec())));
        assert!(seen.contains(&("readme".to_string(), b"hello".to_vec())));
    }

    #[test]
    fn test_visitor_error_is_returned() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("b.7z");
        build(&path);

        let mut reader = SevenZipReader::open(&path, None).unwrap();
        let result = reader.visit(&mut |_, _| Err(ArchiveError::Cancelled));
        assert!(matches!(result, Err(ArchiveError::Cancelled)));
    }

    #[test]
    fn test_metadata() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("c.7z");
        build(&path);

        let mut reader = SevenZipReader::open(&path, None).unwrap();
        let metadata = reader.metadata().unwrap();
        assert_eq!(metadata.entry_count, 2);
        assert_eq!(metadata.total_size, 14);
        assert_eq!(metadata.format, ArchiveFormat::SevenZip);
    }

    #[test]
    fn test_timestamps_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("t.7z");
        let stamp = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_500_000_000);

        let mut writer = writer(&path, None);
        writer
            .add_directory(&EntryHeader::new("dir", 0).with_modified(Some(stamp)))
            .unwrap();
        writer
            .add_file(&EntryHeader::new("dir/f", 3).with_modified(Some(stamp)), &mut &b"abc"[..])
            .unwrap();
        writer
            .add_file(&EntryHeader::new("undated", 1), &mut &b"u"[..])
            .unwrap();
        writer.finish().unwrap();

        let entries = SevenZipReader::open(&path, None).unwrap().entries().unwrap();
        assert_eq!(entries[0].modified, Some(stamp));
        assert_eq!(entries[1].modified, Some(stamp));
        assert_eq!(entries[2].modified, None);
    }

    #[test]
    fn test_sizes_come_from_the_encoder() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("s.7z");
        let data = vec![b'z'; 64 * 1024];

        let mut writer = writer(&path, None);
        // The header size is advisory; the count is what was read.
        let written = writer
            .add_file(&EntryHeader::new("zeds", 1), &mut data.as_slice())
            .unwrap();
        assert_eq!(written, 64 * 1024);
        writer.finish().unwrap();

        let entries = SevenZipReader::open(&path, None).unwrap().entries().unwrap();
        assert_eq!(entries[0].size, 64 * 1024);
        assert!(entries[0].compressed_size > 0);
        assert!(entries[0].compressed_size < entries[0].size);
        assert_eq!(entries[0].compression_method, "LZMA2");
        assert_ne!(entries[0].crc32, 0);
    }

    #[test]
    fn test_encrypted_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("locked.7z");

        let mut writer = writer(&path, Some("hunter2"));
        writer
            .add_file(&EntryHeader::new("secret.txt", 6), &mut &b"secret"[..])
            .unwrap();
        writer.finish().unwrap();

        assert!(matches!(
            SevenZipReader::open(&path, None),
            Err(ArchiveError::PasswordRequired)
        ));
        assert!(matches!(
            SevenZipReader::open(&path, Some("wrong")),
            Err(ArchiveError::InvalidPassword)
        ));

        let mut reader = SevenZipReader::open(&path, Some("hunter2")).unwrap();
        let entries = reader.entries().unwrap();
        assert!(entries[0].is_encrypted);
        assert_eq!(entries[0].compression_method, "LZMA2");
        assert!(reader.metadata().unwrap().is_encrypted);

        let mut content = Vec::new();
        reader
            .visit(&mut |entry, stream| {
                assert!(entry.is_encrypted);
                stream?.read_to_end(&mut content)?;
                Ok(Visit::Continue)
            })
            .unwrap();
        assert_eq!(content, b"secret");
    }

    #[test]
    fn test_links_are_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let mut writer = writer(&temp.path().join("l.7z"), None);
        let header = EntryHeader::new("l", 0)
            .with_link(Some(crate::types::EntryLink::Symbolic("target".into())));
        assert!(matches!(
            writer.add_link(&header),
            Err(ArchiveError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_not_a_7z() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("fake.7z");
        std::fs::write(&path, b"plain text").unwrap();
        assert!(SevenZipReader::open(&path, None).is_err());
    }
}
