//! ZIP reader and writer.
//!
//! Reading goes through `zip::ZipArchive`, which needs random access, so
//! the whole handle keeps the archive file open. Encrypted members are
//! decrypted with the password given at open time; a wrong password is
//! detected eagerly on the first encrypted member.
//!
//! Timestamps are stored as DOS date/time values interpreted as UTC, with
//! the format's two second resolution. Symbolic links keep their target as
//! entry data, the way Info-ZIP stores them.

use crate::ArchiveError;
use crate::Result;
use crate::copy::into_archive_error;
use crate::formats::ArchiveFormat;
use crate::formats::traits::ArchiveReader;
use crate::formats::traits::ArchiveWriter;
use crate::formats::traits::EntryHeader;
use crate::formats::traits::EntryVisitor;
use crate::formats::traits::Visit;
use crate::formats::traits::WriterOptions;
use crate::types::ArchiveEntry;
use crate::types::ArchiveMetadata;
use crate::types::EntryLink;
use chrono::NaiveDateTime;
use chrono::Utc;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;
use zip::AesMode;
use zip::CompressionMethod;
use zip::DateTime;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::read::ZipFile;
use zip::write::SimpleFileOptions;

/// Reader over a ZIP archive file.
pub struct ZipReader {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    password: Option<String>,
}

impl ZipReader {
    /// Opens the archive and validates the password.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::InvalidArchive`] if the file is not a ZIP archive
    /// - [`ArchiveError::PasswordRequired`] if a member is encrypted and no
    ///   password was supplied
    /// - [`ArchiveError::InvalidPassword`] if the password is rejected
    pub fn open(path: &Path, password: Option<&str>) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        let first_encrypted =
            (0..archive.len()).find(|&i| archive.by_index_raw(i).is_ok_and(|f| f.encrypted()));

        if let Some(index) = first_encrypted {
            let Some(password) = password else {
                return Err(ArchiveError::PasswordRequired);
            };
            archive.by_index_decrypt(index, password.as_bytes())?;
            debug!(path = %path.display(), "zip password accepted");
        }

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            password: password.map(str::to_string),
        })
    }

    fn entry_at(&mut self, index: usize) -> Result<ArchiveEntry> {
        let file = self.archive.by_index_raw(index)?;
        let mut entry = entry_from_zip(&file);
        let plain_symlink = file.is_symlink() && !file.encrypted();
        drop(file);

        if plain_symlink {
            let mut target = String::new();
            self.archive.by_index(index)?.read_to_string(&mut target)?;
            entry.link = Some(EntryLink::Symbolic(target));
        }
        Ok(entry)
    }
}

fn entry_from_zip<R: Read + Seek>(file: &ZipFile<'_, R>) -> ArchiveEntry {
    let mut entry = ArchiveEntry::new(file.name(), file.is_dir());
    entry.size = file.size();
    entry.compressed_size = file.compressed_size();
    entry.is_encrypted = file.encrypted();
    entry.crc32 = file.crc32();
    entry.compression_method = format!("{:?}", file.compression());
    entry.modified = file.last_modified().and_then(zip_to_system_time);
    entry.attributes = file.unix_mode();
    entry.comment = file.comment().to_string();
    entry
}

impl ArchiveReader for ZipReader {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        (0..self.archive.len()).map(|i| self.entry_at(i)).collect()
    }

    fn visit(&mut self, visitor: &mut EntryVisitor<'_>) -> Result<()> {
        for index in 0..self.archive.len() {
            let entry = self.entry_at(index)?;

            let opened = if entry.is_encrypted {
                match self.password.as_deref() {
                    Some(password) => self.archive.by_index_decrypt(index, password.as_bytes()),
                    None => Err(zip::result::ZipError::UnsupportedArchive(
                        zip::result::ZipError::PASSWORD_REQUIRED,
                    )),
                }
            } else {
                self.archive.by_index(index)
            };

            let flow = match opened {
                Ok(mut file) => visitor(&entry, Ok(&mut file))?,
                Err(e) => visitor(&entry, Err(e.into()))?,
            };
            if flow == Visit::Stop {
                break;
            }
        }
        Ok(())
    }

    fn metadata(&mut self) -> Result<ArchiveMetadata> {
        let entries = self.entries()?;
        let mut metadata = ArchiveMetadata::from_entries(self.path.clone(), ArchiveFormat::Zip, &entries);
        metadata.comment = String::from_utf8_lossy(self.archive.comment()).into_owned();
        Ok(metadata)
    }
}

/// Writer producing a ZIP archive.
///
/// Level 0 stores entries, any other level deflates them. With a password
/// every file entry is AES-256 encrypted.
pub struct ZipArchiveWriter {
    zip: ZipWriter<File>,
    level: u8,
    password: Option<String>,
}

impl ZipArchiveWriter {
    /// Starts a ZIP archive on `file`.
    #[must_use]
    pub fn new(file: File, options: &WriterOptions) -> Self {
        let mut zip = ZipWriter::new(file);
        if let Some(comment) = &options.comment {
            zip.set_comment(comment.clone());
        }
        Self {
            zip,
            level: options.level,
            password: options.password.clone(),
        }
    }

    fn file_options(&self, header: &EntryHeader) -> SimpleFileOptions {
        let mut options = if self.level == 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(self.level)))
        };

        options = options.large_file(header.size >= u64::from(u32::MAX));

        if let Some(time) = header.modified.and_then(system_time_to_zip) {
            options = options.last_modified_time(time);
        }
        if let Some(mode) = header.mode {
            options = options.unix_permissions(mode);
        }
        options
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn add_directory(&mut self, header: &EntryHeader) -> Result<()> {
        let options = self.file_options(header);
        self.zip
            .add_directory(format!("{}/", header.path), options)?;
        Ok(())
    }

    fn add_file(&mut self, header: &EntryHeader, data: &mut dyn Read) -> Result<u64> {
        let options = self.file_options(header);
        match self.password.as_deref() {
            Some(password) => self.zip.start_file(
                header.path.as_str(),
                options.with_aes_encryption(AesMode::Aes256, password),
            )?,
            None => self.zip.start_file(header.path.as_str(), options)?,
        }

        std::io::copy(data, &mut self.zip).map_err(into_archive_error)
    }

    fn add_link(&mut self, header: &EntryHeader) -> Result<()> {
        match &header.link {
            Some(EntryLink::Symbolic(target)) => {
                let options = self.file_options(header);
                self.zip
                    .add_symlink(header.path.as_str(), target, options)?;
                Ok(())
            }
            Some(EntryLink::Hard(_)) => Err(ArchiveError::UnsupportedOperation {
                format: ArchiveFormat::Zip,
                operation: "hard links",
            }),
            None => Err(ArchiveError::InvalidConfig {
                reason: format!("{}: link entry without a target", header.path),
            }),
        }
    }

    fn discard_partial(&mut self) -> Result<bool> {
        self.zip.abort_file()?;
        Ok(true)
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let file = self.zip.finish()?;
        file.sync_all()?;
        Ok(())
    }
}

/// Converts a DOS timestamp (taken as UTC) to `SystemTime`.
fn zip_to_system_time(time: DateTime) -> Option<SystemTime> {
    let naive = NaiveDateTime::try_from(time).ok()?;
    Some(naive.and_utc().into())
}

/// Converts `SystemTime` to a DOS timestamp, `None` outside 1980-2107.
fn system_time_to_zip(time: SystemTime) -> Option<DateTime> {
    let utc = chrono::DateTime::<Utc>::from(time);
    DateTime::try_from(utc.naive_utc()).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_zip;
    use std::io::Write;

    use std::time::Duration;

    #[test]
    fn test_leap_day_round_trip() {
        // 2000-02-29 23:59:58 UTC
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(951_868_798);
        let dos = system_time_to_zip(time).unwrap();
        assert_eq!((dos.year(), dos.month(), dos.day()), (2000, 2, 29));
        assert_eq!((dos.hour(), dos.minute(), dos.second()), (23, 59, 58));
        assert_eq!(zip_to_system_time(dos), Some(time));
    }

    #[test]
    fn test_zip_time_round_trip() {
        // 2021-06-15 12:34:56 UTC
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_623_760_496);
        let dos = system_time_to_zip(time).unwrap();
        assert_eq!(dos.year(), 2021);
        assert_eq!(dos.month(), 6);
        assert_eq!(dos.day(), 15);
        assert_eq!(dos.hour(), 12);
        assert_eq!(dos.minute(), 34);

        let back = zip_to_system_time(dos).unwrap();
        let diff = time.duration_since(back).unwrap_or_default();
        assert!(diff <= Duration::from_secs(2));
    }

    #[test]
    fn test_time_outside_dos_range_is_dropped() {
        assert!(system_time_to_zip(SystemTime::UNIX_EPOCH).is_none());
        // 2108-01-01
        let late = SystemTime::UNIX_EPOCH + Duration::from_secs(4_354_819_200);
        assert!(system_time_to_zip(late).is_none());
    }

    #[test]
    fn test_symlink_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("l.zip");
        let mut writer: Box<dyn ArchiveWriter> =
            Box::new(ZipArchiveWriter::new(File::create(&path).unwrap(), &WriterOptions::default()));
        writer
            .add_file(&EntryHeader::new("a.txt", 5), &mut &b"alpha"[..])
            .unwrap();
        writer
            .add_link(&EntryHeader::new("latest", 0).with_link(Some(EntryLink::Symbolic("a.txt".into()))))
            .unwrap();
        assert!(matches!(
            writer.add_link(&EntryHeader::new("hard", 0).with_link(Some(EntryLink::Hard("a.txt".into())))),
            Err(ArchiveError::UnsupportedOperation { .. })
        ));
        writer.finish().unwrap();

        let entries = ZipReader::open(&path, None).unwrap().entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].link, None);
        assert_eq!(entries[1].link, Some(EntryLink::Symbolic("a.txt".into())));
    }

    #[test]
    fn test_discard_partial_drops_failed_entry() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("source vanished"))
            }
        }

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("d.zip");
        let mut writer: Box<dyn ArchiveWriter> =
            Box::new(ZipArchiveWriter::new(File::create(&path).unwrap(), &WriterOptions::default()));
        writer
            .add_file(&EntryHeader::new("kept", 4), &mut &b"kept"[..])
            .unwrap();
        assert!(writer.add_file(&EntryHeader::new("broken", 8), &mut Failing).is_err());
        assert!(writer.discard_partial().unwrap());
        writer
            .add_file(&EntryHeader::new("after", 5), &mut &b"after"[..])
            .unwrap();
        writer.finish().unwrap();

        let names: Vec<_> = ZipReader::open(&path, None)
            .unwrap()
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(names, ["kept", "after"]);
    }

    #[test]
    fn test_list_and_visit() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("t.zip");
        std::fs::write(&path, create_test_zip(&[("a.txt", b"alpha"), ("dir/b.txt", b"bravo")])).unwrap();

        let mut reader = ZipReader::open(&path, None).unwrap();
        let entries = reader.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].path, "dir/b.txt");
        assert_eq!(entries[1].size, 5);

        let mut seen = Vec::new();
        reader
            .visit(&mut |entry, stream| {
                let mut data = String::new();
                stream?.read_to_string(&mut data)?;
                seen.push((entry.path.clone(), data));
                Ok(Visit::Continue)
            })
            .unwrap();
        assert_eq!(
            seen,
            vec![
                ("a.txt".to_string(), "alpha".to_string()),
                ("dir/b.txt".to_string(), "bravo".to_string())
            ]
        );
    }

    #[test]
    fn test_visit_stop() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("t.zip");
        std::fs::write(&path, create_test_zip(&[("a", b"1"), ("b", b"2")])).unwrap();

        let mut reader = ZipReader::open(&path, None).unwrap();
        let mut count = 0;
        reader
            .visit(&mut |_, _| {
                count += 1;
                Ok(Visit::Stop)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_encrypted_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("secret.zip");

        let options = WriterOptions {
            level: 6,
            password: Some("hunter2".into()),
            ..WriterOptions::default()
        };
        let mut writer: Box<dyn ArchiveWriter> =
            Box::new(ZipArchiveWriter::new(File::create(&path).unwrap(), &options));
        writer
            .add_file(&EntryHeader::new("s.txt", 6), &mut &b"secret"[..])
            .unwrap();
        writer.finish().unwrap();

        assert!(matches!(
            ZipReader::open(&path, None),
            Err(ArchiveError::PasswordRequired)
        ));
        assert!(matches!(
            ZipReader::open(&path, Some("wrong")),
            Err(ArchiveError::InvalidPassword)
        ));

        let mut reader = ZipReader::open(&path, Some("hunter2")).unwrap();
        let entries = reader.entries().unwrap();
        assert!(entries[0].is_encrypted);

        let mut content = Vec::new();
        reader
            .visit(&mut |_, stream| {
                stream?.read_to_end(&mut content)?;
                Ok(Visit::Continue)
            })
            .unwrap();
        assert_eq!(content, b"secret");
    }

    #[test]
    fn test_writer_records_comment_and_directory() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("c.zip");
        let options = WriterOptions {
            level: 0,
            comment: Some("built by hammer".into()),
            ..WriterOptions::default()
        };

        let mut writer: Box<dyn ArchiveWriter> =
            Box::new(ZipArchiveWriter::new(File::create(&path).unwrap(), &options));
        writer.add_directory(&EntryHeader::new("docs", 0)).unwrap();
        writer
            .add_file(&EntryHeader::new("docs/readme", 3), &mut &b"hey"[..])
            .unwrap();
        writer.finish().unwrap();

        let mut reader = ZipReader::open(&path, None).unwrap();
        let metadata = reader.metadata().unwrap();
        assert_eq!(metadata.comment, "built by hammer");
        assert_eq!(metadata.entry_count, 1);

        let entries = reader.entries().unwrap();
        assert!(entries[0].is_directory);
        assert_eq!(entries[0].path, "docs");
        assert_eq!(entries[1].compression_method, "Stored");
        assert_eq!(entries[1].compressed_size, 3);
    }

    #[test]
    fn test_not_a_zip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("fake.zip");
        File::create(&path)
            .unwrap()
            .write_all(b"definitely not a zip archive")
            .unwrap();
        assert!(matches!(
            ZipReader::open(&path, None),
            Err(ArchiveError::InvalidArchive(_))
        ));
    }
}
