//! Fixture helpers for unit tests.
//!
//! # Panics
//!
//! Every helper panics on I/O errors; they are meant for tests only.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Cursor;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// Creates an in-memory ZIP archive. Paths ending in `/` become
/// directories; files are stored uncompressed with mode 0o644.
#[must_use]
pub fn create_test_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use zip::write::SimpleFileOptions;
    use zip::write::ZipWriter;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);

    for (path, data) in entries {
        if path.ends_with('/') {
            zip.add_directory(*path, options).unwrap();
        } else {
            zip.start_file(*path, options).unwrap();
            zip.write_all(data).unwrap();
        }
    }

    zip.finish().unwrap().into_inner()
}

/// Creates an in-memory TAR archive. Paths ending in `/` become
/// directories and `name -> target` becomes a symbolic link.
#[must_use]
pub fn create_test_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut ar = tar::Builder::new(Vec::new());
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        if let Some((name, target)) = path.split_once(" -> ") {
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            ar.append_link(&mut header, name, target).unwrap();
        } else if path.ends_with('/') {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
            header.set_mode(0o755);
            header.set_cksum();
            ar.append_data(&mut header, path, std::io::empty()).unwrap();
        } else {
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            ar.append_data(&mut header, path, *data).unwrap();
        }
    }
    ar.into_inner().unwrap()
}

/// Writes `data` to `dir/name` and returns the path.
pub fn write_fixture(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, data).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_zip() {
        let data = create_test_zip(&[("dir/", b""), ("dir/file.txt", b"hello")]);
        let archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn test_create_test_tar() {
        let data = create_test_tar(&[("file.txt", b"hello"), ("link -> file.txt", b"")]);
        assert_eq!(data.len() % 512, 0);

        let mut archive = tar::Archive::new(Cursor::new(data));
        let kinds: Vec<_> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().header().entry_type())
            .collect();
        assert_eq!(kinds, [tar::EntryType::Regular, tar::EntryType::Symlink]);
    }
}
