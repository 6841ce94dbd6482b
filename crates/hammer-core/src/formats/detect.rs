//! Archive format detection.

use crate::formats::ArchiveFormat;
use crate::formats::supported_formats;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 7z format magic bytes (signature).
///
/// 7z archives start with the signature: `37 7A BC AF 27 1C`
const SEVENZ_MAGIC: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

const ZIP_LOCAL_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const ZIP_EMPTY_MAGIC: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const BZIP2_MAGIC: [u8; 3] = *b"BZh";
const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
const RAR_MAGIC: [u8; 6] = *b"Rar!\x1a\x07";

/// Offset of the `ustar` marker inside a tar header block.
const USTAR_OFFSET: usize = 257;

/// Detects the archive format from the file name.
///
/// Matching is case-insensitive and the longest recognized suffix wins, so
/// `backup.tar.gz` resolves to [`ArchiveFormat::TarGz`] rather than
/// [`ArchiveFormat::GZip`]. Returns [`ArchiveFormat::Unknown`] when nothing
/// matches.
///
/// # Examples
///
/// ```
/// use hammer_core::formats::ArchiveFormat;
/// use hammer_core::formats::detect_format;
/// use std::path::Path;
///
/// assert_eq!(detect_format(Path::new("a.tar.gz")), ArchiveFormat::TarGz);
/// assert_eq!(detect_format(Path::new("a.ZIP")), ArchiveFormat::Zip);
/// assert_eq!(detect_format(Path::new("a.xyz")), ArchiveFormat::Unknown);
/// ```
#[must_use]
pub fn detect_format(path: &Path) -> ArchiveFormat {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return ArchiveFormat::Unknown;
    };
    let name = name.to_ascii_lowercase();

    let mut best: Option<(usize, ArchiveFormat)> = None;
    for info in supported_formats() {
        for ext in info.extensions {
            // a bare ".zip" file name has no stem and is not an archive name
            if name.len() > ext.len()
                && name.ends_with(ext)
                && best.is_none_or(|(len, _)| ext.len() > len)
            {
                best = Some((ext.len(), info.format));
            }
        }
    }

    best.map_or(ArchiveFormat::Unknown, |(_, format)| format)
}

/// Detects the archive format from the leading bytes of the file.
///
/// Compound tar containers cannot be told apart from single streams by
/// magic alone, so gzip data is reported as [`ArchiveFormat::GZip`] and so
/// on. Returns [`ArchiveFormat::Unknown`] if the file cannot be read or no
/// signature matches.
#[must_use]
pub fn sniff_format(path: &Path) -> ArchiveFormat {
    let mut header = [0u8; 512];
    let Ok(mut file) = File::open(path) else {
        return ArchiveFormat::Unknown;
    };

    let mut filled = 0;
    while filled < header.len() {
        match file.read(&mut header[filled..]) {
            Ok(0) | Err(_) => break,
            Ok(n) => filled += n,
        }
    }

    sniff_bytes(&header[..filled])
}

pub(crate) fn sniff_bytes(header: &[u8]) -> ArchiveFormat {
    if header.starts_with(&ZIP_LOCAL_MAGIC) || header.starts_with(&ZIP_EMPTY_MAGIC) {
        ArchiveFormat::Zip
    } else if header.starts_with(&SEVENZ_MAGIC) {
        ArchiveFormat::SevenZip
    } else if header.starts_with(&GZIP_MAGIC) {
        ArchiveFormat::GZip
    } else if header.starts_with(&BZIP2_MAGIC) {
        ArchiveFormat::BZip2
    } else if header.starts_with(&XZ_MAGIC) {
        ArchiveFormat::Xz
    } else if header.starts_with(&ZSTD_MAGIC) {
        ArchiveFormat::Zstd
    } else if header.starts_with(&RAR_MAGIC) {
        ArchiveFormat::Rar
    } else if header.len() >= USTAR_OFFSET + 5
        && &header[USTAR_OFFSET..USTAR_OFFSET + 5] == b"ustar"
    {
        ArchiveFormat::Tar
    } else {
        ArchiveFormat::Unknown
    }
}
