//! Static table of archive format metadata.
//!
//! The table is a process-wide `static` built at compile time. Lookups are
//! pure functions over it and never fail for a known variant.

use std::fmt;

/// Archive container formats known to the engine.
///
/// Compound tar containers (`TarGz`, `TarBz2`, ...) are separate variants so
/// that a path like `backup.tar.gz` resolves to a single format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// ZIP archive.
    Zip,
    /// 7-Zip archive.
    SevenZip,
    /// Uncompressed tar archive.
    Tar,
    /// Gzip-compressed tar archive.
    TarGz,
    /// Bzip2-compressed tar archive.
    TarBz2,
    /// XZ-compressed tar archive.
    TarXz,
    /// Zstd-compressed tar archive.
    TarZst,
    /// Single gzip stream.
    GZip,
    /// Single bzip2 stream.
    BZip2,
    /// Single LZMA-alone stream.
    Lzma,
    /// Single XZ stream.
    Xz,
    /// Single Zstandard stream.
    Zstd,
    /// LZ4 frame.
    Lz4,
    /// LHA/LZH archive.
    Lzh,
    /// RAR archive.
    Rar,
    /// Microsoft cabinet.
    Cab,
    /// ISO-9660 image.
    Iso,
    /// ARJ archive.
    Arj,
    /// cpio archive.
    Cpio,
    /// Unix compress (`.Z`).
    Z,
    /// Format could not be determined.
    Unknown,
}

impl ArchiveFormat {
    /// Returns the registry entry for this format.
    ///
    /// `Unknown` has no entry.
    #[must_use]
    pub fn info(self) -> Option<&'static FormatInfo> {
        format_info(self)
    }

    /// Returns the capabilities of this format, or none for `Unknown`.
    #[must_use]
    pub fn capabilities(self) -> FormatCapabilities {
        self.info()
            .map_or(FormatCapabilities::NONE, |info| info.capabilities)
    }

    /// Returns `true` for tar containers, compressed or not.
    #[must_use]
    pub const fn is_tar(self) -> bool {
        matches!(
            self,
            Self::Tar | Self::TarGz | Self::TarBz2 | Self::TarXz | Self::TarZst
        )
    }

    /// Returns `true` for single compressed streams holding one file.
    #[must_use]
    pub const fn is_single_stream(self) -> bool {
        matches!(
            self,
            Self::GZip | Self::BZip2 | Self::Lzma | Self::Xz | Self::Zstd
        )
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.info() {
            Some(info) => f.write_str(info.name),
            None => f.write_str("Unknown"),
        }
    }
}

/// Capability bitset of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormatCapabilities(u8);

impl FormatCapabilities {
    /// No capabilities.
    pub const NONE: Self = Self(0);
    /// Entries can be listed and read.
    pub const READ: Self = Self(1);
    /// Archives can be created.
    pub const WRITE: Self = Self(1 << 1);
    /// Entries can be integrity-tested.
    pub const TEST: Self = Self(1 << 2);
    /// Entries can be written encrypted.
    pub const ENCRYPT: Self = Self(1 << 3);
    /// Archives can span several volumes.
    pub const MULTI_VOLUME: Self = Self(1 << 4);

    const RWT: Self = Self::READ.union(Self::WRITE).union(Self::TEST);

    /// Combines two capability sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if every capability in `other` is present.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if entries can be read.
    #[must_use]
    pub const fn can_read(self) -> bool {
        self.contains(Self::READ)
    }

    /// Returns `true` if archives can be written.
    #[must_use]
    pub const fn can_write(self) -> bool {
        self.contains(Self::WRITE)
    }

    /// Returns `true` if entries can be tested.
    #[must_use]
    pub const fn can_test(self) -> bool {
        self.contains(Self::TEST)
    }

    /// Returns `true` if encrypted entries can be written.
    #[must_use]
    pub const fn can_encrypt(self) -> bool {
        self.contains(Self::ENCRYPT)
    }

    /// Returns `true` if multi-volume archives are supported.
    #[must_use]
    pub const fn can_multi_volume(self) -> bool {
        self.contains(Self::MULTI_VOLUME)
    }
}

/// Immutable metadata describing one archive format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    /// The format this entry describes.
    pub format: ArchiveFormat,
    /// Display name.
    pub name: &'static str,
    /// Canonical extension including the leading dot.
    pub extension: &'static str,
    /// Every recognized extension, lowercase, including the leading dot.
    pub extensions: &'static [&'static str],
    /// Supported operations.
    pub capabilities: FormatCapabilities,
    /// Human-readable description.
    pub description: &'static str,
    /// MIME type.
    pub mime_type: &'static str,
}

const fn entry(
    format: ArchiveFormat,
    name: &'static str,
    extensions: &'static [&'static str],
    capabilities: FormatCapabilities,
    description: &'static str,
    mime_type: &'static str,
) -> FormatInfo {
    FormatInfo {
        format,
        name,
        extension: extensions[0],
        extensions,
        capabilities,
        description,
        mime_type,
    }
}

static FORMATS: [FormatInfo; 20] = [
    entry(
        ArchiveFormat::Zip,
        "ZIP",
        &[".zip", ".zipx"],
        FormatCapabilities::RWT.union(FormatCapabilities::ENCRYPT),
        "ZIP Archive",
        "application/zip",
    ),
    entry(
        ArchiveFormat::SevenZip,
        "7-Zip",
        &[".7z"],
        FormatCapabilities::RWT.union(FormatCapabilities::ENCRYPT),
        "7-Zip Archive",
        "application/x-7z-compressed",
    ),
    entry(
        ArchiveFormat::Tar,
        "TAR",
        &[".tar"],
        FormatCapabilities::RWT,
        "Tape Archive",
        "application/x-tar",
    ),
    entry(
        ArchiveFormat::TarGz,
        "TAR.GZ",
        &[".tar.gz", ".tgz"],
        FormatCapabilities::RWT,
        "Gzip-compressed Tape Archive",
        "application/gzip",
    ),
    entry(
        ArchiveFormat::TarBz2,
        "TAR.BZ2",
        &[".tar.bz2", ".tbz2", ".tbz"],
        FormatCapabilities::RWT,
        "Bzip2-compressed Tape Archive",
        "application/x-bzip2",
    ),
    entry(
        ArchiveFormat::TarXz,
        "TAR.XZ",
        &[".tar.xz", ".txz"],
        FormatCapabilities::RWT,
        "XZ-compressed Tape Archive",
        "application/x-xz",
    ),
    entry(
        ArchiveFormat::TarZst,
        "TAR.ZST",
        &[".tar.zst", ".tzst"],
        FormatCapabilities::RWT,
        "Zstandard-compressed Tape Archive",
        "application/zstd",
    ),
    entry(
        ArchiveFormat::GZip,
        "GZip",
        &[".gz"],
        FormatCapabilities::RWT,
        "GZip Compressed File",
        "application/gzip",
    ),
    entry(
        ArchiveFormat::BZip2,
        "BZip2",
        &[".bz2"],
        FormatCapabilities::RWT,
        "BZip2 Compressed File",
        "application/x-bzip2",
    ),
    entry(
        ArchiveFormat::Lzma,
        "LZMA",
        &[".lzma"],
        FormatCapabilities::RWT,
        "LZMA Compressed File",
        "application/x-lzma",
    ),
    entry(
        ArchiveFormat::Xz,
        "XZ",
        &[".xz"],
        FormatCapabilities::RWT,
        "XZ Compressed File",
        "application/x-xz",
    ),
    entry(
        ArchiveFormat::Zstd,
        "Zstandard",
        &[".zst"],
        FormatCapabilities::RWT,
        "Zstandard Compressed File",
        "application/zstd",
    ),
    entry(
        ArchiveFormat::Lz4,
        "LZ4",
        &[".lz4"],
        FormatCapabilities::NONE,
        "LZ4 Compressed File",
        "application/x-lz4",
    ),
    entry(
        ArchiveFormat::Lzh,
        "LZH",
        &[".lzh", ".lha"],
        FormatCapabilities::NONE,
        "LHA Archive",
        "application/x-lzh-compressed",
    ),
    entry(
        ArchiveFormat::Rar,
        "RAR",
        &[".rar"],
        FormatCapabilities::MULTI_VOLUME,
        "RAR Archive",
        "application/vnd.rar",
    ),
    entry(
        ArchiveFormat::Cab,
        "CAB",
        &[".cab"],
        FormatCapabilities::NONE,
        "Microsoft Cabinet",
        "application/vnd.ms-cab-compressed",
    ),
    entry(
        ArchiveFormat::Iso,
        "ISO",
        &[".iso"],
        FormatCapabilities::NONE,
        "ISO-9660 Disc Image",
        "application/x-iso9660-image",
    ),
    entry(
        ArchiveFormat::Arj,
        "ARJ",
        &[".arj"],
        FormatCapabilities::NONE,
        "ARJ Archive",
        "application/x-arj",
    ),
    entry(
        ArchiveFormat::Cpio,
        "CPIO",
        &[".cpio"],
        FormatCapabilities::NONE,
        "cpio Archive",
        "application/x-cpio",
    ),
    entry(
        ArchiveFormat::Z,
        "Z",
        &[".z"],
        FormatCapabilities::NONE,
        "Unix compress File",
        "application/x-compress",
    ),
];

/// Returns the registry entry for `format`, or `None` for `Unknown`.
///
/// # Examples
///
/// ```
/// use hammer_core::formats::ArchiveFormat;
/// use hammer_core::formats::format_info;
///
/// let info = format_info(ArchiveFormat::Zip).unwrap();
/// assert_eq!(info.extension, ".zip");
/// assert!(info.capabilities.can_encrypt());
/// assert!(format_info(ArchiveFormat::Unknown).is_none());
/// ```
#[must_use]
pub fn format_info(format: ArchiveFormat) -> Option<&'static FormatInfo> {
    FORMATS.iter().find(|info| info.format == format)
}

/// Returns every registered format in table order.
#[must_use]
pub fn supported_formats() -> &'static [FormatInfo] {
    &FORMATS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_every_known_format_has_info() {
        for info in supported_formats() {
            assert_eq!(format_info(info.format), Some(info));
        }
        assert!(format_info(ArchiveFormat::Unknown).is_none());
    }

    #[test]
    fn test_extensions_are_lowercase_with_dot() {
        for info in supported_formats() {
            assert_eq!(info.extension, info.extensions[0]);
            for ext in info.extensions {
                assert!(ext.starts_with('.'), "{ext}");
                assert_eq!(*ext, ext.to_ascii_lowercase());
            }
        }
    }

    #[test]
    fn test_extensions_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for info in supported_formats() {
            for ext in info.extensions {
                assert!(seen.insert(*ext), "duplicate extension {ext}");
            }
        }
    }

    #[test]
    fn test_capabilities() {
        let zip = ArchiveFormat::Zip.capabilities();
        assert!(zip.can_read() && zip.can_write() && zip.can_test() && zip.can_encrypt());
        assert!(!zip.can_multi_volume());

        let sevenz = ArchiveFormat::SevenZip.capabilities();
        assert!(sevenz.can_write() && sevenz.can_encrypt());
        assert!(!ArchiveFormat::TarGz.capabilities().can_encrypt());

        let rar = ArchiveFormat::Rar.capabilities();
        assert!(!rar.can_read());
        assert!(!rar.can_write());

        assert_eq!(
            ArchiveFormat::Unknown.capabilities(),
            FormatCapabilities::NONE
        );
    }

    #[test]
    fn test_union_and_contains() {
        let caps = FormatCapabilities::READ.union(FormatCapabilities::TEST);
        assert!(caps.contains(FormatCapabilities::READ));
        assert!(!caps.contains(FormatCapabilities::WRITE));
        assert!(caps.contains(FormatCapabilities::NONE));
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(ArchiveFormat::TarGz.to_string(), "TAR.GZ");
        assert_eq!(ArchiveFormat::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_classification() {
        assert!(ArchiveFormat::TarZst.is_tar());
        assert!(!ArchiveFormat::Zstd.is_tar());
        assert!(ArchiveFormat::Zstd.is_single_stream());
        assert!(!ArchiveFormat::Zip.is_single_stream());
    }
}
