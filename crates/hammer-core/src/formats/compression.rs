//! Stream codecs shared by compressed tar containers and single-stream files.
//!
//! The same codec set wraps both the tar family (`.tar.gz`, `.tar.xz`, ...)
//! and the single-file formats (`.gz`, `.xz`, ...). Encoders must be
//! finished explicitly so that trailer write errors surface as errors
//! instead of being swallowed by `Drop`.

use crate::Result;
use crate::formats::ArchiveFormat;
use std::io::Read;
use std::io::Write;
use std::io::{self};

/// Compression codec for streamed formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionCodec {
    /// Gzip (deflate).
    Gzip,
    /// Bzip2 (Burrows-Wheeler).
    Bzip2,
    /// XZ container (LZMA2).
    Xz,
    /// Legacy LZMA-alone stream.
    Lzma,
    /// Zstandard.
    Zstd,
}

impl CompressionCodec {
    /// Returns the codec wrapping `format`, or `None` for formats that are
    /// not a plain compressed stream (ZIP, 7z, uncompressed tar).
    #[must_use]
    pub const fn for_format(format: ArchiveFormat) -> Option<Self> {
        match format {
            ArchiveFormat::TarGz | ArchiveFormat::GZip => Some(Self::Gzip),
            ArchiveFormat::TarBz2 | ArchiveFormat::BZip2 => Some(Self::Bzip2),
            ArchiveFormat::TarXz | ArchiveFormat::Xz => Some(Self::Xz),
            ArchiveFormat::Lzma => Some(Self::Lzma),
            ArchiveFormat::TarZst | ArchiveFormat::Zstd => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Short label used as the entry compression-method name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gzip => "Deflate",
            Self::Bzip2 => "BZip2",
            Self::Xz => "LZMA2",
            Self::Lzma => "LZMA",
            Self::Zstd => "Zstd",
        }
    }

    /// Wraps `reader` in a streaming decoder for this codec.
    ///
    /// Gzip input may consist of several concatenated members.
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Self::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Self::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Self::Lzma => {
                let stream = xz2::stream::Stream::new_lzma_decoder(u64::MAX)?;
                Box::new(xz2::read::XzDecoder::new_stream(reader, stream))
            }
            Self::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }

    /// Wraps `writer` in a streaming encoder for this codec.
    ///
    /// `level` is the engine's 0-9 scale. `file_name` and `mtime` are only
    /// recorded by gzip, which has header fields for them.
    pub fn encoder<W: Write>(
        self,
        writer: W,
        level: u8,
        file_name: Option<&str>,
        mtime: u32,
    ) -> Result<StreamEncoder<W>> {
        Ok(match self {
            Self::Gzip => {
                let mut builder = flate2::GzBuilder::new().mtime(mtime);
                if let Some(name) = file_name {
                    builder = builder.filename(name.as_bytes());
                }
                StreamEncoder::Gzip(builder.write(writer, compression_level_to_flate2(level)))
            }
            Self::Bzip2 => StreamEncoder::Bzip2(bzip2::write::BzEncoder::new(
                writer,
                compression_level_to_bzip2(level),
            )),
            Self::Xz => StreamEncoder::Xz(xz2::write::XzEncoder::new(
                writer,
                compression_level_to_xz(level),
            )),
            Self::Lzma => {
                let options = xz2::stream::LzmaOptions::new_preset(compression_level_to_xz(level))?;
                let stream = xz2::stream::Stream::new_lzma_encoder(&options)?;
                StreamEncoder::Xz(xz2::write::XzEncoder::new_stream(writer, stream))
            }
            Self::Zstd => StreamEncoder::Zstd(zstd::stream::write::Encoder::new(
                writer,
                compression_level_to_zstd(level),
            )?),
        })
    }
}

/// Streaming encoder for one of the supported codecs.
///
/// Call [`StreamEncoder::finish`] to flush the trailer and recover the inner
/// writer.
pub enum StreamEncoder<W: Write> {
    /// No compression, used by plain tar.
    Plain(W),
    /// Gzip encoder.
    Gzip(flate2::write::GzEncoder<W>),
    /// Bzip2 encoder.
    Bzip2(bzip2::write::BzEncoder<W>),
    /// XZ or LZMA-alone encoder.
    Xz(xz2::write::XzEncoder<W>),
    /// Zstandard encoder.
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

impl<W: Write> StreamEncoder<W> {
    /// Writes the stream trailer and returns the inner writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Plain(w) => Ok(w),
            Self::Gzip(e) => e.finish(),
            Self::Bzip2(e) => e.finish(),
            Self::Xz(e) => e.finish(),
            Self::Zstd(e) => e.finish(),
        }
    }
}

impl<W: Write> Write for StreamEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(e) => e.write(buf),
            Self::Bzip2(e) => e.write(buf),
            Self::Xz(e) => e.write(buf),
            Self::Zstd(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(e) => e.flush(),
            Self::Bzip2(e) => e.flush(),
            Self::Xz(e) => e.flush(),
            Self::Zstd(e) => e.flush(),
        }
    }
}

/// Converts an engine compression level (0-9) to a flate2 level.
///
/// Level 0 stores data without compression.
#[must_use]
pub fn compression_level_to_flate2(level: u8) -> flate2::Compression {
    flate2::Compression::new(u32::from(level.min(9)))
}

/// Converts an engine compression level (0-9) to a bzip2 level.
///
/// Bzip2 has no stored mode, so level 0 maps to the fastest setting.
#[must_use]
pub fn compression_level_to_bzip2(level: u8) -> bzip2::Compression {
    match level {
        0 | 1 => bzip2::Compression::fast(),
        9.. => bzip2::Compression::best(),
        n => bzip2::Compression::new(u32::from(n)),
    }
}

/// Converts an engine compression level (0-9) to an xz preset.
#[must_use]
pub fn compression_level_to_xz(level: u8) -> u32 {
    u32::from(level.min(9))
}

/// Converts an engine compression level (0-9) to a zstd level.
///
/// # Mapping
///
/// Zstd has a wider range (1-22) than the engine scale:
///
/// - `0`, `1`: Level 1 (fastest)
/// - `2`: Level 2
/// - `3`-`6`: Level 3 (zstd default)
/// - `7`: Level 10
/// - `8`: Level 15
/// - `9`: Level 19
#[must_use]
pub fn compression_level_to_zstd(level: u8) -> i32 {
    match level {
        0 | 1 => 1,
        2 => 2,
        7 => 10,
        8 => 15,
        9.. => 19,
        _ => 3,
    }
}
