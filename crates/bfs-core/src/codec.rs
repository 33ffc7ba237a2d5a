//! Pluggable per-entry compression codecs
//!
//! The container format never records which codec produced an archive. Any
//! [`Codec`] works as long as `decompress(compress(x)) == x`; the reader has
//! to pick the same [`Algorithm`] the writer used.

use crate::security::check_decompressed_size;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Default compression level for leveled algorithms
pub const DEFAULT_LEVEL: u32 = 3;

/// Reversible byte transform applied to each entry independently
pub trait Codec {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Compress a whole file's contents
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Reverse [`Codec::compress`]. Malformed input is an error, never a panic.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.decompress_limited(data, u64::MAX)
    }

    /// Like [`Codec::decompress`], but fails with a security error instead
    /// of producing more than `limit` bytes. Never holds more than `limit + 1`
    /// output bytes in memory.
    fn decompress_limited(&self, data: &[u8], limit: u64) -> Result<Vec<u8>>;
}

impl<C: Codec + ?Sized> Codec for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        (**self).compress(data)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        (**self).decompress(data)
    }

    fn decompress_limited(&self, data: &[u8], limit: u64) -> Result<Vec<u8>> {
        (**self).decompress_limited(data, limit)
    }
}

/// Compression algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Store files without compression
    Store,
    /// LZ4 block with a prepended size
    Lz4,
    /// Zstandard compression
    #[default]
    Zstd,
    /// Gzip compression
    Gzip,
    /// XZ compression
    Xz,
    /// Brotli compression
    Brotli,
}

impl Algorithm {
    /// Every supported algorithm, in display order
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Store,
        Algorithm::Lz4,
        Algorithm::Zstd,
        Algorithm::Gzip,
        Algorithm::Xz,
        Algorithm::Brotli,
    ];

    /// Build a codec for this algorithm. `level` is clamped to the range the
    /// backend accepts and ignored by `store` and `lz4`.
    pub fn codec(self, level: u32) -> Box<dyn Codec> {
        match self {
            Algorithm::Store => Box::new(StoreCodec),
            Algorithm::Lz4 => Box::new(Lz4Codec),
            Algorithm::Zstd => Box::new(ZstdCodec::new(level)),
            Algorithm::Gzip => Box::new(GzipCodec::new(level)),
            Algorithm::Xz => Box::new(XzCodec::new(level)),
            Algorithm::Brotli => Box::new(BrotliCodec::new(level)),
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "store" | "none" => Ok(Algorithm::Store),
            "lz4" => Ok(Algorithm::Lz4),
            "zstd" | "zst" => Ok(Algorithm::Zstd),
            "gzip" | "gz" => Ok(Algorithm::Gzip),
            "xz" => Ok(Algorithm::Xz),
            "brotli" | "br" => Ok(Algorithm::Brotli),
            other => Err(Error::Validation(format!(
                "Unknown compression algorithm: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Store => write!(f, "store"),
            Algorithm::Lz4 => write!(f, "lz4"),
            Algorithm::Zstd => write!(f, "zstd"),
            Algorithm::Gzip => write!(f, "gzip"),
            Algorithm::Xz => write!(f, "xz"),
            Algorithm::Brotli => write!(f, "brotli"),
        }
    }
}

fn compression_failed(codec: &str, err: impl std::fmt::Display) -> Error {
    Error::Compression(format!("{} compression failed: {}", codec, err))
}

fn decompression_failed(codec: &str, err: impl std::fmt::Display) -> Error {
    Error::Compression(format!("{} decompression failed: {}", codec, err))
}

/// Drain a streaming decoder, stopping one byte past `limit`
fn read_limited<R: Read>(codec: &str, reader: R, limit: u64) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| decompression_failed(codec, e))?;
    check_decompressed_size(out.len() as u64, limit)?;
    Ok(out)
}

/// Identity codec
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreCodec;

impl Codec for StoreCodec {
    fn name(&self) -> &'static str {
        "store"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress_limited(&self, data: &[u8], limit: u64) -> Result<Vec<u8>> {
        check_decompressed_size(data.len() as u64, limit)?;
        Ok(data.to_vec())
    }
}

/// LZ4 block codec; the uncompressed size is stored in the first 4 bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl Lz4Codec {
    /// Upper bound on the LZ4 block expansion ratio
    const MAX_RATIO: usize = 255;
}

impl Codec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::compress_prepend_size(data))
    }

    fn decompress_limited(&self, data: &[u8], limit: u64) -> Result<Vec<u8>> {
        // Reject impossible size prefixes before lz4_flex allocates for them
        let prefix: [u8; 4] = data
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| decompression_failed("lz4", "missing size prefix"))?;
        let declared = u32::from_le_bytes(prefix) as usize;
        let bound = (data.len() - 4)
            .saturating_mul(Self::MAX_RATIO)
            .saturating_add(16);
        if declared > bound {
            return Err(decompression_failed(
                "lz4",
                format!(
                    "declared size {} is impossible for a {} byte block",
                    declared,
                    data.len() - 4
                ),
            ));
        }
        check_decompressed_size(declared as u64, limit)?;

        lz4_flex::decompress_size_prepended(data).map_err(|e| decompression_failed("lz4", e))
    }
}

/// Zstandard codec
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.clamp(1, 22) as i32,
        }
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::encode_all(data, self.level).map_err(|e| compression_failed("zstd", e))
    }

    fn decompress_limited(&self, data: &[u8], limit: u64) -> Result<Vec<u8>> {
        let decoder =
            zstd::stream::read::Decoder::new(data).map_err(|e| decompression_failed("zstd", e))?;
        read_limited("zstd", decoder, limit)
    }
}

/// Gzip codec
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: u32,
}

impl GzipCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl Codec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = flate2::write::GzEncoder::new(
            Vec::with_capacity(data.len() / 2),
            flate2::Compression::new(self.level),
        );
        encoder
            .write_all(data)
            .map_err(|e| compression_failed("gzip", e))?;
        encoder.finish().map_err(|e| compression_failed("gzip", e))
    }

    fn decompress_limited(&self, data: &[u8], limit: u64) -> Result<Vec<u8>> {
        read_limited("gzip", flate2::read::GzDecoder::new(data), limit)
    }
}

/// XZ codec
#[derive(Debug, Clone, Copy)]
pub struct XzCodec {
    level: u32,
}

impl XzCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl Codec for XzCodec {
    fn name(&self) -> &'static str {
        "xz"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        xz2::read::XzEncoder::new(data, self.level)
            .read_to_end(&mut out)
            .map_err(|e| compression_failed("xz", e))?;
        Ok(out)
    }

    fn decompress_limited(&self, data: &[u8], limit: u64) -> Result<Vec<u8>> {
        read_limited("xz", xz2::read::XzDecoder::new(data), limit)
    }
}

/// Brotli codec
#[derive(Debug, Clone, Copy)]
pub struct BrotliCodec {
    quality: u32,
}

impl BrotliCodec {
    const BUFFER_SIZE: usize = 4096;
    const WINDOW_BITS: u32 = 22;

    pub fn new(level: u32) -> Self {
        Self {
            quality: level.min(11),
        }
    }
}

impl Codec for BrotliCodec {
    fn name(&self) -> &'static str {
        "brotli"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(
                &mut out,
                Self::BUFFER_SIZE,
                self.quality,
                Self::WINDOW_BITS,
            );
            writer
                .write_all(data)
                .map_err(|e| compression_failed("brotli", e))?;
            writer.flush().map_err(|e| compression_failed("brotli", e))?;
        }
        Ok(out)
    }

    fn decompress_limited(&self, data: &[u8], limit: u64) -> Result<Vec<u8>> {
        read_limited(
            "brotli",
            brotli::Decompressor::new(data, Self::BUFFER_SIZE),
            limit,
        )
    }
}
