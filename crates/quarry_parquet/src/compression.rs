//! Compression codec passthrough.
//!
//! The codec core treats compression as a named transform over whole page
//! payloads. Unknown codec names and ids are format errors.

use std::io::{Read, Write};
use std::str::FromStr;

use quarry_error::{QuarryError, Result, ResultExt};

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_QUALITY: u32 = 1;
const BROTLI_LG_WINDOW: u32 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Uncompressed,
    Snappy,
    Gzip,
    Brotli,
}

impl Compression {
    pub fn try_from_i32(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Uncompressed),
            1 => Ok(Self::Snappy),
            2 => Ok(Self::Gzip),
            4 => Ok(Self::Brotli),
            other => Err(QuarryError::new(format!(
                "Invalid compression codec: {other}"
            ))),
        }
    }

    pub fn to_i32(self) -> i32 {
        match self {
            Self::Uncompressed => 0,
            Self::Snappy => 1,
            Self::Gzip => 2,
            Self::Brotli => 4,
        }
    }
}

impl FromStr for Compression {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "UNCOMPRESSED" => Ok(Self::Uncompressed),
            "SNAPPY" => Ok(Self::Snappy),
            "GZIP" => Ok(Self::Gzip),
            "BROTLI" => Ok(Self::Brotli),
            other => Err(QuarryError::new(format!(
                "Unsupported compression method: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uncompressed => "UNCOMPRESSED",
            Self::Snappy => "SNAPPY",
            Self::Gzip => "GZIP",
            Self::Brotli => "BROTLI",
        };
        write!(f, "{s}")
    }
}

/// Decompress `bytes` with the given method.
pub fn inflate(method: Compression, bytes: &[u8]) -> Result<Vec<u8>> {
    match method {
        Compression::Uncompressed => Ok(bytes.to_vec()),
        Compression::Gzip => {
            let mut decoder = flate2::read::GzDecoder::new(bytes);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .context("failed to inflate gzip data")?;
            Ok(out)
        }
        Compression::Snappy => snap::raw::Decoder::new()
            .decompress_vec(bytes)
            .context("failed to inflate snappy data"),
        Compression::Brotli => {
            let mut decoder = brotli::Decompressor::new(bytes, BROTLI_BUFFER_SIZE);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .context("failed to inflate brotli data")?;
            Ok(out)
        }
    }
}

/// Compress `bytes` with the given method.
pub fn deflate(method: Compression, bytes: &[u8]) -> Result<Vec<u8>> {
    match method {
        Compression::Uncompressed => Ok(bytes.to_vec()),
        Compression::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(bytes)
                .context("failed to deflate gzip data")?;
            encoder.finish().context("failed to finish gzip stream")
        }
        Compression::Snappy => snap::raw::Encoder::new()
            .compress_vec(bytes)
            .context("failed to deflate snappy data"),
        Compression::Brotli => {
            let mut out = Vec::new();
            {
                let mut encoder = brotli::CompressorWriter::new(
                    &mut out,
                    BROTLI_BUFFER_SIZE,
                    BROTLI_QUALITY,
                    BROTLI_LG_WINDOW,
                );
                encoder
                    .write_all(bytes)
                    .context("failed to deflate brotli data")?;
                encoder
                    .flush()
                    .context("failed to finish brotli stream")?;
            }
            Ok(out)
        }
    }
}
