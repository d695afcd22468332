//! Bloom filter I/O.
//!
//! Locates and reads the serialized filter for a column chunk: the thrift
//! header followed by `num_bytes` of raw filter blocks. The block bit
//! layout is opaque to this crate; the raw bytes are handed across the
//! boundary for an external split-block filter implementation to consume.

use bytes::Bytes;
use quarry_error::{QuarryError, Result};
use quarry_io::FileSource;

use crate::cursor::Cursor;
use crate::format;

/// Bytes to fetch for the header before its exact size is known. Refined
/// to the decoded size once the header has been parsed.
const HEADER_SIZE_ESTIMATE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomFilterAlgorithm {
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomFilterHash {
    XxHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomFilterCompression {
    Uncompressed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilterHeader {
    pub num_bytes: i32,
    pub algorithm: BloomFilterAlgorithm,
    pub hash: BloomFilterHash,
    pub compression: BloomFilterCompression,
}

/// Decoded filter header plus the raw filter block bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomFilterBlocks {
    pub header: BloomFilterHeader,
    pub data: Bytes,
}

/// Read the bloom filter stored at `offset` (a column chunk's declared
/// `bloom_filter_offset`).
pub async fn read_bloom_filter<S: FileSource>(
    source: &mut S,
    offset: usize,
) -> Result<BloomFilterBlocks> {
    let size = source.size().await?;
    if offset >= size {
        return Err(QuarryError::new(format!(
            "Bloom filter offset {offset} beyond end of source, size: {size}"
        )));
    }

    let estimate = HEADER_SIZE_ESTIMATE.min(size - offset);
    let header_buf = source.read_range(offset, estimate).await?;

    let mut cursor = Cursor::new(&header_buf);
    let header = format::decode_bloom_filter_header(&mut cursor)?;
    let header_len = cursor.offset();

    let num_bytes = usize::try_from(header.num_bytes).map_err(|_| {
        QuarryError::new(format!(
            "Invalid bloom filter length: {}",
            header.num_bytes
        ))
    })?;

    let data = source.read_range(offset + header_len, num_bytes).await?;

    Ok(BloomFilterBlocks { header, data })
}
