//! Dictionary-indexed encoding.
//!
//! A single leading byte declares the index bit width, followed by an
//! envelope-free RLE/bit-packed stream of dictionary indices. Substituting
//! indices for actual values is the page pipeline's job since the
//! dictionary table is scoped to the column chunk.

use quarry_error::{QuarryError, Result};

use crate::cursor::Cursor;
use crate::encoding::rle;
use crate::types::bit_width;

/// Decode `count` dictionary indices.
pub fn decode_indices(cursor: &mut Cursor, count: usize) -> Result<Vec<u32>> {
    let width = cursor.read_u8()?;
    if width == 0 || width > 32 {
        return Err(QuarryError::new(format!(
            "Invalid dictionary index bit width: {width}"
        )));
    }
    rle::decode(cursor, count, width, true)
}

/// Encode dictionary indices for a dictionary of `dict_len` entries.
pub fn encode_indices(indices: &[u32], dict_len: usize) -> Result<Vec<u8>> {
    let max_index = dict_len.saturating_sub(1) as u32;
    let width = bit_width(max_index).max(1);

    for &idx in indices {
        if idx as usize >= dict_len {
            return Err(QuarryError::new(format!(
                "Dictionary index {idx} out of bounds for dictionary of {dict_len}"
            )));
        }
    }

    let mut buf = vec![width];
    buf.extend_from_slice(&rle::encode(indices, width, true)?);
    Ok(buf)
}
