//! RLE/bit-packing hybrid encoding.
//!
//! A stream of runs, each preceded by a ULEB128 header. Headers with the
//! low bit set introduce a bit-packed run whose value count is the header's
//! high bits times 8; each value occupies exactly `bit_width` bits, packed
//! LSB-first across the run. Headers with the low bit clear introduce a
//! repeated run; the repeat count is the header's high bits and a single
//! value follows in `ceil(bit_width / 8)` little-endian bytes.
//!
//! The enveloped mode prefixes the run sequence with a 4-byte LE total
//! length. Used for top-level RLE columns and V1 page levels; dictionary
//! indices and V2 page levels omit it.

use quarry_error::{QuarryError, Result};

use crate::cursor::Cursor;
use crate::encoding::uleb128::{decode_uleb128, encode_uleb128};

fn check_bit_width(bit_width: u8) -> Result<()> {
    if bit_width == 0 || bit_width > 32 {
        return Err(QuarryError::new(format!(
            "RLE bit width out of range [1, 32]: {bit_width}"
        )));
    }
    Ok(())
}

/// Encode values at the given bit width.
pub fn encode(values: &[u32], bit_width: u8, disable_envelope: bool) -> Result<Vec<u8>> {
    check_bit_width(bit_width)?;
    for &v in values {
        if (v as u64) >> bit_width != 0 {
            return Err(QuarryError::new(format!(
                "Value {v} does not fit in {bit_width} bits"
            )));
        }
    }

    let mut body = Vec::new();
    // Values waiting to go out as a bit-packed run.
    let mut buffered: Vec<u32> = Vec::new();
    let mut repeat_value = 0u32;
    let mut repeats: usize = 0;

    for (idx, &v) in values.iter().enumerate() {
        // A repeated run may only begin on an 8-value boundary of the
        // bit-packed buffer, otherwise the buffer would need mid-stream
        // padding that the decoder cannot distinguish from data.
        if repeats == 0
            && buffered.len() % 8 == 0
            && values.get(idx + 1) == Some(&v)
        {
            if !buffered.is_empty() {
                write_bitpacked(&mut body, &buffered, bit_width);
                buffered.clear();
            }
            repeat_value = v;
            repeats = 1;
        } else if repeats > 0 && v == repeat_value {
            repeats += 1;
        } else {
            if repeats > 0 {
                write_repeated(&mut body, repeat_value, repeats, bit_width);
                repeats = 0;
            }
            buffered.push(v);
        }
    }

    if repeats > 0 {
        write_repeated(&mut body, repeat_value, repeats, bit_width);
    } else if !buffered.is_empty() {
        // Zero-pad the tail to the next multiple of 8; the decoder
        // truncates to the requested count.
        while buffered.len() % 8 != 0 {
            buffered.push(0);
        }
        write_bitpacked(&mut body, &buffered, bit_width);
    }

    if disable_envelope {
        return Ok(body);
    }

    let mut enveloped = Vec::with_capacity(body.len() + 4);
    enveloped.extend_from_slice(&(body.len() as u32).to_le_bytes());
    enveloped.extend_from_slice(&body);
    Ok(enveloped)
}

/// Write a bit-packed run. `values` length must be a multiple of 8.
fn write_bitpacked(out: &mut Vec<u8>, values: &[u32], bit_width: u8) {
    debug_assert_eq!(0, values.len() % 8);

    let groups = values.len() / 8;
    encode_uleb128(((groups as u64) << 1) | 1, out);

    let width = bit_width as usize;
    let mut packed = vec![0u8; groups * width];
    for b in 0..width * values.len() {
        if values[b / width] & (1 << (b % width)) != 0 {
            packed[b / 8] |= 1 << (b % 8);
        }
    }
    out.extend_from_slice(&packed);
}

/// Write a repeated run: count in the header, one value in
/// `ceil(bit_width / 8)` LE bytes.
fn write_repeated(out: &mut Vec<u8>, value: u32, count: usize, bit_width: u8) {
    encode_uleb128((count as u64) << 1, out);
    let width = (bit_width as usize).div_ceil(8);
    out.extend_from_slice(&value.to_le_bytes()[..width]);
}

/// Decode exactly `count` values from the cursor.
///
/// Runs are concatenated until at least `count` values have been produced,
/// then truncated to exactly `count`. Exhausting the buffer before that is
/// an invalid RLE encoding error.
pub fn decode(
    cursor: &mut Cursor,
    count: usize,
    bit_width: u8,
    disable_envelope: bool,
) -> Result<Vec<u32>> {
    check_bit_width(bit_width)?;

    if !disable_envelope {
        let len = cursor.read_u32_le()? as usize;
        let body = cursor.read_slice(len)?;
        let mut inner = Cursor::new(body);
        return decode_runs(&mut inner, count, bit_width);
    }

    decode_runs(cursor, count, bit_width)
}

fn decode_runs(cursor: &mut Cursor, count: usize, bit_width: u8) -> Result<Vec<u32>> {
    let mut values = Vec::with_capacity(count);

    while values.len() < count {
        if cursor.remaining() == 0 {
            return Err(QuarryError::new(format!(
                "Invalid RLE encoding, expected {count} values, buffer exhausted after {}",
                values.len()
            )));
        }

        let (header, consumed) = decode_uleb128(cursor.remaining_slice())?;
        cursor.advance(consumed)?;

        if header & 1 == 1 {
            decode_bitpacked_run(cursor, (header >> 1) as usize, bit_width, &mut values)?;
        } else {
            decode_repeated_run(cursor, (header >> 1) as usize, bit_width, count, &mut values)?;
        }
    }

    values.truncate(count);
    Ok(values)
}

fn decode_bitpacked_run(
    cursor: &mut Cursor,
    groups: usize,
    bit_width: u8,
    values: &mut Vec<u32>,
) -> Result<()> {
    let width = bit_width as usize;
    let packed = cursor.read_slice(groups * width)?;

    for i in 0..groups * 8 {
        let mut v = 0u32;
        for bit in 0..width {
            let b = i * width + bit;
            if packed[b / 8] & (1 << (b % 8)) != 0 {
                v |= 1 << bit;
            }
        }
        values.push(v);
    }
    Ok(())
}

fn decode_repeated_run(
    cursor: &mut Cursor,
    run_count: usize,
    bit_width: u8,
    wanted: usize,
    values: &mut Vec<u32>,
) -> Result<()> {
    let width = (bit_width as usize).div_ceil(8);
    let bytes = cursor.read_slice(width)?;

    let mut le = [0u8; 4];
    le[..width].copy_from_slice(bytes);
    let value = u32::from_le_bytes(le);

    // Clamp so a corrupt count cannot balloon the output; anything beyond
    // `wanted` would be truncated away regardless.
    let take = run_count.min(wanted.saturating_sub(values.len()));
    values.extend(std::iter::repeat(value).take(take));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(values: &[u32], bit_width: u8) {
        for disable_envelope in [false, true] {
            let buf = encode(values, bit_width, disable_envelope).unwrap();
            let mut cursor = Cursor::new(&buf);
            let decoded = decode(&mut cursor, values.len(), bit_width, disable_envelope).unwrap();
            assert_eq!(values, decoded.as_slice(), "bit_width={bit_width}");
        }
    }

    #[test]
    fn mixed_runs_round_trip() {
        let values = [0, 1, 2, 3, 4, 5, 6, 7, 9, 9, 9, 9, 9, 9, 9, 9, 9, 3, 1, 0];
        round_trip(&values, 4);
    }

    #[test]
    fn single_value_round_trip() {
        round_trip(&[5], 3);
    }

    #[test]
    fn width_one_round_trip() {
        let values = [1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 1];
        round_trip(&values, 1);
    }

    #[test]
    fn width_32_round_trip() {
        let values = [u32::MAX, 0, 12345, u32::MAX, u32::MAX];
        round_trip(&values, 32);
    }

    #[test]
    fn long_repeated_run_round_trip() {
        let values = vec![42u32; 1000];
        round_trip(&values, 6);
    }

    #[test]
    fn repeated_run_decodes_count_copies() {
        // Header `count << 1` with a single payload byte of 5.
        let count = 13u64;
        let mut buf = Vec::new();
        encode_uleb128(count << 1, &mut buf);
        buf.push(5);

        let mut cursor = Cursor::new(&buf);
        let decoded = decode(&mut cursor, count as usize, 8, true).unwrap();
        assert_eq!(vec![5u32; count as usize], decoded);
    }

    #[test]
    fn repeated_run_value_is_multi_byte() {
        let values = vec![0x1234u32; 20];
        let buf = encode(&values, 16, true).unwrap();

        // One repeated run: header + 2-byte LE value.
        let mut expected = Vec::new();
        encode_uleb128(20 << 1, &mut expected);
        expected.extend_from_slice(&[0x34, 0x12]);
        assert_eq!(expected, buf);

        let mut cursor = Cursor::new(&buf);
        assert_eq!(values, decode(&mut cursor, 20, 16, true).unwrap());
    }

    #[test]
    fn bitpacked_tail_is_padded_and_truncated() {
        let values = [3u32, 1, 2];
        let buf = encode(&values, 2, true).unwrap();

        // One group of 8 with 5 padding values.
        let mut cursor = Cursor::new(&buf);
        let decoded = decode(&mut cursor, 3, 2, true).unwrap();
        assert_eq!(&values, decoded.as_slice());
    }

    #[test]
    fn envelope_carries_total_length() {
        let values = [1u32, 2, 3, 4, 5, 6, 7, 0];
        let buf = encode(&values, 3, false).unwrap();

        let body_len = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
        assert_eq!(buf.len() - 4, body_len);
    }

    #[test]
    fn short_buffer_is_invalid_rle() {
        let values = [1u32, 2, 3, 4, 5, 6, 7, 0];
        let buf = encode(&values, 3, true).unwrap();

        let mut cursor = Cursor::new(&buf);
        let err = decode(&mut cursor, 100, 3, true).unwrap_err();
        assert!(err.to_string().contains("Invalid RLE encoding"), "{err}");
    }

    #[test]
    fn value_too_wide_for_bit_width_errors() {
        encode(&[8], 3, true).unwrap_err();
    }

    #[test]
    fn zero_bit_width_errors() {
        encode(&[0], 0, true).unwrap_err();
        let buf = [0u8; 4];
        decode(&mut Cursor::new(&buf), 1, 0, true).unwrap_err();
    }
}
