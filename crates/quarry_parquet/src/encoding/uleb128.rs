//! ULEB128 varint helpers.
//!
//! <https://en.wikipedia.org/wiki/LEB128#Unsigned_LEB128>
use quarry_error::{QuarryError, Result};

/// ULEB128 encode a u64, appending to `out`.
pub fn encode_uleb128(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);

        if value == 0 {
            return;
        }
    }
}

/// Decode a u64 from `buf`.
///
/// Returns (value, bytes consumed).
pub fn decode_uleb128(buf: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    let mut shift = 0;
    let mut consumed = 0;

    for &byte in buf {
        let low_bits = (byte & 0x7F) as u64;
        value |= low_bits << shift;

        consumed += 1;
        shift += 7;

        // Continuation bit unset means this was the last byte.
        if byte & 0x80 == 0 {
            return Ok((value, consumed));
        }

        if shift > 64 {
            return Err(QuarryError::new("ULEB128 value is too large"));
        }
    }

    Err(QuarryError::new("Invalid ULEB128 sequence"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_round_trip() {
        let mut buf = Vec::new();
        encode_uleb128(42, &mut buf);
        assert_eq!(vec![42], buf);

        let (v, consumed) = decode_uleb128(&buf).unwrap();
        assert_eq!(42, v);
        assert_eq!(1, consumed);
    }

    #[test]
    fn multi_byte_round_trip() {
        let mut buf = Vec::new();
        encode_uleb128(624485, &mut buf);
        assert_eq!(vec![0xE5, 0x8E, 0x26], buf);

        let (v, consumed) = decode_uleb128(&buf).unwrap();
        assert_eq!(624485, v);
        assert_eq!(3, consumed);
    }

    #[test]
    fn decode_ignores_trailing_data() {
        let buf = [0xE5, 0x8E, 0x26, 0x53, 0x21];
        let (v, consumed) = decode_uleb128(&buf).unwrap();
        assert_eq!(624485, v);
        assert_eq!(3, consumed);
    }

    #[test]
    fn truncated_sequence_errors() {
        decode_uleb128(&[0x80, 0x80]).unwrap_err();
    }
}
