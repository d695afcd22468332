pub mod dictionary;
pub mod plain;
pub mod rle;
pub mod uleb128;

use std::fmt;
use std::str::FromStr;

use quarry_error::{not_implemented, QuarryError, Result};

use crate::cursor::Cursor;
use crate::types::PhysicalType;
use crate::value::Value;

/// Parquet value encodings.
///
/// All variants are recognized when decoding headers; only a subset is
/// implemented by the codec layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Plain,
    PlainDictionary,
    Rle,
    BitPacked,
    DeltaBinaryPacked,
    DeltaLengthByteArray,
    DeltaByteArray,
    RleDictionary,
    ByteStreamSplit,
}

impl Encoding {
    pub fn try_from_i32(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Plain),
            2 => Ok(Self::PlainDictionary),
            3 => Ok(Self::Rle),
            4 => Ok(Self::BitPacked),
            5 => Ok(Self::DeltaBinaryPacked),
            6 => Ok(Self::DeltaLengthByteArray),
            7 => Ok(Self::DeltaByteArray),
            8 => Ok(Self::RleDictionary),
            9 => Ok(Self::ByteStreamSplit),
            other => Err(QuarryError::new(format!("Invalid encoding: {other}"))),
        }
    }

    pub fn to_i32(self) -> i32 {
        match self {
            Self::Plain => 0,
            Self::PlainDictionary => 2,
            Self::Rle => 3,
            Self::BitPacked => 4,
            Self::DeltaBinaryPacked => 5,
            Self::DeltaLengthByteArray => 6,
            Self::DeltaByteArray => 7,
            Self::RleDictionary => 8,
            Self::ByteStreamSplit => 9,
        }
    }
}

impl FromStr for Encoding {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PLAIN" => Ok(Self::Plain),
            "PLAIN_DICTIONARY" => Ok(Self::PlainDictionary),
            "RLE" => Ok(Self::Rle),
            "BIT_PACKED" => Ok(Self::BitPacked),
            "DELTA_BINARY_PACKED" => Ok(Self::DeltaBinaryPacked),
            "DELTA_LENGTH_BYTE_ARRAY" => Ok(Self::DeltaLengthByteArray),
            "DELTA_BYTE_ARRAY" => Ok(Self::DeltaByteArray),
            "RLE_DICTIONARY" => Ok(Self::RleDictionary),
            "BYTE_STREAM_SPLIT" => Ok(Self::ByteStreamSplit),
            other => Err(QuarryError::new(format!(
                "Unsupported parquet encoding: {other}"
            ))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Plain => "PLAIN",
            Self::PlainDictionary => "PLAIN_DICTIONARY",
            Self::Rle => "RLE",
            Self::BitPacked => "BIT_PACKED",
            Self::DeltaBinaryPacked => "DELTA_BINARY_PACKED",
            Self::DeltaLengthByteArray => "DELTA_LENGTH_BYTE_ARRAY",
            Self::DeltaByteArray => "DELTA_BYTE_ARRAY",
            Self::RleDictionary => "RLE_DICTIONARY",
            Self::ByteStreamSplit => "BYTE_STREAM_SPLIT",
        };
        write!(f, "{s}")
    }
}

/// Options threaded through the value codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecOptions {
    /// Bit width for the RLE/bit-packed hybrid.
    pub bit_width: u8,
    /// Whether the RLE stream omits its 4-byte length envelope.
    pub disable_envelope: bool,
}

/// Encode `values` of the given physical type with `encoding`.
pub fn encode_values(
    physical_type: PhysicalType,
    encoding: Encoding,
    values: &[Value],
    opts: &CodecOptions,
) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Plain => plain::encode(physical_type, values),
        Encoding::Rle => {
            let ints = rle_input(physical_type, values)?;
            rle::encode(&ints, opts.bit_width, opts.disable_envelope)
        }
        other => not_implemented!("value encoding for encode: {other}"),
    }
}

/// Decode `count` values of the given physical type from the cursor.
///
/// Dictionary-indexed encodings yield INT32 dictionary indices; resolving
/// them against the chunk dictionary is up to the caller.
pub fn decode_values(
    physical_type: PhysicalType,
    encoding: Encoding,
    cursor: &mut Cursor,
    count: usize,
    opts: &CodecOptions,
) -> Result<Vec<Value>> {
    match encoding {
        Encoding::Plain => plain::decode(physical_type, cursor, count),
        Encoding::Rle => {
            let ints = rle::decode(cursor, count, opts.bit_width, opts.disable_envelope)?;
            Ok(rle_output(physical_type, &ints))
        }
        Encoding::PlainDictionary | Encoding::RleDictionary => {
            let indices = dictionary::decode_indices(cursor, count)?;
            Ok(indices
                .into_iter()
                .map(|idx| Value::Int32(idx as i32))
                .collect())
        }
        other => not_implemented!("value encoding for decode: {other}"),
    }
}

/// The hybrid codec packs small non-negative integers; booleans and ints
/// are the only physical types it applies to.
fn rle_input(physical_type: PhysicalType, values: &[Value]) -> Result<Vec<u32>> {
    values
        .iter()
        .map(|v| match (physical_type, v) {
            (PhysicalType::Boolean, Value::Boolean(b)) => Ok(*b as u32),
            (PhysicalType::Int32, Value::Int32(i)) if *i >= 0 => Ok(*i as u32),
            (PhysicalType::Int64, Value::Int64(i)) if *i >= 0 && *i <= u32::MAX as i64 => {
                Ok(*i as u32)
            }
            (pt, other) => Err(QuarryError::new(format!(
                "Unsupported RLE value for {pt}: {other:?}"
            ))),
        })
        .collect()
}

fn rle_output(physical_type: PhysicalType, ints: &[u32]) -> Vec<Value> {
    ints.iter()
        .map(|&i| match physical_type {
            PhysicalType::Boolean => Value::Boolean(i != 0),
            PhysicalType::Int64 => Value::Int64(i as i64),
            _ => Value::Int32(i as i32),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_name_round_trip() {
        for name in ["PLAIN", "RLE", "PLAIN_DICTIONARY", "RLE_DICTIONARY"] {
            let encoding: Encoding = name.parse().unwrap();
            assert_eq!(name, encoding.to_string());
        }
    }

    #[test]
    fn unknown_encoding_name_errors() {
        "SNAPPY".parse::<Encoding>().unwrap_err();
    }

    #[test]
    fn unknown_encoding_id_errors() {
        Encoding::try_from_i32(42).unwrap_err();
    }
}
