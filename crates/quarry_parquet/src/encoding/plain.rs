//! PLAIN encoding.
//!
//! Little-endian fixed or variable width layouts per primitive type.
//! Booleans are bit-packed LSB-first, byte arrays are length-prefixed,
//! fixed-length byte arrays are raw bytes of exactly the declared length.

use quarry_error::{QuarryError, Result};

use crate::cursor::Cursor;
use crate::types::{ParquetFixedWidthType, PhysicalType};
use crate::value::Value;

pub fn encode(physical_type: PhysicalType, values: &[Value]) -> Result<Vec<u8>> {
    match physical_type {
        PhysicalType::Boolean => encode_boolean(values),
        PhysicalType::Int32 => encode_fixed::<i32>(values, |v| match v {
            Value::Int32(i) => Ok(*i),
            other => Err(wrong_type("INT32", other)),
        }),
        PhysicalType::Int64 => encode_fixed::<i64>(values, |v| match v {
            Value::Int64(i) => Ok(*i),
            other => Err(wrong_type("INT64", other)),
        }),
        PhysicalType::Int96 => encode_int96(values),
        PhysicalType::Float => encode_fixed::<f32>(values, |v| match v {
            Value::Float(f) => Ok(*f),
            other => Err(wrong_type("FLOAT", other)),
        }),
        PhysicalType::Double => encode_fixed::<f64>(values, |v| match v {
            Value::Double(f) => Ok(*f),
            other => Err(wrong_type("DOUBLE", other)),
        }),
        PhysicalType::ByteArray => encode_byte_array(values),
        PhysicalType::FixedLenByteArray(len) => encode_fixed_len_byte_array(values, len),
    }
}

pub fn decode(physical_type: PhysicalType, cursor: &mut Cursor, count: usize) -> Result<Vec<Value>> {
    match physical_type {
        PhysicalType::Boolean => decode_boolean(cursor, count),
        PhysicalType::Int32 => decode_fixed::<i32>(cursor, count, Value::Int32),
        PhysicalType::Int64 => decode_fixed::<i64>(cursor, count, Value::Int64),
        PhysicalType::Int96 => decode_int96(cursor, count),
        PhysicalType::Float => decode_fixed::<f32>(cursor, count, Value::Float),
        PhysicalType::Double => decode_fixed::<f64>(cursor, count, Value::Double),
        PhysicalType::ByteArray => decode_byte_array(cursor, count),
        PhysicalType::FixedLenByteArray(len) => decode_fixed_len_byte_array(cursor, count, len),
    }
}

fn wrong_type(expected: &str, value: &Value) -> QuarryError {
    QuarryError::new(format!(
        "Cannot PLAIN encode {} value as {expected}",
        value.type_name()
    ))
}

fn encode_boolean(values: &[Value]) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; values.len().div_ceil(8)];
    for (idx, value) in values.iter().enumerate() {
        match value {
            Value::Boolean(true) => buf[idx / 8] |= 1 << (idx % 8),
            Value::Boolean(false) => {}
            other => return Err(wrong_type("BOOLEAN", other)),
        }
    }
    Ok(buf)
}

fn decode_boolean(cursor: &mut Cursor, count: usize) -> Result<Vec<Value>> {
    let bytes = cursor.read_slice(count.div_ceil(8))?;
    let values = (0..count)
        .map(|idx| Value::Boolean(bytes[idx / 8] & (1 << (idx % 8)) != 0))
        .collect();
    Ok(values)
}

fn encode_fixed<T: ParquetFixedWidthType>(
    values: &[Value],
    extract: impl Fn(&Value) -> Result<T>,
) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(values.len() * std::mem::size_of::<T>());
    for value in values {
        buf.extend_from_slice(extract(value)?.to_le_bytes().as_ref());
    }
    Ok(buf)
}

fn decode_fixed<T: ParquetFixedWidthType>(
    cursor: &mut Cursor,
    count: usize,
    wrap: impl Fn(T) -> Value,
) -> Result<Vec<Value>> {
    let width = std::mem::size_of::<T>();
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let bytes = cursor.read_slice(width)?;
        values.push(wrap(T::from_le_bytes(bytes.try_into()?)));
    }
    Ok(values)
}

/// INT96 stores a two's-complement 64-bit low part plus a 32-bit high part
/// that mirrors the sign. Precision beyond 64 bits is truncated.
fn encode_int96(values: &[Value]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(values.len() * 12);
    for value in values {
        let v = match value {
            Value::Int96(v) => *v,
            Value::Int64(v) => *v,
            other => return Err(wrong_type("INT96", other)),
        };
        buf.extend_from_slice(&v.to_le_bytes());
        let high: u32 = if v < 0 { 0xFFFF_FFFF } else { 0 };
        buf.extend_from_slice(&high.to_le_bytes());
    }
    Ok(buf)
}

fn decode_int96(cursor: &mut Cursor, count: usize) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let bytes = cursor.read_slice(12)?;
        let low = i64::from_le_bytes(bytes[0..8].try_into()?);
        values.push(Value::Int96(low));
    }
    Ok(values)
}

fn encode_byte_array(values: &[Value]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for value in values {
        let bytes = match value {
            Value::Bytes(b) => b.as_slice(),
            other => return Err(wrong_type("BYTE_ARRAY", other)),
        };
        buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(bytes);
    }
    Ok(buf)
}

fn decode_byte_array(cursor: &mut Cursor, count: usize) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let len = cursor.read_u32_le()? as usize;
        values.push(Value::Bytes(cursor.read_slice(len)?.to_vec()));
    }
    Ok(values)
}

fn encode_fixed_len_byte_array(values: &[Value], type_length: usize) -> Result<Vec<u8>> {
    if type_length == 0 {
        return Err(QuarryError::new(
            "Missing type length for FIXED_LEN_BYTE_ARRAY",
        ));
    }

    let mut buf = Vec::with_capacity(values.len() * type_length);
    for value in values {
        let bytes = match value {
            Value::Bytes(b) => b.as_slice(),
            other => return Err(wrong_type("FIXED_LEN_BYTE_ARRAY", other)),
        };
        if bytes.len() != type_length {
            return Err(QuarryError::new(format!(
                "Invalid value for FIXED_LEN_BYTE_ARRAY, expected {type_length} bytes, got {}",
                bytes.len()
            )));
        }
        buf.extend_from_slice(bytes);
    }
    Ok(buf)
}

fn decode_fixed_len_byte_array(
    cursor: &mut Cursor,
    count: usize,
    type_length: usize,
) -> Result<Vec<Value>> {
    if type_length == 0 {
        return Err(QuarryError::new(
            "Missing type length for FIXED_LEN_BYTE_ARRAY",
        ));
    }

    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(Value::Bytes(cursor.read_slice(type_length)?.to_vec()));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(physical_type: PhysicalType, values: Vec<Value>) {
        let buf = encode(physical_type, &values).unwrap();
        let mut cursor = Cursor::new(&buf);
        let decoded = decode(physical_type, &mut cursor, values.len()).unwrap();
        assert_eq!(values, decoded);
        assert_eq!(buf.len(), cursor.offset(), "cursor must consume all bytes");
    }

    #[test]
    fn boolean_round_trip() {
        round_trip(
            PhysicalType::Boolean,
            [true, false, false, true, true, false, true, true, false]
                .map(Value::Boolean)
                .to_vec(),
        );
    }

    #[test]
    fn boolean_pads_to_byte_boundary() {
        let buf = encode(
            PhysicalType::Boolean,
            &[Value::Boolean(true), Value::Boolean(true), Value::Boolean(true)],
        )
        .unwrap();
        assert_eq!(vec![0b0000_0111], buf);
    }

    #[test]
    fn int32_round_trip() {
        round_trip(
            PhysicalType::Int32,
            [-1, 0, 1, i32::MIN, i32::MAX].map(Value::Int32).to_vec(),
        );
    }

    #[test]
    fn int64_round_trip() {
        round_trip(
            PhysicalType::Int64,
            [-1, 0, 1, i64::MIN, i64::MAX].map(Value::Int64).to_vec(),
        );
    }

    #[test]
    fn int96_layout_sign_extends_high_word() {
        let buf = encode(PhysicalType::Int96, &[Value::Int96(-2)]).unwrap();
        assert_eq!(12, buf.len());
        assert_eq!(&[0xFF, 0xFF, 0xFF, 0xFF], &buf[8..12]);

        let buf = encode(PhysicalType::Int96, &[Value::Int96(2)]).unwrap();
        assert_eq!(&[0, 0, 0, 0], &buf[8..12]);
    }

    #[test]
    fn int96_round_trip() {
        round_trip(
            PhysicalType::Int96,
            [-123456789, 0, 987654321].map(Value::Int96).to_vec(),
        );
    }

    #[test]
    fn float_double_round_trip() {
        round_trip(
            PhysicalType::Float,
            [0.0f32, -1.5, f32::MAX].map(Value::Float).to_vec(),
        );
        round_trip(
            PhysicalType::Double,
            [0.0f64, -1.5, f64::MIN].map(Value::Double).to_vec(),
        );
    }

    #[test]
    fn byte_array_round_trip() {
        round_trip(
            PhysicalType::ByteArray,
            vec![
                Value::Bytes(b"one".to_vec()),
                Value::Bytes(Vec::new()),
                Value::Bytes(b"three".to_vec()),
            ],
        );
    }

    #[test]
    fn fixed_len_byte_array_round_trip() {
        round_trip(
            PhysicalType::FixedLenByteArray(4),
            vec![
                Value::Bytes(b"abcd".to_vec()),
                Value::Bytes(b"wxyz".to_vec()),
            ],
        );
    }

    #[test]
    fn fixed_len_byte_array_length_mismatch_errors() {
        let err = encode(
            PhysicalType::FixedLenByteArray(4),
            &[Value::Bytes(b"abc".to_vec())],
        )
        .unwrap_err();
        assert!(
            err.to_string().contains("FIXED_LEN_BYTE_ARRAY"),
            "{err}"
        );
    }

    #[test]
    fn type_mismatch_errors() {
        encode(PhysicalType::Int32, &[Value::Boolean(true)]).unwrap_err();
    }
}
