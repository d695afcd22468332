use indexmap::IndexMap;
use quarry_error::{QuarryError, Result};

use crate::types::{ConvertedType, PhysicalType};

/// Dynamically typed value appearing in nested records.
///
/// Leaf occurrences are converted to their physical wire representation
/// during shredding ([`to_physical`]) and back during materialization
/// ([`from_physical`]). `List` and `Record` never appear in a column
/// stream, only in records.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    /// INT96 truncated to 64 bits of precision.
    Int96(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<Value>),
    Record(IndexMap<String, Value>),
}

impl Value {
    pub fn record<K, I>(fields: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Int96(_) => "int96",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

fn type_mismatch(expected: &str, value: &Value) -> QuarryError {
    QuarryError::new(format!(
        "Expected {expected} value, got {}",
        value.type_name()
    ))
}

fn to_i64(value: &Value) -> Result<i64> {
    match value {
        Value::Int32(v) => Ok(*v as i64),
        Value::Int64(v) => Ok(*v),
        other => Err(type_mismatch("integer", other)),
    }
}

/// Convert a record-level value to its physical wire representation for a
/// leaf with the given physical/converted types.
pub fn to_physical(
    physical_type: PhysicalType,
    converted_type: Option<ConvertedType>,
    value: &Value,
) -> Result<Value> {
    match converted_type {
        None => to_physical_raw(physical_type, value),
        Some(ConvertedType::Utf8) | Some(ConvertedType::Json) => match value {
            Value::String(s) => Ok(Value::Bytes(s.as_bytes().to_vec())),
            Value::Bytes(b) => Ok(Value::Bytes(b.clone())),
            other => Err(type_mismatch("string", other)),
        },
        Some(ConvertedType::Date)
        | Some(ConvertedType::TimeMillis)
        | Some(ConvertedType::Int8)
        | Some(ConvertedType::Int16)
        | Some(ConvertedType::Int32)
        | Some(ConvertedType::Uint8)
        | Some(ConvertedType::Uint16)
        | Some(ConvertedType::Uint32) => {
            let v = to_i64(value)?;
            let v = i32::try_from(v)
                .map_err(|_| QuarryError::new(format!("Value {v} out of range for INT32")))?;
            Ok(Value::Int32(v))
        }
        Some(ConvertedType::TimeMicros)
        | Some(ConvertedType::TimestampMillis)
        | Some(ConvertedType::TimestampMicros)
        | Some(ConvertedType::Int64)
        | Some(ConvertedType::Uint64) => Ok(Value::Int64(to_i64(value)?)),
    }
}

fn to_physical_raw(physical_type: PhysicalType, value: &Value) -> Result<Value> {
    match physical_type {
        PhysicalType::Boolean => match value {
            Value::Boolean(v) => Ok(Value::Boolean(*v)),
            other => Err(type_mismatch("boolean", other)),
        },
        PhysicalType::Int32 => {
            let v = to_i64(value)?;
            let v = i32::try_from(v)
                .map_err(|_| QuarryError::new(format!("Value {v} out of range for INT32")))?;
            Ok(Value::Int32(v))
        }
        PhysicalType::Int64 => Ok(Value::Int64(to_i64(value)?)),
        PhysicalType::Int96 => match value {
            Value::Int96(v) => Ok(Value::Int96(*v)),
            other => Ok(Value::Int96(to_i64(other)?)),
        },
        PhysicalType::Float => match value {
            Value::Float(v) => Ok(Value::Float(*v)),
            other => Err(type_mismatch("float", other)),
        },
        PhysicalType::Double => match value {
            Value::Double(v) => Ok(Value::Double(*v)),
            Value::Float(v) => Ok(Value::Double(*v as f64)),
            other => Err(type_mismatch("double", other)),
        },
        PhysicalType::ByteArray | PhysicalType::FixedLenByteArray(_) => match value {
            Value::Bytes(b) => Ok(Value::Bytes(b.clone())),
            Value::String(s) => Ok(Value::Bytes(s.as_bytes().to_vec())),
            other => Err(type_mismatch("bytes", other)),
        },
    }
}

/// Reverse of [`to_physical`], converting a decoded wire value back to its
/// record-level representation.
pub fn from_physical(converted_type: Option<ConvertedType>, value: Value) -> Result<Value> {
    match converted_type {
        None => Ok(value),
        Some(ConvertedType::Utf8) | Some(ConvertedType::Json) => match value {
            Value::Bytes(b) => Ok(Value::String(String::from_utf8(b)?)),
            Value::String(s) => Ok(Value::String(s)),
            other => Err(type_mismatch("bytes", &other)),
        },
        // Remaining converted types keep their physical integer
        // representation in records.
        Some(_) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_round_trips_through_bytes() {
        let physical = to_physical(
            PhysicalType::ByteArray,
            Some(ConvertedType::Utf8),
            &Value::String("quarry".to_string()),
        )
        .unwrap();
        assert_eq!(Value::Bytes(b"quarry".to_vec()), physical);

        let back = from_physical(Some(ConvertedType::Utf8), physical).unwrap();
        assert_eq!(Value::String("quarry".to_string()), back);
    }

    #[test]
    fn date_narrows_to_int32() {
        let physical = to_physical(
            PhysicalType::Int32,
            Some(ConvertedType::Date),
            &Value::Int64(19_000),
        )
        .unwrap();
        assert_eq!(Value::Int32(19_000), physical);
    }

    #[test]
    fn int32_out_of_range_errors() {
        to_physical(PhysicalType::Int32, None, &Value::Int64(i64::MAX)).unwrap_err();
    }

    #[test]
    fn boolean_type_mismatch_errors() {
        let err = to_physical(PhysicalType::Boolean, None, &Value::Int32(1)).unwrap_err();
        assert!(err.to_string().contains("boolean"), "{err}");
    }
}
