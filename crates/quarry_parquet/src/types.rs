use std::array::TryFromSliceError;
use std::fmt;
use std::str::FromStr;

use quarry_error::{QuarryError, Result};

/// Physical types representable in parquet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray(usize),
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Int32 => write!(f, "INT32"),
            Self::Int64 => write!(f, "INT64"),
            Self::Int96 => write!(f, "INT96"),
            Self::Float => write!(f, "FLOAT"),
            Self::Double => write!(f, "DOUBLE"),
            Self::ByteArray => write!(f, "BYTE_ARRAY"),
            Self::FixedLenByteArray(_) => write!(f, "FIXED_LEN_BYTE_ARRAY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    Required,
    Optional,
    Repeated,
}

impl fmt::Display for Repetition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "REQUIRED"),
            Self::Optional => write!(f, "OPTIONAL"),
            Self::Repeated => write!(f, "REPEATED"),
        }
    }
}

/// Logical interpretation layered on top of a physical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertedType {
    Utf8,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Json,
}

impl fmt::Display for ConvertedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Utf8 => "UTF8",
            Self::Date => "DATE",
            Self::TimeMillis => "TIME_MILLIS",
            Self::TimeMicros => "TIME_MICROS",
            Self::TimestampMillis => "TIMESTAMP_MILLIS",
            Self::TimestampMicros => "TIMESTAMP_MICROS",
            Self::Uint8 => "UINT_8",
            Self::Uint16 => "UINT_16",
            Self::Uint32 => "UINT_32",
            Self::Uint64 => "UINT_64",
            Self::Int8 => "INT_8",
            Self::Int16 => "INT_16",
            Self::Int32 => "INT_32",
            Self::Int64 => "INT_64",
            Self::Json => "JSON",
        };
        write!(f, "{s}")
    }
}

/// A declared field type name, resolved during schema compilation into a
/// physical type plus an optional converted type.
///
/// Parsing an unrecognized name is a schema error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeName {
    pub physical_type: PhysicalType,
    pub converted_type: Option<ConvertedType>,
}

impl FromStr for TypeName {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        let (physical_type, converted_type) = match s {
            "BOOLEAN" => (PhysicalType::Boolean, None),
            "INT32" => (PhysicalType::Int32, None),
            "INT64" => (PhysicalType::Int64, None),
            "INT96" => (PhysicalType::Int96, None),
            "FLOAT" => (PhysicalType::Float, None),
            "DOUBLE" => (PhysicalType::Double, None),
            "BYTE_ARRAY" => (PhysicalType::ByteArray, None),
            "FIXED_LEN_BYTE_ARRAY" => (PhysicalType::FixedLenByteArray(0), None),
            "UTF8" | "ENUM" => (PhysicalType::ByteArray, Some(ConvertedType::Utf8)),
            "JSON" => (PhysicalType::ByteArray, Some(ConvertedType::Json)),
            "DATE" => (PhysicalType::Int32, Some(ConvertedType::Date)),
            "TIME_MILLIS" => (PhysicalType::Int32, Some(ConvertedType::TimeMillis)),
            "TIME_MICROS" => (PhysicalType::Int64, Some(ConvertedType::TimeMicros)),
            "TIMESTAMP_MILLIS" => (PhysicalType::Int64, Some(ConvertedType::TimestampMillis)),
            "TIMESTAMP_MICROS" => (PhysicalType::Int64, Some(ConvertedType::TimestampMicros)),
            "UINT_8" => (PhysicalType::Int32, Some(ConvertedType::Uint8)),
            "UINT_16" => (PhysicalType::Int32, Some(ConvertedType::Uint16)),
            "UINT_32" => (PhysicalType::Int32, Some(ConvertedType::Uint32)),
            "UINT_64" => (PhysicalType::Int64, Some(ConvertedType::Uint64)),
            "INT_8" => (PhysicalType::Int32, Some(ConvertedType::Int8)),
            "INT_16" => (PhysicalType::Int32, Some(ConvertedType::Int16)),
            "INT_32" => (PhysicalType::Int32, Some(ConvertedType::Int32)),
            "INT_64" => (PhysicalType::Int64, Some(ConvertedType::Int64)),
            other => return Err(QuarryError::new(format!("Invalid parquet type: {other}"))),
        };

        Ok(TypeName {
            physical_type,
            converted_type,
        })
    }
}

/// Fixed-width primitives with a little-endian byte layout.
pub trait ParquetFixedWidthType: fmt::Debug + Send + Sync + Copy + 'static {
    const PHYSICAL_TYPE: PhysicalType;
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8], Error = TryFromSliceError>;

    /// Convert self to little endian bytes.
    fn to_le_bytes(&self) -> Self::Bytes;

    /// Convert little endian bytes to self.
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

impl ParquetFixedWidthType for i32 {
    const PHYSICAL_TYPE: PhysicalType = PhysicalType::Int32;
    type Bytes = [u8; 4];

    fn to_le_bytes(&self) -> Self::Bytes {
        i32::to_le_bytes(*self)
    }

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        i32::from_le_bytes(bytes)
    }
}

impl ParquetFixedWidthType for i64 {
    const PHYSICAL_TYPE: PhysicalType = PhysicalType::Int64;
    type Bytes = [u8; 8];

    fn to_le_bytes(&self) -> Self::Bytes {
        i64::to_le_bytes(*self)
    }

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        i64::from_le_bytes(bytes)
    }
}

impl ParquetFixedWidthType for f32 {
    const PHYSICAL_TYPE: PhysicalType = PhysicalType::Float;
    type Bytes = [u8; 4];

    fn to_le_bytes(&self) -> Self::Bytes {
        f32::to_le_bytes(*self)
    }

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        f32::from_le_bytes(bytes)
    }
}

impl ParquetFixedWidthType for f64 {
    const PHYSICAL_TYPE: PhysicalType = PhysicalType::Double;
    type Bytes = [u8; 8];

    fn to_le_bytes(&self) -> Self::Bytes {
        f64::to_le_bytes(*self)
    }

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        f64::from_le_bytes(bytes)
    }
}

/// Bit width needed to represent values in `[0, val]`.
pub fn bit_width(val: u32) -> u8 {
    (32 - (val).leading_zeros()) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_resolves_logical_types() {
        let t: TypeName = "UTF8".parse().unwrap();
        assert_eq!(PhysicalType::ByteArray, t.physical_type);
        assert_eq!(Some(ConvertedType::Utf8), t.converted_type);

        let t: TypeName = "DOUBLE".parse().unwrap();
        assert_eq!(PhysicalType::Double, t.physical_type);
        assert_eq!(None, t.converted_type);
    }

    #[test]
    fn type_name_rejects_unknown() {
        "VARCHAR".parse::<TypeName>().unwrap_err();
    }

    #[test]
    fn bit_widths() {
        assert_eq!(0, bit_width(0));
        assert_eq!(1, bit_width(1));
        assert_eq!(2, bit_width(2));
        assert_eq!(2, bit_width(3));
        assert_eq!(3, bit_width(4));
        assert_eq!(8, bit_width(255));
        assert_eq!(9, bit_width(256));
    }
}
