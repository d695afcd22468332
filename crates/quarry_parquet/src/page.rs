//! Page model for column chunks.

use quarry_error::{QuarryError, Result};

use crate::encoding::Encoding;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    DataPage,
    IndexPage,
    DictionaryPage,
    DataPageV2,
}

impl PageType {
    pub fn try_from_i32(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::DataPage),
            1 => Ok(Self::IndexPage),
            2 => Ok(Self::DictionaryPage),
            3 => Ok(Self::DataPageV2),
            other => Err(QuarryError::new(format!("Invalid page type: {other}"))),
        }
    }

    pub fn to_i32(self) -> i32 {
        match self {
            Self::DataPage => 0,
            Self::IndexPage => 1,
            Self::DictionaryPage => 2,
            Self::DataPageV2 => 3,
        }
    }
}

/// Per-page statistics blobs.
///
/// Min/max are carried as raw PLAIN-encoded bytes; interpreting them is
/// out of scope for the codec core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub max: Option<Vec<u8>>,
    pub min: Option<Vec<u8>>,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub max_value: Option<Vec<u8>>,
    pub min_value: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPageHeaderV1 {
    pub num_values: i32,
    pub encoding: Encoding,
    pub definition_level_encoding: Encoding,
    pub repetition_level_encoding: Encoding,
    pub statistics: Option<Statistics>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPageHeaderV2 {
    pub num_values: i32,
    pub num_nulls: i32,
    pub num_rows: i32,
    pub encoding: Encoding,
    pub definition_levels_byte_length: i32,
    pub repetition_levels_byte_length: i32,
    pub is_compressed: Option<bool>,
    pub statistics: Option<Statistics>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub is_sorted: Option<bool>,
}

/// Decoded header of one page within a column chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub crc: Option<i32>,
    pub data_page_header: Option<DataPageHeaderV1>,
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    pub data_page_header_v2: Option<DataPageHeaderV2>,
}

/// Dictionary table scoped to one column chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DictionaryTable {
    values: Vec<Value>,
}

impl DictionaryTable {
    pub fn new(values: Vec<Value>) -> Self {
        DictionaryTable { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve a dictionary index to its value.
    pub fn lookup(&self, index: usize) -> Result<&Value> {
        self.values.get(index).ok_or_else(|| {
            QuarryError::new(format!(
                "Dictionary index {index} out of bounds for dictionary of {}",
                self.values.len()
            ))
        })
    }
}

/// Aggregate output of decoding a sequence of pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageData {
    pub rlevels: Vec<u32>,
    pub dlevels: Vec<u32>,
    pub values: Vec<Value>,
    pub page_headers: Vec<PageHeader>,
    pub count: usize,
}
