//! Thrift compact-protocol (de)serialization for the header structs the
//! decode pipeline consumes.
//!
//! Only the fields the core needs are modeled; unknown fields are skipped
//! on read so headers written by other implementations stay decodable.

use quarry_error::{Result, ResultExt};
use thrift::protocol::{
    TCompactInputProtocol, TCompactOutputProtocol, TFieldIdentifier, TInputProtocol,
    TOutputProtocol, TStructIdentifier, TType,
};
use thrift::{ProtocolError, ProtocolErrorKind};

use crate::bloom::{BloomFilterAlgorithm, BloomFilterCompression, BloomFilterHash, BloomFilterHeader};
use crate::cursor::Cursor;
use crate::encoding::Encoding;
use crate::page::{
    DataPageHeaderV1, DataPageHeaderV2, DictionaryPageHeader, PageHeader, PageType, Statistics,
};

/// Reads and writes a struct to thrift protocols.
///
/// Unlike [`thrift::protocol::TSerializable`] this uses generics instead of
/// trait objects.
pub trait TSerializable: Sized {
    fn read_from_in_protocol<T: TInputProtocol>(i_prot: &mut T) -> thrift::Result<Self>;
    fn write_to_out_protocol<T: TOutputProtocol>(&self, o_prot: &mut T) -> thrift::Result<()>;
}

/// Decode one page header from the cursor, advancing it by exactly the
/// header's encoded size.
pub fn decode_page_header(cursor: &mut Cursor) -> Result<PageHeader> {
    let mut remaining = cursor.remaining_slice();
    let orig_len = remaining.len();

    let header = {
        let mut protocol = TCompactInputProtocol::new(&mut remaining);
        PageHeader::read_from_in_protocol(&mut protocol)
            .context_fn(|| format!("Failed to decode page header at offset {}", cursor.offset()))?
    };

    cursor.advance(orig_len - remaining.len())?;
    Ok(header)
}

/// Encode a page header, appending to `out`. Returns the encoded size.
pub fn encode_page_header(header: &PageHeader, out: &mut Vec<u8>) -> Result<usize> {
    let start = out.len();
    {
        let mut protocol = TCompactOutputProtocol::new(&mut *out);
        header
            .write_to_out_protocol(&mut protocol)
            .context("Failed to encode page header")?;
    }
    Ok(out.len() - start)
}

/// Decode a bloom filter header from the cursor, advancing it by exactly
/// the header's encoded size.
pub fn decode_bloom_filter_header(cursor: &mut Cursor) -> Result<BloomFilterHeader> {
    let mut remaining = cursor.remaining_slice();
    let orig_len = remaining.len();

    let header = {
        let mut protocol = TCompactInputProtocol::new(&mut remaining);
        BloomFilterHeader::read_from_in_protocol(&mut protocol)
            .context("Failed to decode bloom filter header")?
    };

    cursor.advance(orig_len - remaining.len())?;
    Ok(header)
}

/// Encode a bloom filter header, appending to `out`.
pub fn encode_bloom_filter_header(header: &BloomFilterHeader, out: &mut Vec<u8>) -> Result<usize> {
    let start = out.len();
    {
        let mut protocol = TCompactOutputProtocol::new(&mut *out);
        header
            .write_to_out_protocol(&mut protocol)
            .context("Failed to encode bloom filter header")?;
    }
    Ok(out.len() - start)
}

fn protocol_error(message: impl Into<String>) -> thrift::Error {
    thrift::Error::Protocol(ProtocolError::new(
        ProtocolErrorKind::InvalidData,
        message.into(),
    ))
}

fn required<T>(name: &'static str, value: Option<T>) -> thrift::Result<T> {
    value.ok_or_else(|| protocol_error(format!("Missing required field {name}")))
}

fn read_encoding<T: TInputProtocol>(i_prot: &mut T) -> thrift::Result<Encoding> {
    let raw = i_prot.read_i32()?;
    Encoding::try_from_i32(raw).map_err(|e| protocol_error(e.to_string()))
}

fn read_empty_struct<T: TInputProtocol>(i_prot: &mut T) -> thrift::Result<()> {
    i_prot.read_struct_begin()?;
    loop {
        let field_ident = i_prot.read_field_begin()?;
        if field_ident.field_type == TType::Stop {
            break;
        }
        i_prot.skip(field_ident.field_type)?;
        i_prot.read_field_end()?;
    }
    i_prot.read_struct_end()?;
    Ok(())
}

fn write_empty_struct<T: TOutputProtocol>(o_prot: &mut T, name: &str) -> thrift::Result<()> {
    o_prot.write_struct_begin(&TStructIdentifier::new(name))?;
    o_prot.write_field_stop()?;
    o_prot.write_struct_end()?;
    Ok(())
}

impl TSerializable for Statistics {
    fn read_from_in_protocol<T: TInputProtocol>(i_prot: &mut T) -> thrift::Result<Self> {
        let mut stats = Statistics::default();

        i_prot.read_struct_begin()?;
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_ident.id {
                Some(1) => stats.max = Some(i_prot.read_bytes()?),
                Some(2) => stats.min = Some(i_prot.read_bytes()?),
                Some(3) => stats.null_count = Some(i_prot.read_i64()?),
                Some(4) => stats.distinct_count = Some(i_prot.read_i64()?),
                Some(5) => stats.max_value = Some(i_prot.read_bytes()?),
                Some(6) => stats.min_value = Some(i_prot.read_bytes()?),
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;

        Ok(stats)
    }

    fn write_to_out_protocol<T: TOutputProtocol>(&self, o_prot: &mut T) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Statistics"))?;
        if let Some(max) = &self.max {
            o_prot.write_field_begin(&TFieldIdentifier::new("max", TType::String, 1))?;
            o_prot.write_bytes(max)?;
            o_prot.write_field_end()?;
        }
        if let Some(min) = &self.min {
            o_prot.write_field_begin(&TFieldIdentifier::new("min", TType::String, 2))?;
            o_prot.write_bytes(min)?;
            o_prot.write_field_end()?;
        }
        if let Some(null_count) = self.null_count {
            o_prot.write_field_begin(&TFieldIdentifier::new("null_count", TType::I64, 3))?;
            o_prot.write_i64(null_count)?;
            o_prot.write_field_end()?;
        }
        if let Some(distinct_count) = self.distinct_count {
            o_prot.write_field_begin(&TFieldIdentifier::new("distinct_count", TType::I64, 4))?;
            o_prot.write_i64(distinct_count)?;
            o_prot.write_field_end()?;
        }
        if let Some(max_value) = &self.max_value {
            o_prot.write_field_begin(&TFieldIdentifier::new("max_value", TType::String, 5))?;
            o_prot.write_bytes(max_value)?;
            o_prot.write_field_end()?;
        }
        if let Some(min_value) = &self.min_value {
            o_prot.write_field_begin(&TFieldIdentifier::new("min_value", TType::String, 6))?;
            o_prot.write_bytes(min_value)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()?;
        Ok(())
    }
}

impl TSerializable for DataPageHeaderV1 {
    fn read_from_in_protocol<T: TInputProtocol>(i_prot: &mut T) -> thrift::Result<Self> {
        let mut num_values: Option<i32> = None;
        let mut encoding: Option<Encoding> = None;
        let mut definition_level_encoding: Option<Encoding> = None;
        let mut repetition_level_encoding: Option<Encoding> = None;
        let mut statistics: Option<Statistics> = None;

        i_prot.read_struct_begin()?;
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_ident.id {
                Some(1) => num_values = Some(i_prot.read_i32()?),
                Some(2) => encoding = Some(read_encoding(i_prot)?),
                Some(3) => definition_level_encoding = Some(read_encoding(i_prot)?),
                Some(4) => repetition_level_encoding = Some(read_encoding(i_prot)?),
                Some(5) => statistics = Some(Statistics::read_from_in_protocol(i_prot)?),
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;

        Ok(DataPageHeaderV1 {
            num_values: required("DataPageHeader.num_values", num_values)?,
            encoding: required("DataPageHeader.encoding", encoding)?,
            definition_level_encoding: required(
                "DataPageHeader.definition_level_encoding",
                definition_level_encoding,
            )?,
            repetition_level_encoding: required(
                "DataPageHeader.repetition_level_encoding",
                repetition_level_encoding,
            )?,
            statistics,
        })
    }

    fn write_to_out_protocol<T: TOutputProtocol>(&self, o_prot: &mut T) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("DataPageHeader"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("num_values", TType::I32, 1))?;
        o_prot.write_i32(self.num_values)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("encoding", TType::I32, 2))?;
        o_prot.write_i32(self.encoding.to_i32())?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "definition_level_encoding",
            TType::I32,
            3,
        ))?;
        o_prot.write_i32(self.definition_level_encoding.to_i32())?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "repetition_level_encoding",
            TType::I32,
            4,
        ))?;
        o_prot.write_i32(self.repetition_level_encoding.to_i32())?;
        o_prot.write_field_end()?;
        if let Some(statistics) = &self.statistics {
            o_prot.write_field_begin(&TFieldIdentifier::new("statistics", TType::Struct, 5))?;
            statistics.write_to_out_protocol(o_prot)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()?;
        Ok(())
    }
}

impl TSerializable for DataPageHeaderV2 {
    fn read_from_in_protocol<T: TInputProtocol>(i_prot: &mut T) -> thrift::Result<Self> {
        let mut num_values: Option<i32> = None;
        let mut num_nulls: Option<i32> = None;
        let mut num_rows: Option<i32> = None;
        let mut encoding: Option<Encoding> = None;
        let mut definition_levels_byte_length: Option<i32> = None;
        let mut repetition_levels_byte_length: Option<i32> = None;
        let mut is_compressed: Option<bool> = None;
        let mut statistics: Option<Statistics> = None;

        i_prot.read_struct_begin()?;
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_ident.id {
                Some(1) => num_values = Some(i_prot.read_i32()?),
                Some(2) => num_nulls = Some(i_prot.read_i32()?),
                Some(3) => num_rows = Some(i_prot.read_i32()?),
                Some(4) => encoding = Some(read_encoding(i_prot)?),
                Some(5) => definition_levels_byte_length = Some(i_prot.read_i32()?),
                Some(6) => repetition_levels_byte_length = Some(i_prot.read_i32()?),
                Some(7) => is_compressed = Some(i_prot.read_bool()?),
                Some(8) => statistics = Some(Statistics::read_from_in_protocol(i_prot)?),
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;

        Ok(DataPageHeaderV2 {
            num_values: required("DataPageHeaderV2.num_values", num_values)?,
            num_nulls: required("DataPageHeaderV2.num_nulls", num_nulls)?,
            num_rows: required("DataPageHeaderV2.num_rows", num_rows)?,
            encoding: required("DataPageHeaderV2.encoding", encoding)?,
            definition_levels_byte_length: required(
                "DataPageHeaderV2.definition_levels_byte_length",
                definition_levels_byte_length,
            )?,
            repetition_levels_byte_length: required(
                "DataPageHeaderV2.repetition_levels_byte_length",
                repetition_levels_byte_length,
            )?,
            is_compressed,
            statistics,
        })
    }

    fn write_to_out_protocol<T: TOutputProtocol>(&self, o_prot: &mut T) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("DataPageHeaderV2"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("num_values", TType::I32, 1))?;
        o_prot.write_i32(self.num_values)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("num_nulls", TType::I32, 2))?;
        o_prot.write_i32(self.num_nulls)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("num_rows", TType::I32, 3))?;
        o_prot.write_i32(self.num_rows)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("encoding", TType::I32, 4))?;
        o_prot.write_i32(self.encoding.to_i32())?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "definition_levels_byte_length",
            TType::I32,
            5,
        ))?;
        o_prot.write_i32(self.definition_levels_byte_length)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "repetition_levels_byte_length",
            TType::I32,
            6,
        ))?;
        o_prot.write_i32(self.repetition_levels_byte_length)?;
        o_prot.write_field_end()?;
        if let Some(is_compressed) = self.is_compressed {
            o_prot.write_field_begin(&TFieldIdentifier::new("is_compressed", TType::Bool, 7))?;
            o_prot.write_bool(is_compressed)?;
            o_prot.write_field_end()?;
        }
        if let Some(statistics) = &self.statistics {
            o_prot.write_field_begin(&TFieldIdentifier::new("statistics", TType::Struct, 8))?;
            statistics.write_to_out_protocol(o_prot)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()?;
        Ok(())
    }
}

impl TSerializable for DictionaryPageHeader {
    fn read_from_in_protocol<T: TInputProtocol>(i_prot: &mut T) -> thrift::Result<Self> {
        let mut num_values: Option<i32> = None;
        let mut encoding: Option<Encoding> = None;
        let mut is_sorted: Option<bool> = None;

        i_prot.read_struct_begin()?;
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_ident.id {
                Some(1) => num_values = Some(i_prot.read_i32()?),
                Some(2) => encoding = Some(read_encoding(i_prot)?),
                Some(3) => is_sorted = Some(i_prot.read_bool()?),
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;

        Ok(DictionaryPageHeader {
            num_values: required("DictionaryPageHeader.num_values", num_values)?,
            encoding: required("DictionaryPageHeader.encoding", encoding)?,
            is_sorted,
        })
    }

    fn write_to_out_protocol<T: TOutputProtocol>(&self, o_prot: &mut T) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("DictionaryPageHeader"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("num_values", TType::I32, 1))?;
        o_prot.write_i32(self.num_values)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("encoding", TType::I32, 2))?;
        o_prot.write_i32(self.encoding.to_i32())?;
        o_prot.write_field_end()?;
        if let Some(is_sorted) = self.is_sorted {
            o_prot.write_field_begin(&TFieldIdentifier::new("is_sorted", TType::Bool, 3))?;
            o_prot.write_bool(is_sorted)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()?;
        Ok(())
    }
}

impl TSerializable for PageHeader {
    fn read_from_in_protocol<T: TInputProtocol>(i_prot: &mut T) -> thrift::Result<Self> {
        let mut page_type: Option<PageType> = None;
        let mut uncompressed_page_size: Option<i32> = None;
        let mut compressed_page_size: Option<i32> = None;
        let mut crc: Option<i32> = None;
        let mut data_page_header: Option<DataPageHeaderV1> = None;
        let mut dictionary_page_header: Option<DictionaryPageHeader> = None;
        let mut data_page_header_v2: Option<DataPageHeaderV2> = None;

        i_prot.read_struct_begin()?;
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_ident.id {
                Some(1) => {
                    let raw = i_prot.read_i32()?;
                    page_type = Some(
                        PageType::try_from_i32(raw).map_err(|e| protocol_error(e.to_string()))?,
                    );
                }
                Some(2) => uncompressed_page_size = Some(i_prot.read_i32()?),
                Some(3) => compressed_page_size = Some(i_prot.read_i32()?),
                Some(4) => crc = Some(i_prot.read_i32()?),
                Some(5) => {
                    data_page_header = Some(DataPageHeaderV1::read_from_in_protocol(i_prot)?)
                }
                Some(6) => {
                    // Index page header carries nothing the core needs.
                    read_empty_struct(i_prot)?;
                }
                Some(7) => {
                    dictionary_page_header =
                        Some(DictionaryPageHeader::read_from_in_protocol(i_prot)?)
                }
                Some(8) => {
                    data_page_header_v2 = Some(DataPageHeaderV2::read_from_in_protocol(i_prot)?)
                }
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;

        Ok(PageHeader {
            page_type: required("PageHeader.type", page_type)?,
            uncompressed_page_size: required(
                "PageHeader.uncompressed_page_size",
                uncompressed_page_size,
            )?,
            compressed_page_size: required(
                "PageHeader.compressed_page_size",
                compressed_page_size,
            )?,
            crc,
            data_page_header,
            dictionary_page_header,
            data_page_header_v2,
        })
    }

    fn write_to_out_protocol<T: TOutputProtocol>(&self, o_prot: &mut T) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("PageHeader"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("type", TType::I32, 1))?;
        o_prot.write_i32(self.page_type.to_i32())?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "uncompressed_page_size",
            TType::I32,
            2,
        ))?;
        o_prot.write_i32(self.uncompressed_page_size)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "compressed_page_size",
            TType::I32,
            3,
        ))?;
        o_prot.write_i32(self.compressed_page_size)?;
        o_prot.write_field_end()?;
        if let Some(crc) = self.crc {
            o_prot.write_field_begin(&TFieldIdentifier::new("crc", TType::I32, 4))?;
            o_prot.write_i32(crc)?;
            o_prot.write_field_end()?;
        }
        if let Some(header) = &self.data_page_header {
            o_prot.write_field_begin(&TFieldIdentifier::new("data_page_header", TType::Struct, 5))?;
            header.write_to_out_protocol(o_prot)?;
            o_prot.write_field_end()?;
        }
        if let Some(header) = &self.dictionary_page_header {
            o_prot.write_field_begin(&TFieldIdentifier::new(
                "dictionary_page_header",
                TType::Struct,
                7,
            ))?;
            header.write_to_out_protocol(o_prot)?;
            o_prot.write_field_end()?;
        }
        if let Some(header) = &self.data_page_header_v2 {
            o_prot.write_field_begin(&TFieldIdentifier::new(
                "data_page_header_v2",
                TType::Struct,
                8,
            ))?;
            header.write_to_out_protocol(o_prot)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()?;
        Ok(())
    }
}

impl TSerializable for BloomFilterHeader {
    fn read_from_in_protocol<T: TInputProtocol>(i_prot: &mut T) -> thrift::Result<Self> {
        let mut num_bytes: Option<i32> = None;
        let mut algorithm: Option<BloomFilterAlgorithm> = None;
        let mut hash: Option<BloomFilterHash> = None;
        let mut compression: Option<BloomFilterCompression> = None;

        i_prot.read_struct_begin()?;
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_ident.id {
                Some(1) => num_bytes = Some(i_prot.read_i32()?),
                Some(2) => {
                    read_union_choice(i_prot, "BloomFilterAlgorithm")?;
                    algorithm = Some(BloomFilterAlgorithm::Block);
                }
                Some(3) => {
                    read_union_choice(i_prot, "BloomFilterHash")?;
                    hash = Some(BloomFilterHash::XxHash);
                }
                Some(4) => {
                    read_union_choice(i_prot, "BloomFilterCompression")?;
                    compression = Some(BloomFilterCompression::Uncompressed);
                }
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;

        Ok(BloomFilterHeader {
            num_bytes: required("BloomFilterHeader.numBytes", num_bytes)?,
            algorithm: required("BloomFilterHeader.algorithm", algorithm)?,
            hash: required("BloomFilterHeader.hash", hash)?,
            compression: required("BloomFilterHeader.compression", compression)?,
        })
    }

    fn write_to_out_protocol<T: TOutputProtocol>(&self, o_prot: &mut T) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("BloomFilterHeader"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("numBytes", TType::I32, 1))?;
        o_prot.write_i32(self.num_bytes)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("algorithm", TType::Struct, 2))?;
        write_union_choice(o_prot, "BloomFilterAlgorithm", "BLOCK")?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("hash", TType::Struct, 3))?;
        write_union_choice(o_prot, "BloomFilterHash", "XXHASH")?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("compression", TType::Struct, 4))?;
        write_union_choice(o_prot, "BloomFilterCompression", "UNCOMPRESSED")?;
        o_prot.write_field_end()?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()?;
        Ok(())
    }
}

/// Read a single-choice thrift union whose only modeled variant is an
/// empty struct at field 1.
fn read_union_choice<T: TInputProtocol>(i_prot: &mut T, union_name: &str) -> thrift::Result<()> {
    let mut seen = false;

    i_prot.read_struct_begin()?;
    loop {
        let field_ident = i_prot.read_field_begin()?;
        if field_ident.field_type == TType::Stop {
            break;
        }
        match field_ident.id {
            Some(1) => {
                read_empty_struct(i_prot)?;
                seen = true;
            }
            _ => i_prot.skip(field_ident.field_type)?,
        }
        i_prot.read_field_end()?;
    }
    i_prot.read_struct_end()?;

    if !seen {
        return Err(protocol_error(format!(
            "Union {union_name} has no recognized variant set"
        )));
    }
    Ok(())
}

fn write_union_choice<T: TOutputProtocol>(
    o_prot: &mut T,
    union_name: &str,
    variant_name: &str,
) -> thrift::Result<()> {
    o_prot.write_struct_begin(&TStructIdentifier::new(union_name))?;
    o_prot.write_field_begin(&TFieldIdentifier::new(variant_name, TType::Struct, 1))?;
    write_empty_struct(o_prot, variant_name)?;
    o_prot.write_field_end()?;
    o_prot.write_field_stop()?;
    o_prot.write_struct_end()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_header_round_trip() {
        let header = PageHeader {
            page_type: PageType::DataPage,
            uncompressed_page_size: 128,
            compressed_page_size: 64,
            crc: None,
            data_page_header: Some(DataPageHeaderV1 {
                num_values: 10,
                encoding: Encoding::Plain,
                definition_level_encoding: Encoding::Rle,
                repetition_level_encoding: Encoding::Rle,
                statistics: Some(Statistics {
                    null_count: Some(2),
                    min_value: Some(vec![1, 2, 3, 4]),
                    ..Default::default()
                }),
            }),
            dictionary_page_header: None,
            data_page_header_v2: None,
        };

        let mut buf = Vec::new();
        let written = encode_page_header(&header, &mut buf).unwrap();
        assert_eq!(written, buf.len());

        let mut cursor = Cursor::new(&buf);
        let decoded = decode_page_header(&mut cursor).unwrap();
        assert_eq!(header, decoded);
        assert_eq!(buf.len(), cursor.offset());
    }

    #[test]
    fn v2_header_round_trip() {
        let header = PageHeader {
            page_type: PageType::DataPageV2,
            uncompressed_page_size: 256,
            compressed_page_size: 256,
            crc: Some(42),
            data_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: Some(DataPageHeaderV2 {
                num_values: 9,
                num_nulls: 3,
                num_rows: 9,
                encoding: Encoding::RleDictionary,
                definition_levels_byte_length: 6,
                repetition_levels_byte_length: 0,
                is_compressed: Some(false),
                statistics: None,
            }),
        };

        let mut buf = Vec::new();
        encode_page_header(&header, &mut buf).unwrap();

        let mut cursor = Cursor::new(&buf);
        assert_eq!(header, decode_page_header(&mut cursor).unwrap());
    }

    #[test]
    fn dictionary_header_round_trip() {
        let header = PageHeader {
            page_type: PageType::DictionaryPage,
            uncompressed_page_size: 32,
            compressed_page_size: 32,
            crc: None,
            data_page_header: None,
            dictionary_page_header: Some(DictionaryPageHeader {
                num_values: 4,
                encoding: Encoding::Plain,
                is_sorted: Some(false),
            }),
            data_page_header_v2: None,
        };

        let mut buf = Vec::new();
        encode_page_header(&header, &mut buf).unwrap();

        let mut cursor = Cursor::new(&buf);
        assert_eq!(header, decode_page_header(&mut cursor).unwrap());
    }

    #[test]
    fn headers_decode_back_to_back() {
        let first = PageHeader {
            page_type: PageType::DataPage,
            uncompressed_page_size: 8,
            compressed_page_size: 8,
            crc: None,
            data_page_header: Some(DataPageHeaderV1 {
                num_values: 1,
                encoding: Encoding::Plain,
                definition_level_encoding: Encoding::Rle,
                repetition_level_encoding: Encoding::Rle,
                statistics: None,
            }),
            dictionary_page_header: None,
            data_page_header_v2: None,
        };
        let mut second = first.clone();
        second.compressed_page_size = 99;

        let mut buf = Vec::new();
        encode_page_header(&first, &mut buf).unwrap();
        encode_page_header(&second, &mut buf).unwrap();

        let mut cursor = Cursor::new(&buf);
        assert_eq!(first, decode_page_header(&mut cursor).unwrap());
        assert_eq!(second, decode_page_header(&mut cursor).unwrap());
        assert_eq!(buf.len(), cursor.offset());
    }

    #[test]
    fn bloom_filter_header_round_trip() {
        let header = BloomFilterHeader {
            num_bytes: 1024,
            algorithm: BloomFilterAlgorithm::Block,
            hash: BloomFilterHash::XxHash,
            compression: BloomFilterCompression::Uncompressed,
        };

        let mut buf = Vec::new();
        encode_bloom_filter_header(&header, &mut buf).unwrap();

        let mut cursor = Cursor::new(&buf);
        assert_eq!(header, decode_bloom_filter_header(&mut cursor).unwrap());
    }

    #[test]
    fn garbage_header_errors() {
        let buf = [0xFFu8; 16];
        let mut cursor = Cursor::new(&buf);
        decode_page_header(&mut cursor).unwrap_err();
    }
}
