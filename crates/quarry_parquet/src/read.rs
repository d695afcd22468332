//! Column chunk page decoding.
//!
//! A column chunk is a contiguous byte region holding one or more pages.
//! Decoding walks the buffer with an explicit cursor: decode one page
//! header, dispatch on the page type, decompress, decode levels and
//! values, resolve dictionary indirection, and accumulate the aggregate
//! output until the buffer ends or a caller-supplied value cap is met.

use std::borrow::Cow;

use quarry_error::{QuarryError, Result};
use tracing::debug;

use crate::compression::{self, Compression};
use crate::cursor::Cursor;
use crate::encoding::{self, plain, rle, CodecOptions, Encoding};
use crate::format;
use crate::page::{DictionaryTable, PageData, PageHeader, PageType};
use crate::schema::Schema;
use crate::types::{bit_width, PhysicalType};
use crate::value::Value;

/// Everything the page pipeline needs to know about the enclosing column
/// chunk.
#[derive(Debug, Clone)]
pub struct ChunkContext {
    pub physical_type: PhysicalType,
    /// Declared value encoding for the column.
    pub encoding: Encoding,
    pub compression: Compression,
    pub r_level_max: u32,
    pub d_level_max: u32,
    /// Declared type length; doubles as the bit width for RLE-encoded
    /// columns.
    pub type_length: Option<usize>,
    /// Stop decoding once this many (value, r, d) entries have been
    /// produced.
    pub num_values: Option<usize>,
}

impl ChunkContext {
    /// Build a context from a compiled schema column.
    pub fn for_column<S: AsRef<str>>(schema: &Schema, path: &[S]) -> Result<Self> {
        let field = schema.find_field(path)?;
        let leaf = field.leaf().ok_or_else(|| {
            QuarryError::new(format!(
                "Cannot decode pages for non-leaf column: {}",
                field.path.join(".")
            ))
        })?;

        Ok(ChunkContext {
            physical_type: leaf.physical_type,
            encoding: leaf.encoding,
            compression: leaf.compression,
            r_level_max: field.r_level_max,
            d_level_max: field.d_level_max,
            type_length: leaf.type_length,
            num_values: None,
        })
    }

    pub fn with_value_cap(mut self, num_values: usize) -> Self {
        self.num_values = Some(num_values);
        self
    }
}

/// Levels and values decoded from a single page.
#[derive(Debug)]
struct PageSlice {
    rlevels: Vec<u32>,
    dlevels: Vec<u32>,
    values: Vec<Value>,
    count: usize,
}

/// Decode all pages of a column chunk into flat value/level streams.
pub fn decode_page_sequence(buffer: &[u8], ctx: &ChunkContext) -> Result<PageData> {
    let mut cursor = Cursor::new(buffer);
    let mut data = PageData::default();
    // The dictionary is scoped to this chunk; a DICTIONARY_PAGE installs
    // it for every data page that follows.
    let mut dictionary: Option<DictionaryTable> = None;

    while cursor.remaining() > 0 {
        if let Some(cap) = ctx.num_values {
            if data.dlevels.len() >= cap {
                break;
            }
        }

        let header = format::decode_page_header(&mut cursor)?;
        debug!(
            page_type = ?header.page_type,
            compressed_size = header.compressed_page_size,
            offset = cursor.offset(),
            "decoded page header"
        );

        let page = match header.page_type {
            PageType::DictionaryPage => {
                dictionary = Some(decode_dictionary_page(&mut cursor, &header, ctx)?);
                continue;
            }
            PageType::DataPage => decode_data_page_v1(&mut cursor, &header, ctx)?,
            PageType::DataPageV2 => decode_data_page_v2(&mut cursor, &header, ctx)?,
            PageType::IndexPage => {
                return Err(QuarryError::new(format!(
                    "Unexpected INDEX_PAGE inside column chunk at offset {}",
                    cursor.offset()
                )))
            }
        };

        let values = match &dictionary {
            Some(dictionary) => resolve_dictionary(page.values, dictionary)?,
            None => page.values,
        };

        data.rlevels.extend(page.rlevels);
        data.dlevels.extend(page.dlevels);
        data.values.extend(values);
        data.count += page.count;
        data.page_headers.push(header);
    }

    if let Some(cap) = ctx.num_values {
        truncate_to_cap(&mut data, cap, ctx.d_level_max);
    }

    Ok(data)
}

fn truncate_to_cap(data: &mut PageData, cap: usize, d_level_max: u32) {
    if data.dlevels.len() <= cap {
        return;
    }
    let keep_values = data.dlevels[..cap]
        .iter()
        .filter(|&&d| d == d_level_max)
        .count();
    data.rlevels.truncate(cap);
    data.dlevels.truncate(cap);
    data.values.truncate(keep_values);
    data.count = cap;
}

fn page_value_count(num_values: i32) -> Result<usize> {
    usize::try_from(num_values)
        .map_err(|_| QuarryError::new(format!("Invalid page value count: {num_values}")))
}

fn page_byte_len(len: i32) -> Result<usize> {
    usize::try_from(len).map_err(|_| QuarryError::new(format!("Invalid page byte length: {len}")))
}

fn check_level_encoding(encoding: Encoding) -> Result<()> {
    if encoding != Encoding::Rle {
        return Err(QuarryError::new(format!(
            "Unsupported level encoding: {encoding}"
        )));
    }
    Ok(())
}

fn decode_page_values(
    encoding: Encoding,
    cursor: &mut Cursor,
    count: usize,
    ctx: &ChunkContext,
) -> Result<Vec<Value>> {
    let opts = match encoding {
        Encoding::Rle => {
            let width = ctx.type_length.ok_or_else(|| {
                QuarryError::new("RLE-encoded column requires a declared type length (bit width)")
            })?;
            CodecOptions {
                bit_width: width as u8,
                disable_envelope: false,
            }
        }
        _ => CodecOptions::default(),
    };

    encoding::decode_values(ctx.physical_type, encoding, cursor, count, &opts)
}

fn resolve_dictionary(values: Vec<Value>, dictionary: &DictionaryTable) -> Result<Vec<Value>> {
    values
        .into_iter()
        .map(|value| match value {
            Value::Int32(idx) if idx >= 0 => dictionary.lookup(idx as usize).cloned(),
            other => Err(QuarryError::new(format!(
                "Expected dictionary index, got {} value",
                other.type_name()
            ))),
        })
        .collect()
}

fn decode_dictionary_page(
    cursor: &mut Cursor,
    header: &PageHeader,
    ctx: &ChunkContext,
) -> Result<DictionaryTable> {
    let dict_header = header.dictionary_page_header.as_ref().ok_or_else(|| {
        QuarryError::new("DICTIONARY_PAGE header missing dictionary_page_header")
    })?;

    let compressed = cursor.read_slice(page_byte_len(header.compressed_page_size)?)?;
    let payload: Cow<[u8]> = match ctx.compression {
        Compression::Uncompressed => Cow::Borrowed(compressed),
        method => Cow::Owned(compression::inflate(method, compressed)?),
    };

    // Dictionary values always use the column's base encoding.
    let count = page_value_count(dict_header.num_values)?;
    let mut payload_cursor = Cursor::new(&payload);
    let values = plain::decode(ctx.physical_type, &mut payload_cursor, count)?;

    debug!(count, "decoded dictionary page");
    Ok(DictionaryTable::new(values))
}

fn decode_data_page_v1(
    cursor: &mut Cursor,
    header: &PageHeader,
    ctx: &ChunkContext,
) -> Result<PageSlice> {
    let v1 = header
        .data_page_header
        .as_ref()
        .ok_or_else(|| QuarryError::new("DATA_PAGE header missing data_page_header"))?;

    let compressed = cursor.read_slice(page_byte_len(header.compressed_page_size)?)?;

    // V1 compresses the whole payload; levels and values both decode from
    // the inflated bytes.
    let payload: Cow<[u8]> = match ctx.compression {
        Compression::Uncompressed => Cow::Borrowed(compressed),
        method => Cow::Owned(compression::inflate(method, compressed)?),
    };
    let mut payload_cursor = Cursor::new(&payload);

    let num_values = page_value_count(v1.num_values)?;

    let rlevels = if ctx.r_level_max > 0 {
        check_level_encoding(v1.repetition_level_encoding)?;
        rle::decode(
            &mut payload_cursor,
            num_values,
            bit_width(ctx.r_level_max),
            false,
        )?
    } else {
        vec![0; num_values]
    };

    let dlevels = if ctx.d_level_max > 0 {
        check_level_encoding(v1.definition_level_encoding)?;
        rle::decode(
            &mut payload_cursor,
            num_values,
            bit_width(ctx.d_level_max),
            false,
        )?
    } else {
        vec![0; num_values]
    };

    // V1 headers don't declare a null count; derive it from the levels.
    let non_null = dlevels.iter().filter(|&&d| d == ctx.d_level_max).count();
    let values = decode_page_values(v1.encoding, &mut payload_cursor, non_null, ctx)?;

    Ok(PageSlice {
        rlevels,
        dlevels,
        values,
        count: num_values,
    })
}

fn decode_data_page_v2(
    cursor: &mut Cursor,
    header: &PageHeader,
    ctx: &ChunkContext,
) -> Result<PageSlice> {
    let v2 = header
        .data_page_header_v2
        .as_ref()
        .ok_or_else(|| QuarryError::new("DATA_PAGE_V2 header missing data_page_header_v2"))?;

    let page_bytes = cursor.read_slice(page_byte_len(header.compressed_page_size)?)?;

    let num_values = page_value_count(v2.num_values)?;
    let num_nulls = page_value_count(v2.num_nulls)?;
    let rl_len = page_byte_len(v2.repetition_levels_byte_length)?;
    let dl_len = page_byte_len(v2.definition_levels_byte_length)?;

    if rl_len + dl_len > page_bytes.len() {
        return Err(QuarryError::new(format!(
            "Level byte lengths exceed page size: {} + {} > {}",
            rl_len,
            dl_len,
            page_bytes.len()
        )));
    }

    // V2 never compresses levels; they decode straight from the page
    // prefix, envelope-free, with declared byte lengths.
    let rlevels = if ctx.r_level_max > 0 {
        let mut level_cursor = Cursor::new(&page_bytes[..rl_len]);
        rle::decode(
            &mut level_cursor,
            num_values,
            bit_width(ctx.r_level_max),
            true,
        )?
    } else {
        vec![0; num_values]
    };

    let dlevels = if ctx.d_level_max > 0 {
        let mut level_cursor = Cursor::new(&page_bytes[rl_len..rl_len + dl_len]);
        rle::decode(
            &mut level_cursor,
            num_values,
            bit_width(ctx.d_level_max),
            true,
        )?
    } else {
        vec![0; num_values]
    };

    // Only the value payload is optionally compressed, per the page flag.
    let value_bytes = &page_bytes[rl_len + dl_len..];
    let payload: Cow<[u8]> = if v2.is_compressed.unwrap_or(true) {
        match ctx.compression {
            Compression::Uncompressed => Cow::Borrowed(value_bytes),
            method => Cow::Owned(compression::inflate(method, value_bytes)?),
        }
    } else {
        Cow::Borrowed(value_bytes)
    };

    // Non-null count comes straight from the header.
    let non_null = num_values.checked_sub(num_nulls).ok_or_else(|| {
        QuarryError::new(format!(
            "Page null count {num_nulls} exceeds value count {num_values}"
        ))
    })?;

    let mut payload_cursor = Cursor::new(&payload);
    let values = decode_page_values(v2.encoding, &mut payload_cursor, non_null, ctx)?;

    Ok(PageSlice {
        rlevels,
        dlevels,
        values,
        count: num_values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{DataPageHeaderV1, DataPageHeaderV2, DictionaryPageHeader};

    fn int32_ctx() -> ChunkContext {
        ChunkContext {
            physical_type: PhysicalType::Int32,
            encoding: Encoding::Plain,
            compression: Compression::Uncompressed,
            r_level_max: 0,
            d_level_max: 0,
            type_length: None,
            num_values: None,
        }
    }

    fn v1_header(
        num_values: usize,
        encoding: Encoding,
        uncompressed: usize,
        compressed: usize,
    ) -> PageHeader {
        PageHeader {
            page_type: PageType::DataPage,
            uncompressed_page_size: uncompressed as i32,
            compressed_page_size: compressed as i32,
            crc: None,
            data_page_header: Some(DataPageHeaderV1 {
                num_values: num_values as i32,
                encoding,
                definition_level_encoding: Encoding::Rle,
                repetition_level_encoding: Encoding::Rle,
                statistics: None,
            }),
            dictionary_page_header: None,
            data_page_header_v2: None,
        }
    }

    /// Assemble one V1 data page: header + (optionally compressed) body.
    fn v1_page(
        num_values: usize,
        encoding: Encoding,
        body: &[u8],
        method: Compression,
    ) -> Vec<u8> {
        let compressed = compression::deflate(method, body).unwrap();
        let header = v1_header(num_values, encoding, body.len(), compressed.len());

        let mut out = Vec::new();
        format::encode_page_header(&header, &mut out).unwrap();
        out.extend_from_slice(&compressed);
        out
    }

    fn plain_int32_body(values: &[i32]) -> Vec<u8> {
        let values: Vec<Value> = values.iter().map(|&v| Value::Int32(v)).collect();
        plain::encode(PhysicalType::Int32, &values).unwrap()
    }

    #[test]
    fn single_plain_page_required_column() {
        let chunk = v1_page(
            3,
            Encoding::Plain,
            &plain_int32_body(&[7, 8, 9]),
            Compression::Uncompressed,
        );

        let data = decode_page_sequence(&chunk, &int32_ctx()).unwrap();

        assert_eq!(3, data.count);
        assert_eq!(vec![0, 0, 0], data.rlevels);
        assert_eq!(vec![0, 0, 0], data.dlevels);
        assert_eq!(
            vec![Value::Int32(7), Value::Int32(8), Value::Int32(9)],
            data.values
        );
        assert_eq!(1, data.page_headers.len());
    }

    #[test]
    fn optional_column_derives_null_count_from_levels() {
        // d levels [1, 0, 1, 1]: second entry is null.
        let dlevels = [1u32, 0, 1, 1];
        let mut body = rle::encode(&dlevels, 1, false).unwrap();
        body.extend_from_slice(&plain_int32_body(&[10, 30, 40]));

        let ctx = ChunkContext {
            d_level_max: 1,
            ..int32_ctx()
        };
        let chunk = v1_page(4, Encoding::Plain, &body, Compression::Uncompressed);
        let data = decode_page_sequence(&chunk, &ctx).unwrap();

        assert_eq!(vec![1, 0, 1, 1], data.dlevels);
        assert_eq!(3, data.values.len());
    }

    #[test]
    fn gzip_v1_page_inflates_whole_payload() {
        let dlevels = [1u32, 1, 0, 1];
        let mut body = rle::encode(&dlevels, 1, false).unwrap();
        body.extend_from_slice(&plain_int32_body(&[5, 6, 7]));

        let ctx = ChunkContext {
            d_level_max: 1,
            compression: Compression::Gzip,
            ..int32_ctx()
        };
        let chunk = v1_page(4, Encoding::Plain, &body, Compression::Gzip);
        let data = decode_page_sequence(&chunk, &ctx).unwrap();

        assert_eq!(
            vec![Value::Int32(5), Value::Int32(6), Value::Int32(7)],
            data.values
        );
    }

    #[test]
    fn dictionary_page_resolves_indices() {
        let dict_values = vec![
            Value::Bytes(b"red".to_vec()),
            Value::Bytes(b"green".to_vec()),
            Value::Bytes(b"blue".to_vec()),
        ];
        let dict_body = plain::encode(PhysicalType::ByteArray, &dict_values).unwrap();

        let mut chunk = Vec::new();
        let dict_header = PageHeader {
            page_type: PageType::DictionaryPage,
            uncompressed_page_size: dict_body.len() as i32,
            compressed_page_size: dict_body.len() as i32,
            crc: None,
            data_page_header: None,
            dictionary_page_header: Some(DictionaryPageHeader {
                num_values: 3,
                encoding: Encoding::Plain,
                is_sorted: None,
            }),
            data_page_header_v2: None,
        };
        format::encode_page_header(&dict_header, &mut chunk).unwrap();
        chunk.extend_from_slice(&dict_body);

        let indices = [2u32, 0, 0, 1, 2];
        let body = crate::encoding::dictionary::encode_indices(&indices, 3).unwrap();
        chunk.extend_from_slice(&v1_page(
            5,
            Encoding::PlainDictionary,
            &body,
            Compression::Uncompressed,
        ));

        let ctx = ChunkContext {
            physical_type: PhysicalType::ByteArray,
            ..int32_ctx()
        };
        let data = decode_page_sequence(&chunk, &ctx).unwrap();

        let expected: Vec<Value> = ["blue", "red", "red", "green", "blue"]
            .iter()
            .map(|s| Value::Bytes(s.as_bytes().to_vec()))
            .collect();
        assert_eq!(expected, data.values);
        // The dictionary page doesn't contribute to the output stream.
        assert_eq!(5, data.count);
        assert_eq!(1, data.page_headers.len());
    }

    #[test]
    fn dictionary_index_out_of_bounds_errors() {
        let dict_values = vec![Value::Int32(1), Value::Int32(2)];
        let dict_body = plain::encode(PhysicalType::Int32, &dict_values).unwrap();

        let mut chunk = Vec::new();
        let dict_header = PageHeader {
            page_type: PageType::DictionaryPage,
            uncompressed_page_size: dict_body.len() as i32,
            compressed_page_size: dict_body.len() as i32,
            crc: None,
            data_page_header: None,
            dictionary_page_header: Some(DictionaryPageHeader {
                num_values: 2,
                encoding: Encoding::Plain,
                is_sorted: None,
            }),
            data_page_header_v2: None,
        };
        format::encode_page_header(&dict_header, &mut chunk).unwrap();
        chunk.extend_from_slice(&dict_body);

        // Hand-build an index stream pointing past the dictionary.
        let mut body = vec![8u8];
        body.extend_from_slice(&rle::encode(&[7], 8, true).unwrap());
        chunk.extend_from_slice(&v1_page(
            1,
            Encoding::RleDictionary,
            &body,
            Compression::Uncompressed,
        ));

        let err = decode_page_sequence(&chunk, &int32_ctx()).unwrap_err();
        assert!(err.to_string().contains("out of bounds"), "{err}");
    }

    fn v2_page(
        num_values: usize,
        num_nulls: usize,
        rlevels: &[u8],
        dlevels: &[u8],
        value_body: &[u8],
        method: Compression,
        compress_values: bool,
    ) -> Vec<u8> {
        let values: Vec<u8> = if compress_values {
            compression::deflate(method, value_body).unwrap()
        } else {
            value_body.to_vec()
        };

        let mut page = Vec::new();
        page.extend_from_slice(rlevels);
        page.extend_from_slice(dlevels);
        page.extend_from_slice(&values);

        let header = PageHeader {
            page_type: PageType::DataPageV2,
            uncompressed_page_size: (rlevels.len() + dlevels.len() + value_body.len()) as i32,
            compressed_page_size: page.len() as i32,
            crc: None,
            data_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: Some(DataPageHeaderV2 {
                num_values: num_values as i32,
                num_nulls: num_nulls as i32,
                num_rows: num_values as i32,
                encoding: Encoding::Plain,
                definition_levels_byte_length: dlevels.len() as i32,
                repetition_levels_byte_length: rlevels.len() as i32,
                is_compressed: Some(compress_values),
                statistics: None,
            }),
        };

        let mut out = Vec::new();
        format::encode_page_header(&header, &mut out).unwrap();
        out.extend_from_slice(&page);
        out
    }

    #[test]
    fn v2_page_levels_uncompressed_values_compressed() {
        // 4 entries, second is null; only values are gzip'd.
        let dlevels = rle::encode(&[1, 0, 1, 1], 1, true).unwrap();
        let value_body = plain_int32_body(&[100, 200, 300]);

        let chunk = v2_page(4, 1, &[], &dlevels, &value_body, Compression::Gzip, true);

        let ctx = ChunkContext {
            d_level_max: 1,
            compression: Compression::Gzip,
            ..int32_ctx()
        };
        let data = decode_page_sequence(&chunk, &ctx).unwrap();

        assert_eq!(vec![1, 0, 1, 1], data.dlevels);
        assert_eq!(
            vec![Value::Int32(100), Value::Int32(200), Value::Int32(300)],
            data.values
        );
    }

    #[test]
    fn v2_page_uncompressed_flag_skips_inflate() {
        let dlevels = rle::encode(&[1, 1], 1, true).unwrap();
        let value_body = plain_int32_body(&[1, 2]);

        // Chunk declares gzip but this page opted out.
        let chunk = v2_page(2, 0, &[], &dlevels, &value_body, Compression::Gzip, false);

        let ctx = ChunkContext {
            d_level_max: 1,
            compression: Compression::Gzip,
            ..int32_ctx()
        };
        let data = decode_page_sequence(&chunk, &ctx).unwrap();
        assert_eq!(vec![Value::Int32(1), Value::Int32(2)], data.values);
    }

    #[test]
    fn value_cap_stops_page_walk() {
        let page = v1_page(
            4,
            Encoding::Plain,
            &plain_int32_body(&[1, 2, 3, 4]),
            Compression::Uncompressed,
        );
        let mut chunk = page.clone();
        chunk.extend_from_slice(&page);

        // Cap at one full page: the second page is never decoded.
        let ctx = int32_ctx().with_value_cap(4);
        let data = decode_page_sequence(&chunk, &ctx).unwrap();
        assert_eq!(4, data.count);
        assert_eq!(1, data.page_headers.len());

        // Cap inside the second page: output truncated to exactly the cap.
        let ctx = int32_ctx().with_value_cap(6);
        let data = decode_page_sequence(&chunk, &ctx).unwrap();
        assert_eq!(6, data.count);
        assert_eq!(6, data.dlevels.len());
        assert_eq!(6, data.values.len());
        assert_eq!(2, data.page_headers.len());
    }

    #[test]
    fn unsupported_value_encoding_errors() {
        let chunk = v1_page(
            1,
            Encoding::DeltaBinaryPacked,
            &plain_int32_body(&[1]),
            Compression::Uncompressed,
        );

        let err = decode_page_sequence(&chunk, &int32_ctx()).unwrap_err();
        assert!(err.to_string().contains("DELTA_BINARY_PACKED"), "{err}");
    }

    #[test]
    fn rle_value_encoding_uses_type_length_bit_width() {
        let body = rle::encode(&[1, 1, 1, 0, 1], 2, false).unwrap();
        let chunk = v1_page(5, Encoding::Rle, &body, Compression::Uncompressed);

        let ctx = ChunkContext {
            physical_type: PhysicalType::Boolean,
            encoding: Encoding::Rle,
            type_length: Some(2),
            ..int32_ctx()
        };
        let data = decode_page_sequence(&chunk, &ctx).unwrap();

        assert_eq!(
            vec![
                Value::Boolean(true),
                Value::Boolean(true),
                Value::Boolean(true),
                Value::Boolean(false),
                Value::Boolean(true),
            ],
            data.values
        );
    }

    #[test]
    fn chunk_context_from_schema() {
        use crate::schema::{FieldDef, SchemaDef};

        let schema = Schema::compile(&SchemaDef::from([
            ("name".to_string(), FieldDef::typed("UTF8")),
            (
                "tags".to_string(),
                FieldDef::typed("UTF8").repeated().with_compression("GZIP"),
            ),
        ]))
        .unwrap();

        let ctx = ChunkContext::for_column(&schema, &["tags"]).unwrap();
        assert_eq!(PhysicalType::ByteArray, ctx.physical_type);
        assert_eq!(Compression::Gzip, ctx.compression);
        assert_eq!(1, ctx.r_level_max);
        assert_eq!(1, ctx.d_level_max);
    }
}
