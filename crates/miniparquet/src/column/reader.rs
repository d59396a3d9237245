//! Decodes the pages of one column chunk into values.

use tracing::warn;

use crate::basic::{Compression, Encoding, PageType, Type};
use crate::data_type::Value;
use crate::encodings::plain;
use crate::encodings::rle::RleDecoder;
use crate::errors::Result;
use crate::file::reader::{ChunkReader, ReadOptions};
use crate::file::HEADER_WINDOW_SIZE;
use crate::format::{ColumnChunk, ColumnMetaData, DataPageHeader, DictionaryPageHeader, PageHeader};
use crate::schema::types::ColumnInfo;
use crate::thrift::ThriftReader;
use crate::util::bit_util::num_required_bits;
use crate::util::cursor::ByteCursor;

/// One decoded page from [`ColumnReader::read_pages`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub page_num: usize,
    pub page_type: PageType,
    pub num_values: i32,
    /// Decoded values; empty for dictionary pages.
    pub values: Vec<Value>,
}

/// Reads the pages of a single column chunk in stream order.
///
/// A dictionary page, when present, is always the first page of the
/// chunk and feeds the chunk-local dictionary used by later data pages.
#[derive(Debug)]
pub struct ColumnReader<'a, R: ChunkReader> {
    input: &'a R,
    file_len: u64,
    meta: &'a ColumnMetaData,
    physical_type: Type,
    type_length: Option<i32>,
    max_def_level: i16,
    max_rep_level: i16,
    options: ReadOptions,
}

impl<'a, R: ChunkReader> ColumnReader<'a, R> {
    pub fn try_new(
        input: &'a R,
        file_len: u64,
        chunk: &'a ColumnChunk,
        info: &ColumnInfo,
        options: ReadOptions,
    ) -> Result<Self> {
        let meta = chunk
            .meta_data
            .as_ref()
            .ok_or_else(|| thrift_err!("column chunk has no metadata"))?;
        if meta.codec != Compression::Uncompressed {
            return Err(unsupported_err!(
                "compression codec {:?} is not supported",
                meta.codec
            ));
        }
        if meta.data_page_offset < 0 {
            return Err(payload_err!("negative page offset"));
        }
        Ok(ColumnReader {
            input,
            file_len,
            meta,
            physical_type: info.physical_type,
            type_length: info.type_length,
            max_def_level: info.max_def_level,
            max_rep_level: info.max_rep_level,
            options,
        })
    }

    /// Decodes every value of the chunk, nulls included.
    pub fn read_all(&self) -> Result<Vec<Value>> {
        let mut result = Vec::new();
        let mut offset = self.chunk_start();
        let mut values_read: i64 = 0;
        let mut dictionary: Option<Vec<Value>> = None;

        while values_read < self.meta.num_values {
            let (header, header_len) = self.read_page_header(offset)?;
            offset += header_len as u64;
            let page_size = page_size(&header)?;

            match header.page_type {
                PageType::DictionaryPage => {
                    let dict_header = dictionary_header(&header)?;
                    let data = self.input.get_bytes(offset, page_size)?;
                    dictionary = Some(self.read_dictionary_page(&data, dict_header)?);
                }
                PageType::DataPage => {
                    let dph = data_header(&header)?;
                    let data = self.input.get_bytes(offset, page_size)?;
                    result.extend(self.read_data_page(&data, dph, dictionary.as_deref())?);
                    values_read += dph.num_values as i64;
                }
                PageType::DataPageV2 => {
                    return Err(unsupported_err!("v2 data pages cannot be decoded"));
                }
                // Index pages carry no values; skip by size.
                _ => {}
            }

            offset += page_size as u64;
        }

        Ok(result)
    }

    /// Same walk as [`read_all`], but per-page. Dictionary pages surface
    /// as zero-value entries.
    ///
    /// [`read_all`]: ColumnReader::read_all
    pub fn read_pages(&self) -> Result<Vec<PageResult>> {
        let mut pages = Vec::new();
        let mut offset = self.chunk_start();
        let mut values_read: i64 = 0;
        let mut dictionary: Option<Vec<Value>> = None;
        let mut page_num = 0;

        while values_read < self.meta.num_values {
            let (header, header_len) = self.read_page_header(offset)?;
            offset += header_len as u64;
            let page_size = page_size(&header)?;

            match header.page_type {
                PageType::DictionaryPage => {
                    let dict_header = dictionary_header(&header)?;
                    let data = self.input.get_bytes(offset, page_size)?;
                    dictionary = Some(self.read_dictionary_page(&data, dict_header)?);
                    pages.push(PageResult {
                        page_num,
                        page_type: PageType::DictionaryPage,
                        num_values: dict_header.num_values,
                        values: Vec::new(),
                    });
                    page_num += 1;
                }
                PageType::DataPage => {
                    let dph = data_header(&header)?;
                    let data = self.input.get_bytes(offset, page_size)?;
                    let values = self.read_data_page(&data, dph, dictionary.as_deref())?;
                    values_read += dph.num_values as i64;
                    pages.push(PageResult {
                        page_num,
                        page_type: PageType::DataPage,
                        num_values: dph.num_values,
                        values,
                    });
                    page_num += 1;
                }
                PageType::DataPageV2 => {
                    return Err(unsupported_err!("v2 data pages cannot be decoded"));
                }
                _ => {
                    page_num += 1;
                }
            }

            offset += page_size as u64;
        }

        Ok(pages)
    }

    fn chunk_start(&self) -> u64 {
        let mut offset = self.meta.data_page_offset;
        if let Some(dict_offset) = self.meta.dictionary_page_offset {
            offset = offset.min(dict_offset);
        }
        offset.max(0) as u64
    }

    fn read_page_header(&self, offset: u64) -> Result<(PageHeader, usize)> {
        if offset >= self.file_len {
            return Err(payload_err!(
                "page header offset {} beyond end of file",
                offset
            ));
        }
        let window = HEADER_WINDOW_SIZE.min((self.file_len - offset) as usize);
        let buf = self.input.get_bytes(offset, window)?;
        let mut reader = ThriftReader::new(&buf);
        let header = PageHeader::read_from(&mut reader)?;
        Ok((header, reader.position()))
    }

    fn read_dictionary_page(
        &self,
        data: &[u8],
        header: &DictionaryPageHeader,
    ) -> Result<Vec<Value>> {
        let mut cursor = ByteCursor::new(data);
        let mut dict = Vec::with_capacity(header.num_values.max(0) as usize);
        for _ in 0..header.num_values {
            dict.push(plain::decode_value(
                &mut cursor,
                self.physical_type,
                self.type_length,
            )?);
        }
        Ok(dict)
    }

    /// Reads one level stream: 4-byte little-endian length, then RLE
    /// data. The cursor advances past exactly the prefixed length no
    /// matter how many bits the decoder consumed.
    fn read_levels(
        &self,
        cursor: &mut ByteCursor<'_>,
        num_values: usize,
        max_level: i16,
    ) -> Result<Vec<i16>> {
        let mut levels = vec![max_level; num_values];
        if max_level > 0 {
            let len = cursor.read_u32_le()? as usize;
            let stream = cursor.read_slice(len)?;
            let mut decoder = RleDecoder::new(stream, num_required_bits(max_level as u64));
            decoder.get_batch(&mut levels)?;
        }
        Ok(levels)
    }

    fn read_data_page(
        &self,
        data: &[u8],
        header: &DataPageHeader,
        dictionary: Option<&[Value]>,
    ) -> Result<Vec<Value>> {
        if header.num_values < 0 {
            return Err(payload_err!("negative value count {}", header.num_values));
        }
        let num_values = header.num_values as usize;
        let mut cursor = ByteCursor::new(data);

        let def_levels = self.read_levels(&mut cursor, num_values, self.max_def_level)?;
        // Repetition levels are decoded for cursor placement but not
        // otherwise used by this flat reader.
        let _rep_levels = self.read_levels(&mut cursor, num_values, self.max_rep_level)?;

        let use_dict = matches!(
            header.encoding,
            Encoding::PlainDictionary | Encoding::RleDictionary
        );

        let mut values = Vec::with_capacity(num_values);
        match (use_dict, dictionary) {
            (true, Some(dict)) => {
                let num_non_null = def_levels
                    .iter()
                    .filter(|level| **level == self.max_def_level)
                    .count();

                let bit_width = cursor.read_u8()?;
                let rem = cursor.remaining();
                let stream = cursor.read_slice(rem)?;
                let mut decoder = RleDecoder::new(stream, bit_width);
                let mut indices = vec![0i32; num_non_null];
                decoder.get_batch(&mut indices)?;

                let mut idx_pos = 0;
                for level in &def_levels {
                    if *level < self.max_def_level {
                        values.push(Value::Null);
                        continue;
                    }
                    let idx = indices[idx_pos];
                    idx_pos += 1;
                    match dict.get(idx as usize) {
                        Some(v) => values.push(v.clone()),
                        None => {
                            if self.options.strict_dictionary {
                                return Err(payload_err!(
                                    "dictionary index {} out of range ({} entries)",
                                    idx,
                                    dict.len()
                                ));
                            }
                            warn!(
                                index = idx,
                                dict_len = dict.len(),
                                "dictionary index out of range, substituting null"
                            );
                            values.push(Value::Null);
                        }
                    }
                }
            }
            _ if self.physical_type == Type::Boolean => {
                // Bit-packed booleans, one bit per non-null value, LSB
                // first within each byte.
                let mut bit_idx = 0usize;
                let mut current_byte = 0u8;
                for level in &def_levels {
                    if *level < self.max_def_level {
                        values.push(Value::Null);
                        continue;
                    }
                    if bit_idx % 8 == 0 {
                        current_byte = cursor.read_u8()?;
                    }
                    values.push(Value::Boolean((current_byte >> (bit_idx % 8)) & 1 != 0));
                    bit_idx += 1;
                }
            }
            _ => {
                for level in &def_levels {
                    if *level < self.max_def_level {
                        values.push(Value::Null);
                    } else {
                        values.push(plain::decode_value(
                            &mut cursor,
                            self.physical_type,
                            self.type_length,
                        )?);
                    }
                }
            }
        }

        Ok(values)
    }
}

fn page_size(header: &PageHeader) -> Result<usize> {
    if header.compressed_page_size < 0 {
        return Err(payload_err!(
            "negative page size {}",
            header.compressed_page_size
        ));
    }
    Ok(header.compressed_page_size as usize)
}

fn data_header(header: &PageHeader) -> Result<&DataPageHeader> {
    header
        .data_page_header
        .as_ref()
        .ok_or_else(|| thrift_err!("data page without a data page header"))
}

fn dictionary_header(header: &PageHeader) -> Result<&DictionaryPageHeader> {
    header
        .dictionary_page_header
        .as_ref()
        .ok_or_else(|| thrift_err!("dictionary page without a dictionary page header"))
}
