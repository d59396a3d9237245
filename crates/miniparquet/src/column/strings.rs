//! Lazy iteration over a BYTE_ARRAY column without materializing the
//! whole column.

use tracing::warn;

use crate::basic::{Compression, Encoding, PageType};
use crate::data_type::ByteArray;
use crate::encodings::rle::RleDecoder;
use crate::errors::Result;
use crate::file::reader::{ChunkReader, FileReader};
use crate::file::HEADER_WINDOW_SIZE;
use crate::format::{DataPageHeader, PageHeader};
use crate::thrift::ThriftReader;
use crate::util::bit_util::num_required_bits;
use crate::util::cursor::ByteCursor;

/// Pull-based iterator over the non-null values of a BYTE_ARRAY column.
///
/// Pages are decoded one at a time, crossing row-group boundaries
/// lazily. Rows whose definition level marks them null are skipped, the
/// iterator yields only values that exist. Forward-only.
#[derive(Debug)]
pub struct StringColumnIterator<'a, R: ChunkReader> {
    reader: &'a FileReader<R>,
    col_idx: usize,

    rg_idx: usize,
    num_row_groups: usize,

    cur_offset: u64,
    values_read: i64,
    total_values: i64,

    dictionary: Option<Vec<ByteArray>>,

    page_strings: Vec<ByteArray>,
    string_idx: usize,

    max_def_level: i16,
    max_rep_level: i16,
}

impl<'a, R: ChunkReader> StringColumnIterator<'a, R> {
    pub(crate) fn try_new(reader: &'a FileReader<R>, col_idx: usize) -> Result<Self> {
        let info = &reader.columns()[col_idx];
        let mut iter = StringColumnIterator {
            reader,
            col_idx,
            rg_idx: 0,
            num_row_groups: reader.num_row_groups(),
            cur_offset: 0,
            values_read: 0,
            total_values: 0,
            dictionary: None,
            page_strings: Vec::new(),
            string_idx: 0,
            max_def_level: info.max_def_level,
            max_rep_level: info.max_rep_level,
        };
        if iter.num_row_groups > 0 {
            iter.init_row_group()?;
            iter.decode_next_page()?;
        }
        Ok(iter)
    }

    /// True if a value is immediately available.
    pub fn has_next(&self) -> bool {
        self.string_idx < self.page_strings.len()
    }

    /// Returns the next non-null value. When the current page buffer
    /// empties, the next page is decoded eagerly, possibly crossing into
    /// a new row group.
    pub fn next(&mut self) -> Result<ByteArray> {
        if !self.has_next() {
            return Err(usage_err!("string iterator is exhausted"));
        }
        let value = self.page_strings[self.string_idx].clone();
        self.string_idx += 1;
        if self.string_idx >= self.page_strings.len() {
            self.decode_next_page()?;
        }
        Ok(value)
    }

    fn init_row_group(&mut self) -> Result<()> {
        let rg = &self.reader.metadata().row_groups[self.rg_idx];
        let info = &self.reader.columns()[self.col_idx];
        let chunk = rg
            .columns
            .get(info.column_index)
            .ok_or_else(|| usage_err!("row group has no chunk for column {}", self.col_idx))?;
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

        let mut offset = meta.data_page_offset;
        if let Some(dict_offset) = meta.dictionary_page_offset {
            offset = offset.min(dict_offset);
        }
        self.cur_offset = offset.max(0) as u64;
        self.values_read = 0;
        self.total_values = meta.num_values;
        self.dictionary = None;
        Ok(())
    }

    /// Refills the page buffer from the next data page that yields at
    /// least one string. Returns false when every row group is spent.
    fn decode_next_page(&mut self) -> Result<bool> {
        self.page_strings.clear();
        self.string_idx = 0;

        while self.page_strings.is_empty() {
            if self.values_read >= self.total_values {
                self.rg_idx += 1;
                while self.rg_idx < self.num_row_groups {
                    self.init_row_group()?;
                    if self.total_values > 0 {
                        break;
                    }
                    self.rg_idx += 1;
                }
                if self.rg_idx >= self.num_row_groups {
                    return Ok(false);
                }
            }

            let file_len = self.reader.file_len();
            if self.cur_offset >= file_len {
                return Err(payload_err!("page offset beyond end of file"));
            }
            let window = HEADER_WINDOW_SIZE.min((file_len - self.cur_offset) as usize);
            let buf = self.reader.read_range(self.cur_offset, window)?;
            let mut header_reader = ThriftReader::new(&buf);
            let header = PageHeader::read_from(&mut header_reader)?;
            self.cur_offset += header_reader.position() as u64;

            if header.compressed_page_size < 0 {
                return Err(payload_err!(
                    "negative page size {}",
                    header.compressed_page_size
                ));
            }
            let page_size = header.compressed_page_size as usize;

            match header.page_type {
                PageType::DictionaryPage => {
                    let dict_header = header
                        .dictionary_page_header
                        .as_ref()
                        .ok_or_else(|| thrift_err!("dictionary page without a dictionary page header"))?;
                    let data = self.reader.read_range(self.cur_offset, page_size)?;
                    let mut cursor = ByteCursor::new(&data);
                    let mut dict = Vec::with_capacity(dict_header.num_values.max(0) as usize);
                    for _ in 0..dict_header.num_values {
                        let len = cursor.read_u32_le()? as usize;
                        dict.push(ByteArray::from(cursor.read_slice(len)?));
                    }
                    self.dictionary = Some(dict);
                }
                PageType::DataPage => {
                    let dph = header
                        .data_page_header
                        .as_ref()
                        .ok_or_else(|| thrift_err!("data page without a data page header"))?;
                    let data = self.reader.read_range(self.cur_offset, page_size)?;
                    self.decode_data_page(&data, dph)?;
                    self.values_read += dph.num_values as i64;
                }
                PageType::DataPageV2 => {
                    return Err(unsupported_err!("v2 data pages cannot be decoded"));
                }
                _ => {}
            }

            self.cur_offset += page_size as u64;
        }

        Ok(true)
    }

    fn decode_data_page(&mut self, data: &[u8], header: &DataPageHeader) -> Result<()> {
        if header.num_values < 0 {
            return Err(payload_err!("negative value count {}", header.num_values));
        }
        let num_values = header.num_values as usize;
        let mut cursor = ByteCursor::new(data);

        let mut def_levels = vec![self.max_def_level; num_values];
        if self.max_def_level > 0 {
            let len = cursor.read_u32_le()? as usize;
            let stream = cursor.read_slice(len)?;
            let mut decoder = RleDecoder::new(stream, num_required_bits(self.max_def_level as u64));
            decoder.get_batch(&mut def_levels)?;
        }
        // Repetition levels are length-prefixed too; skip them whole.
        if self.max_rep_level > 0 {
            let len = cursor.read_u32_le()? as usize;
            cursor.read_slice(len)?;
        }

        let use_dict = matches!(
            header.encoding,
            Encoding::PlainDictionary | Encoding::RleDictionary
        );

        match (use_dict, self.dictionary.as_ref()) {
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
                    if *level != self.max_def_level {
                        continue;
                    }
                    let idx = indices[idx_pos];
                    idx_pos += 1;
                    match dict.get(idx as usize) {
                        Some(v) => self.page_strings.push(v.clone()),
                        None => {
                            if self.reader.options().strict_dictionary {
                                return Err(payload_err!(
                                    "dictionary index {} out of range ({} entries)",
                                    idx,
                                    dict.len()
                                ));
                            }
                            warn!(
                                index = idx,
                                dict_len = dict.len(),
                                "dictionary index out of range, skipping value"
                            );
                        }
                    }
                }
            }
            _ => {
                for level in &def_levels {
                    if *level != self.max_def_level {
                        continue;
                    }
                    let len = cursor.read_u32_le()? as usize;
                    self.page_strings.push(ByteArray::from(cursor.read_slice(len)?));
                }
            }
        }

        Ok(())
    }
}
