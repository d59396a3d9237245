//! File writing: sequential sink plumbing and the row-group page writer.

use std::io::Write;

use hashbrown::HashMap;
use tracing::debug;

use crate::basic::{Compression, ConvertedType, Encoding, PageType, Repetition, Type};
use crate::data_type::Value;
use crate::encodings::plain;
use crate::encodings::rle::{encode_levels, RleEncoder};
use crate::errors::Result;
use crate::file::MAGIC;
use crate::format::{
    ColumnChunk, ColumnMetaData, DataPageHeader, DictionaryPageHeader, FileMetaData, PageHeader,
    RowGroup, SchemaElement,
};
use crate::thrift::ThriftWriter;
use crate::util::bit_util::{ceil, num_required_bits};

/// Sequential sink that tracks its byte position.
#[derive(Debug)]
pub struct TrackedWrite<W: Write> {
    inner: W,
    bytes_written: u64,
}

impl<W: Write> TrackedWrite<W> {
    pub fn new(inner: W) -> Self {
        TrackedWrite {
            inner,
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for TrackedWrite<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Column definition for a file to be written.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub physical_type: Type,
    pub repetition: Repetition,
    pub converted_type: Option<ConvertedType>,
    pub scale: Option<i32>,
    pub precision: Option<i32>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, physical_type: Type, repetition: Repetition) -> Self {
        ColumnSpec {
            name: name.into(),
            physical_type,
            repetition,
            converted_type: None,
            scale: None,
            precision: None,
        }
    }
}

const DEFAULT_DATA_PAGE_SIZE_LIMIT: usize = 1024;

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterProperties {
    data_page_size_limit: usize,
    dictionary_enabled: bool,
}

impl Default for WriterProperties {
    fn default() -> Self {
        WriterProperties {
            data_page_size_limit: DEFAULT_DATA_PAGE_SIZE_LIMIT,
            dictionary_enabled: true,
        }
    }
}

impl WriterProperties {
    pub fn builder() -> WriterPropertiesBuilder {
        WriterPropertiesBuilder {
            props: WriterProperties::default(),
        }
    }

    /// Uncompressed size at which a data page is closed.
    pub fn data_page_size_limit(&self) -> usize {
        self.data_page_size_limit
    }

    pub fn dictionary_enabled(&self) -> bool {
        self.dictionary_enabled
    }
}

#[derive(Debug)]
pub struct WriterPropertiesBuilder {
    props: WriterProperties,
}

impl WriterPropertiesBuilder {
    pub fn set_data_page_size_limit(mut self, limit: usize) -> Self {
        self.props.data_page_size_limit = limit.max(1);
        self
    }

    pub fn set_dictionary_enabled(mut self, enabled: bool) -> Self {
        self.props.dictionary_enabled = enabled;
        self
    }

    pub fn build(self) -> WriterProperties {
        self.props
    }
}

/// Per-chunk bookkeeping accumulated while pages are written.
#[derive(Debug)]
struct ChunkMeta {
    data_page_offset: i64,
    dictionary_page_offset: Option<i64>,
    /// Compressed and uncompressed alike under the identity codec.
    total_size: i64,
    num_values: i64,
    encoding: Encoding,
}

#[derive(Debug)]
struct RowGroupMeta {
    num_rows: i64,
    columns: Vec<ChunkMeta>,
}

/// Distinct non-null values in insertion order, keyed by their plain
/// encoding.
#[derive(Debug)]
struct DictionaryAnalysis {
    values: Vec<Value>,
    index: HashMap<Vec<u8>, u32>,
}

/// Streaming writer producing a complete file.
///
/// The sink is held exclusively until [`close`]; dropping the writer
/// closes implicitly so a forgotten close does not truncate the file.
///
/// [`close`]: FileWriter::close
#[derive(Debug)]
pub struct FileWriter<W: Write> {
    sink: TrackedWrite<W>,
    columns: Vec<ColumnSpec>,
    props: WriterProperties,
    row_groups: Vec<RowGroupMeta>,
    total_rows: i64,
    closed: bool,
}

impl<W: Write> FileWriter<W> {
    pub fn try_new(sink: W, columns: Vec<ColumnSpec>) -> Result<Self> {
        Self::try_new_with_properties(sink, columns, WriterProperties::default())
    }

    pub fn try_new_with_properties(
        sink: W,
        columns: Vec<ColumnSpec>,
        props: WriterProperties,
    ) -> Result<Self> {
        for col in &columns {
            if matches!(col.physical_type, Type::Int96 | Type::FixedLenByteArray) {
                return Err(unsupported_err!(
                    "cannot write {:?} columns",
                    col.physical_type
                ));
            }
        }
        let mut sink = TrackedWrite::new(sink);
        sink.write_all(&MAGIC)?;
        Ok(FileWriter {
            sink,
            columns,
            props,
            row_groups: Vec::new(),
            total_rows: 0,
            closed: false,
        })
    }

    /// Writes one row group from per-column value buffers of equal
    /// length.
    pub fn write_row_group(&mut self, columns: &[Vec<Value>]) -> Result<()> {
        if self.closed {
            return Err(usage_err!("writer is already closed"));
        }
        if columns.len() != self.columns.len() {
            return Err(usage_err!(
                "expected {} columns, got {}",
                self.columns.len(),
                columns.len()
            ));
        }
        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        if columns.iter().any(|c| c.len() != num_rows) {
            return Err(usage_err!("column value buffers must have equal lengths"));
        }

        let mut rg_meta = RowGroupMeta {
            num_rows: num_rows as i64,
            columns: Vec::with_capacity(columns.len()),
        };

        for (c, values) in columns.iter().enumerate() {
            let spec = self.columns[c].clone();
            let max_def_level: i16 = if spec.repetition == Repetition::Optional {
                1
            } else {
                0
            };

            let dict = if self.props.dictionary_enabled() {
                analyze_column(values, spec.physical_type)?
            } else {
                None
            };

            let chunk_start = self.sink.bytes_written() as i64;
            let chunk = if let Some(dict) = dict {
                let dict_page = encode_dictionary_page(&dict, spec.physical_type)?;
                self.sink.write_all(&dict_page)?;
                let data_page_offset = self.sink.bytes_written() as i64;

                let bit_width = dictionary_bit_width(dict.values.len());
                let boundaries = dict_page_boundaries(
                    values.len(),
                    bit_width,
                    self.props.data_page_size_limit(),
                );
                for (offset, count) in boundaries {
                    let page = encode_dict_data_page(
                        &values[offset..offset + count],
                        &dict,
                        spec.physical_type,
                        max_def_level,
                        bit_width,
                    )?;
                    self.sink.write_all(&page)?;
                }

                ChunkMeta {
                    data_page_offset,
                    dictionary_page_offset: Some(chunk_start),
                    total_size: self.sink.bytes_written() as i64 - chunk_start,
                    num_values: values.len() as i64,
                    encoding: Encoding::RleDictionary,
                }
            } else {
                let boundaries =
                    plain_page_boundaries(values, self.props.data_page_size_limit());
                for (offset, count) in boundaries {
                    let page = encode_plain_data_page(
                        &values[offset..offset + count],
                        spec.physical_type,
                        max_def_level,
                    )?;
                    self.sink.write_all(&page)?;
                }

                ChunkMeta {
                    data_page_offset: chunk_start,
                    dictionary_page_offset: None,
                    total_size: self.sink.bytes_written() as i64 - chunk_start,
                    num_values: values.len() as i64,
                    encoding: Encoding::Plain,
                }
            };
            rg_meta.columns.push(chunk);
        }

        self.total_rows += num_rows as i64;
        self.row_groups.push(rg_meta);
        Ok(())
    }

    /// Writes the descriptor and the trailing frame. Idempotent: a
    /// second call is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let footer_start = self.sink.bytes_written();
        let metadata = self.build_metadata();
        let mut tw = ThriftWriter::new();
        metadata.write_to(&mut tw);
        tw.write_stop();
        self.sink.write_all(tw.as_bytes())?;

        let footer_len = (self.sink.bytes_written() - footer_start) as u32;
        self.sink.write_all(&footer_len.to_le_bytes())?;
        self.sink.write_all(&MAGIC)?;
        self.sink.flush()?;
        debug!(footer_len, total_rows = self.total_rows, "closed file");
        Ok(())
    }

    fn build_metadata(&self) -> FileMetaData {
        let mut schema = Vec::with_capacity(1 + self.columns.len());
        schema.push(SchemaElement {
            name: "schema".to_string(),
            num_children: Some(self.columns.len() as i32),
            ..Default::default()
        });
        for col in &self.columns {
            schema.push(SchemaElement {
                physical_type: Some(col.physical_type),
                repetition: Some(col.repetition),
                name: col.name.clone(),
                converted_type: col.converted_type,
                scale: col.scale,
                precision: col.precision,
                ..Default::default()
            });
        }

        let row_groups = self
            .row_groups
            .iter()
            .map(|rg| {
                let columns = rg
                    .columns
                    .iter()
                    .zip(&self.columns)
                    .map(|(cm, spec)| {
                        let encodings = if cm.encoding == Encoding::RleDictionary {
                            vec![Encoding::Plain, Encoding::RleDictionary]
                        } else {
                            vec![Encoding::Plain]
                        };
                        ColumnChunk {
                            file_path: None,
                            file_offset: cm.dictionary_page_offset.unwrap_or(cm.data_page_offset),
                            meta_data: Some(ColumnMetaData {
                                physical_type: spec.physical_type,
                                encodings,
                                path_in_schema: vec![spec.name.clone()],
                                codec: Compression::Uncompressed,
                                num_values: cm.num_values,
                                total_uncompressed_size: cm.total_size,
                                total_compressed_size: cm.total_size,
                                data_page_offset: cm.data_page_offset,
                                index_page_offset: None,
                                dictionary_page_offset: cm.dictionary_page_offset,
                            }),
                        }
                    })
                    .collect();
                RowGroup {
                    columns,
                    total_byte_size: rg.columns.iter().map(|c| c.total_size).sum(),
                    num_rows: rg.num_rows,
                }
            })
            .collect();

        FileMetaData {
            version: 2,
            schema,
            num_rows: self.total_rows,
            row_groups,
            key_value_metadata: None,
            created_by: None,
        }
    }
}

impl<W: Write> Drop for FileWriter<W> {
    fn drop(&mut self) {
        if !self.closed {
            // Best effort; errors only surface through an explicit close.
            let _ = self.close();
        }
    }
}

/// Per-row size estimate driving page splits.
fn estimated_value_size(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Int32(_) | Value::Float(_) => 4,
        Value::Int64(_) | Value::Double(_) => 8,
        Value::Bytes(b) => 4 + b.len(),
    }
}

/// `(offset, count)` page splits for plain encoding: accumulate the
/// per-row estimate, close the page at the row that reaches the budget.
fn plain_page_boundaries(values: &[Value], limit: usize) -> Vec<(usize, usize)> {
    let mut pages = Vec::new();
    if values.is_empty() {
        return pages;
    }
    let mut page_start = 0;
    let mut estimated = 0;
    for (i, value) in values.iter().enumerate() {
        estimated += estimated_value_size(value);
        if estimated >= limit {
            pages.push((page_start, i - page_start + 1));
            page_start = i + 1;
            estimated = 0;
        }
    }
    if page_start < values.len() {
        pages.push((page_start, values.len() - page_start));
    }
    pages
}

/// Page splits for dictionary encoding, where every value is a compact
/// index.
fn dict_page_boundaries(num_values: usize, bit_width: u8, limit: usize) -> Vec<(usize, usize)> {
    let mut pages = Vec::new();
    if num_values == 0 {
        return pages;
    }
    let bytes_per_value = ceil(bit_width as usize, 8).max(1);
    let values_per_page = (limit / bytes_per_value).max(1);
    let mut offset = 0;
    while offset < num_values {
        let count = values_per_page.min(num_values - offset);
        pages.push((offset, count));
        offset += count;
    }
    pages
}

fn dictionary_bit_width(dict_len: usize) -> u8 {
    num_required_bits(dict_len.saturating_sub(1) as u64).max(1)
}

/// Assigns dictionary ids in insertion order. Returns `None` when the
/// column should fall back to plain encoding: no non-null values, or
/// more distinct values than a fifth of the non-null count.
fn analyze_column(values: &[Value], physical_type: Type) -> Result<Option<DictionaryAnalysis>> {
    let mut analysis = DictionaryAnalysis {
        values: Vec::new(),
        index: HashMap::new(),
    };
    let mut num_non_null = 0usize;
    let mut key = Vec::new();
    for value in values {
        if value.is_null() {
            continue;
        }
        num_non_null += 1;
        key.clear();
        plain::encode_value(value, physical_type, None, &mut key)?;
        if !analysis.index.contains_key(&key) {
            let id = analysis.values.len() as u32;
            analysis.index.insert(key.clone(), id);
            analysis.values.push(value.clone());
        }
    }

    let dict_len = analysis.values.len();
    if dict_len == 0 || dict_len > num_non_null / 5 {
        return Ok(None);
    }
    Ok(Some(analysis))
}

/// Definition-level block: 4-byte little-endian length then RLE runs.
/// Empty when the column carries no levels.
fn levels_block(values: &[Value], max_def_level: i16) -> Vec<u8> {
    if max_def_level <= 0 {
        return Vec::new();
    }
    let def_levels: Vec<i16> = values
        .iter()
        .map(|v| if v.is_null() { 0 } else { max_def_level })
        .collect();
    let rle = encode_levels(&def_levels, num_required_bits(max_def_level as u64));
    let mut out = Vec::with_capacity(4 + rle.len());
    out.extend_from_slice(&(rle.len() as u32).to_le_bytes());
    out.extend_from_slice(&rle);
    out
}

fn encode_plain_data_page(
    values: &[Value],
    physical_type: Type,
    max_def_level: i16,
) -> Result<Vec<u8>> {
    let mut payload = levels_block(values, max_def_level);

    if physical_type == Type::Boolean {
        // Bit-packed booleans, one bit per non-null value, LSB first.
        let mut byte = 0u8;
        let mut bit_idx = 0usize;
        for value in values {
            let bit = match value {
                Value::Null => continue,
                Value::Boolean(b) => *b,
                other => {
                    return Err(usage_err!(
                        "value {:?} does not match column type {:?}",
                        other,
                        physical_type
                    ));
                }
            };
            if bit {
                byte |= 1 << (bit_idx % 8);
            }
            bit_idx += 1;
            if bit_idx % 8 == 0 {
                payload.push(byte);
                byte = 0;
            }
        }
        if bit_idx % 8 != 0 {
            payload.push(byte);
        }
    } else {
        plain::encode_values(values, physical_type, None, &mut payload)?;
    }

    let header = data_page_header(values.len(), Encoding::Plain, payload.len());
    Ok(header.encode_with_payload(&payload))
}

fn encode_dictionary_page(dict: &DictionaryAnalysis, physical_type: Type) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    plain::encode_values(&dict.values, physical_type, None, &mut payload)?;

    let header = PageHeader {
        page_type: PageType::DictionaryPage,
        uncompressed_page_size: payload.len() as i32,
        compressed_page_size: payload.len() as i32,
        crc: None,
        data_page_header: None,
        dictionary_page_header: Some(DictionaryPageHeader {
            num_values: dict.values.len() as i32,
            encoding: Encoding::PlainDictionary,
            is_sorted: false,
        }),
    };
    Ok(header.encode_with_payload(&payload))
}

fn encode_dict_data_page(
    values: &[Value],
    dict: &DictionaryAnalysis,
    physical_type: Type,
    max_def_level: i16,
    bit_width: u8,
) -> Result<Vec<u8>> {
    let mut payload = levels_block(values, max_def_level);
    payload.push(bit_width);

    let mut encoder = RleEncoder::new(bit_width);
    let mut key = Vec::new();
    for value in values {
        if value.is_null() {
            continue;
        }
        key.clear();
        plain::encode_value(value, physical_type, None, &mut key)?;
        let id = dict
            .index
            .get(&key)
            .copied()
            .ok_or_else(|| usage_err!("value missing from the column dictionary"))?;
        encoder.put(id);
    }
    payload.extend_from_slice(&encoder.consume());

    let header = data_page_header(values.len(), Encoding::RleDictionary, payload.len());
    Ok(header.encode_with_payload(&payload))
}

fn data_page_header(num_values: usize, encoding: Encoding, payload_len: usize) -> PageHeader {
    PageHeader {
        page_type: PageType::DataPage,
        uncompressed_page_size: payload_len as i32,
        compressed_page_size: payload_len as i32,
        crc: None,
        data_page_header: Some(DataPageHeader {
            num_values: num_values as i32,
            encoding,
            definition_level_encoding: Encoding::Rle,
            repetition_level_encoding: Encoding::Rle,
        }),
        dictionary_page_header: None,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use bytes::Bytes;

    use super::*;
    use crate::data_type::ByteArray;
    use crate::errors::ParquetError;
    use crate::file::reader::{FileReader, ReadOptions};

    fn write_file(columns: Vec<ColumnSpec>, row_groups: &[&[Vec<Value>]]) -> Bytes {
        let mut buf = Vec::new();
        let mut writer = FileWriter::try_new(&mut buf, columns).unwrap();
        for rg in row_groups {
            writer.write_row_group(rg).unwrap();
        }
        writer.close().unwrap();
        drop(writer);
        buf.into()
    }

    fn strings(values: &[Option<&str>]) -> Vec<Value> {
        values
            .iter()
            .map(|v| match v {
                Some(s) => Value::from(*s),
                None => Value::Null,
            })
            .collect()
    }

    #[test]
    fn required_int32_roundtrip() {
        let values = vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)];
        let file = write_file(
            vec![ColumnSpec::new("x", Type::Int32, Repetition::Required)],
            &[&[values.clone()]],
        );

        assert_eq!(&MAGIC[..], &file[0..4]);
        assert_eq!(&MAGIC[..], &file[file.len() - 4..]);

        let reader = FileReader::try_new(file).unwrap();
        assert_eq!(3, reader.num_rows());
        assert_eq!(1, reader.num_row_groups());
        assert_eq!(1, reader.num_pages());
        assert_eq!(vec!["x"], reader.column_names());
        assert_eq!(values, reader.read_column("x").unwrap());
    }

    #[test]
    fn optional_byte_array_with_nulls_stays_plain() {
        // One distinct value over two non-nulls misses the one-fifth
        // threshold, so the writer falls back to plain.
        let values = strings(&[Some("hi"), None, Some("hi")]);
        let file = write_file(
            vec![ColumnSpec::new("s", Type::ByteArray, Repetition::Optional)],
            &[&[values.clone()]],
        );

        let reader = FileReader::try_new(file).unwrap();
        let meta = reader.metadata().row_groups[0].columns[0]
            .meta_data
            .as_ref()
            .unwrap();
        assert!(meta.dictionary_page_offset.is_none());
        assert_eq!(vec![Encoding::Plain], meta.encodings);
        assert_eq!(values, reader.read_column("s").unwrap());
    }

    #[test]
    fn single_value_dictionary_page_bytes() {
        let values = strings(&vec![Some("x"); 100]);
        let file = write_file(
            vec![ColumnSpec::new("s", Type::ByteArray, Repetition::Optional)],
            &[&[values.clone()]],
        );

        let reader = FileReader::try_new(file).unwrap();
        let meta = reader.metadata().row_groups[0].columns[0]
            .meta_data
            .as_ref()
            .unwrap();
        assert!(meta.dictionary_page_offset.is_some());
        assert_eq!(
            vec![Encoding::Plain, Encoding::RleDictionary],
            meta.encodings
        );

        // Payload: levels block (len32 + one run of 100 ones), bit width
        // prefix of 1, then a single repeated run of 100 zero indices.
        let payload = reader.read_page_data(0).unwrap();
        assert_eq!(
            vec![3, 0, 0, 0, 0xC8, 0x01, 0x01, 0x01, 0xC8, 0x01, 0x00],
            payload.to_vec()
        );

        assert_eq!(values, reader.read_column("s").unwrap());
    }

    #[test]
    fn boolean_plain_page_is_bit_packed() {
        let bits = [true, false, true, true, false, false, false, false];
        let values: Vec<Value> = bits.iter().map(|b| Value::Boolean(*b)).collect();
        let file = write_file(
            vec![ColumnSpec::new("b", Type::Boolean, Repetition::Required)],
            &[&[values.clone()]],
        );

        let reader = FileReader::try_new(file).unwrap();
        assert_eq!(1, reader.num_pages());
        assert_eq!(vec![0b0000_1101], reader.read_page_data(0).unwrap().to_vec());
        assert_eq!(values, reader.read_column("b").unwrap());
    }

    #[test]
    fn int64_column_splits_into_pages() {
        let values: Vec<Value> = (0..1024).map(Value::Int64).collect();
        let file = write_file(
            vec![ColumnSpec::new("n", Type::Int64, Repetition::Required)],
            &[&[values.clone()]],
        );

        let reader = FileReader::try_new(file).unwrap();
        // 8 bytes per row against the 1 KiB budget: 128 rows per page.
        assert_eq!(8, reader.num_pages());
        assert_eq!(values, reader.read_column("n").unwrap());
    }

    #[test]
    fn empty_column() {
        let file = write_file(
            vec![ColumnSpec::new("x", Type::Int32, Repetition::Required)],
            &[&[Vec::new()]],
        );

        let reader = FileReader::try_new(file).unwrap();
        assert_eq!(0, reader.num_rows());
        assert_eq!(0, reader.num_pages());
        assert_eq!(Vec::<Value>::new(), reader.read_column("x").unwrap());
    }

    #[test]
    fn all_null_column() {
        let values = vec![Value::Null; 10];
        let file = write_file(
            vec![ColumnSpec::new("x", Type::Int32, Repetition::Optional)],
            &[&[values.clone()]],
        );

        let reader = FileReader::try_new(file).unwrap();
        let meta = reader.metadata().row_groups[0].columns[0]
            .meta_data
            .as_ref()
            .unwrap();
        // No non-null values, the dictionary path is not chosen.
        assert!(meta.dictionary_page_offset.is_none());

        // The single page carries only level bytes.
        let payload = reader.read_page_data(0).unwrap();
        let rle_len = u32::from_le_bytes(payload[0..4].try_into().unwrap()) as usize;
        assert_eq!(4 + rle_len, payload.len());

        assert_eq!(values, reader.read_column("x").unwrap());
    }

    #[test]
    fn dictionary_with_bit_packed_indices() {
        let words = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let values: Vec<Value> = (0..80).map(|i| Value::from(words[i % 8])).collect();
        let file = write_file(
            vec![ColumnSpec::new("s", Type::ByteArray, Repetition::Optional)],
            &[&[values.clone()]],
        );

        let reader = FileReader::try_new(file).unwrap();
        let meta = reader.metadata().row_groups[0].columns[0]
            .meta_data
            .as_ref()
            .unwrap();
        assert!(meta.dictionary_page_offset.is_some());
        assert_eq!(values, reader.read_column("s").unwrap());
    }

    #[test]
    fn float_and_double_roundtrip() {
        let floats: Vec<Value> = vec![
            Value::Float(1.5),
            Value::Float(-0.0),
            Value::Float(f32::MAX),
        ];
        let doubles: Vec<Value> = vec![
            Value::Double(std::f64::consts::PI),
            Value::Double(-1e300),
            Value::Double(0.0),
        ];
        let file = write_file(
            vec![
                ColumnSpec::new("f", Type::Float, Repetition::Required),
                ColumnSpec::new("d", Type::Double, Repetition::Required),
            ],
            &[&[floats.clone(), doubles.clone()]],
        );

        let reader = FileReader::try_new(file).unwrap();
        assert_eq!(floats, reader.read_column("f").unwrap());
        assert_eq!(doubles, reader.read_column("d").unwrap());
    }

    #[test]
    fn multiple_row_groups() {
        let rg1 = vec![Value::Int32(1), Value::Int32(2)];
        let rg2 = vec![Value::Int32(3), Value::Int32(4), Value::Int32(5)];
        let file = write_file(
            vec![ColumnSpec::new("x", Type::Int32, Repetition::Required)],
            &[&[rg1.clone()], &[rg2.clone()]],
        );

        let reader = FileReader::try_new(file).unwrap();
        assert_eq!(5, reader.num_rows());
        assert_eq!(2, reader.num_row_groups());
        assert_eq!(
            5,
            reader
                .metadata()
                .row_groups
                .iter()
                .map(|rg| rg.num_rows)
                .sum::<i64>()
        );
        assert_eq!(rg1, reader.read_column_in_row_group("x", 0).unwrap());
        assert_eq!(rg2, reader.read_column_in_row_group("x", 1).unwrap());

        let mut all = rg1;
        all.extend(rg2);
        assert_eq!(all, reader.read_column("x").unwrap());
    }

    #[test]
    fn read_pages_keeps_page_boundaries() {
        let values = strings(&vec![Some("x"); 100]);
        let file = write_file(
            vec![ColumnSpec::new("s", Type::ByteArray, Repetition::Optional)],
            &[&[values]],
        );

        let reader = FileReader::try_new(file).unwrap();
        let pages = reader.read_pages(0, 0).unwrap();
        assert_eq!(2, pages.len());

        // The dictionary page surfaces as a zero-value entry.
        assert_eq!(crate::basic::PageType::DictionaryPage, pages[0].page_type);
        assert_eq!(1, pages[0].num_values);
        assert!(pages[0].values.is_empty());

        assert_eq!(crate::basic::PageType::DataPage, pages[1].page_type);
        assert_eq!(100, pages[1].num_values);
        assert_eq!(100, pages[1].values.len());
    }

    #[test]
    fn page_iterator_and_chunked_reads() {
        let values: Vec<Value> = (0..1024).map(Value::Int64).collect();
        let file = write_file(
            vec![ColumnSpec::new("n", Type::Int64, Repetition::Required)],
            &[&[values]],
        );

        let reader = FileReader::try_new(file).unwrap();
        let mut iter = reader.page_iterator();
        let mut seen = 0;
        let mut total_bytes = 0;
        while iter.has_next() {
            let page = iter.next().unwrap();
            assert_eq!(seen, page.page_id);
            assert_eq!(0, page.row_group_idx);
            assert_eq!(0, page.column_idx);
            total_bytes += page.data.len();
            seen += 1;
        }
        assert_eq!(reader.num_pages(), seen);
        assert!(iter.next().is_err());
        iter.reset();
        assert!(iter.has_next());

        let chunk = reader.read_pages_chunk(0, seen - 1, 100).unwrap();
        assert_eq!(100, chunk.len());
        let all = reader.read_pages_chunk(0, seen - 1, usize::MAX).unwrap();
        assert_eq!(total_bytes, all.len());
    }

    #[test]
    fn string_iterator_skips_nulls_across_row_groups() {
        let rg1 = strings(&[Some("a"), None, Some("b"), None]);
        let rg2 = strings(&[None, Some("c")]);
        let file = write_file(
            vec![ColumnSpec::new("s", Type::ByteArray, Repetition::Optional)],
            &[&[rg1], &[rg2]],
        );

        let reader = FileReader::try_new(file).unwrap();
        let mut iter = reader.column_iterator("s").unwrap();
        let mut got = Vec::new();
        while iter.has_next() {
            got.push(iter.next().unwrap());
        }
        assert!(iter.next().is_err());
        assert_eq!(
            vec![
                ByteArray::from("a"),
                ByteArray::from("b"),
                ByteArray::from("c")
            ],
            got
        );
    }

    #[test]
    fn string_iterator_through_dictionary_pages() {
        let words = ["alpha", "beta"];
        let values: Vec<Value> = (0..50).map(|i| Value::from(words[i % 2])).collect();
        let file = write_file(
            vec![ColumnSpec::new("s", Type::ByteArray, Repetition::Optional)],
            &[&[values.clone()]],
        );

        let reader = FileReader::try_new(file).unwrap();
        let mut iter = reader.column_iterator("s").unwrap();
        let mut got = Vec::new();
        while iter.has_next() {
            got.push(iter.next().unwrap());
        }
        let expected: Vec<ByteArray> = values
            .iter()
            .map(|v| ByteArray::from(v.as_bytes().unwrap()))
            .collect();
        assert_eq!(expected, got);
    }

    #[test]
    fn string_iterator_rejects_non_byte_array() {
        let file = write_file(
            vec![ColumnSpec::new("x", Type::Int32, Repetition::Required)],
            &[&[vec![Value::Int32(1)]]],
        );
        let reader = FileReader::try_new(file).unwrap();
        assert!(matches!(
            reader.column_iterator("x").unwrap_err(),
            ParquetError::Usage(_)
        ));
    }

    #[test]
    fn dictionary_can_be_disabled() {
        let values = strings(&vec![Some("x"); 100]);
        let mut buf = Vec::new();
        let props = WriterProperties::builder()
            .set_dictionary_enabled(false)
            .build();
        let mut writer = FileWriter::try_new_with_properties(
            &mut buf,
            vec![ColumnSpec::new("s", Type::ByteArray, Repetition::Optional)],
            props,
        )
        .unwrap();
        writer.write_row_group(&[values.clone()]).unwrap();
        writer.close().unwrap();
        drop(writer);

        let reader = FileReader::try_new(Bytes::from(buf)).unwrap();
        let meta = reader.metadata().row_groups[0].columns[0]
            .meta_data
            .as_ref()
            .unwrap();
        assert!(meta.dictionary_page_offset.is_none());
        assert_eq!(vec![Encoding::Plain], meta.encodings);
        assert_eq!(values, reader.read_column("s").unwrap());
    }

    #[test]
    fn out_of_range_dictionary_index() {
        let values = strings(&vec![Some("x"); 100]);
        let file = write_file(
            vec![ColumnSpec::new("s", Type::ByteArray, Repetition::Optional)],
            &[&[values]],
        );

        // The data page payload ends with the repeated run's value byte;
        // point every index past the single dictionary entry.
        let entry = {
            let reader = FileReader::try_new(file.clone()).unwrap();
            reader.page_index_entry(0).unwrap()
        };
        let mut corrupt = file.to_vec();
        let value_byte = entry.data_offset as usize + entry.data_size - 1;
        corrupt[value_byte] = 5;
        let corrupt = Bytes::from(corrupt);

        // Lenient mode substitutes null.
        let reader = FileReader::try_new(corrupt.clone()).unwrap();
        let got = reader.read_column("s").unwrap();
        assert_eq!(100, got.len());
        assert!(got.iter().all(|v| v.is_null()));

        // Strict mode fails.
        let strict = FileReader::try_new_with_options(
            corrupt,
            ReadOptions {
                strict_dictionary: true,
            },
        )
        .unwrap();
        assert!(matches!(
            strict.read_column("s").unwrap_err(),
            ParquetError::Payload(_)
        ));
    }

    #[test]
    fn duplicate_column_names_resolve_to_first() {
        let file = write_file(
            vec![
                ColumnSpec::new("x", Type::Int32, Repetition::Required),
                ColumnSpec::new("x", Type::Int64, Repetition::Required),
            ],
            &[&[vec![Value::Int32(7)], vec![Value::Int64(8)]]],
        );

        let reader = FileReader::try_new(file).unwrap();
        assert_eq!(Some(0), reader.find_column("x"));
        assert_eq!(vec![Value::Int32(7)], reader.read_column("x").unwrap());
        // By-index access stays exact.
        assert_eq!(
            vec![Value::Int64(8)],
            reader.read_column_by_index(0, 1).unwrap()
        );
    }

    #[test]
    fn usage_errors() {
        let file = write_file(
            vec![ColumnSpec::new("x", Type::Int32, Repetition::Required)],
            &[&[vec![Value::Int32(1)]]],
        );
        let reader = FileReader::try_new(file).unwrap();
        assert!(matches!(
            reader.read_column("missing").unwrap_err(),
            ParquetError::Usage(_)
        ));
        assert!(matches!(
            reader.read_column_by_index(3, 0).unwrap_err(),
            ParquetError::Usage(_)
        ));
        assert!(matches!(
            reader.read_column_by_index(0, 9).unwrap_err(),
            ParquetError::Usage(_)
        ));
        assert!(matches!(
            reader.read_page_data(5).unwrap_err(),
            ParquetError::Usage(_)
        ));
    }

    #[test]
    fn close_is_idempotent_and_write_after_close_fails() {
        let mut buf = Vec::new();
        let mut writer = FileWriter::try_new(
            &mut buf,
            vec![ColumnSpec::new("x", Type::Int32, Repetition::Required)],
        )
        .unwrap();
        writer.write_row_group(&[vec![Value::Int32(1)]]).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(matches!(
            writer.write_row_group(&[vec![Value::Int32(2)]]).unwrap_err(),
            ParquetError::Usage(_)
        ));
    }

    #[test]
    fn drop_closes_implicitly() {
        let mut buf = Vec::new();
        {
            let mut writer = FileWriter::try_new(
                &mut buf,
                vec![ColumnSpec::new("x", Type::Int32, Repetition::Required)],
            )
            .unwrap();
            writer
                .write_row_group(&[vec![Value::Int32(1), Value::Int32(2)]])
                .unwrap();
            // No explicit close.
        }
        let reader = FileReader::try_new(Bytes::from(buf)).unwrap();
        assert_eq!(2, reader.num_rows());
        assert_eq!(
            vec![Value::Int32(1), Value::Int32(2)],
            reader.read_column("x").unwrap()
        );
    }

    #[test]
    fn mismatched_row_group_shape() {
        let mut buf = Vec::new();
        let mut writer = FileWriter::try_new(
            &mut buf,
            vec![ColumnSpec::new("x", Type::Int32, Repetition::Required)],
        )
        .unwrap();
        assert!(matches!(
            writer.write_row_group(&[]).unwrap_err(),
            ParquetError::Usage(_)
        ));
        assert!(matches!(
            writer
                .write_row_group(&[vec![Value::Int32(1)], vec![Value::Int32(2)]])
                .unwrap_err(),
            ParquetError::Usage(_)
        ));
    }

    #[test]
    fn unwritable_types_rejected() {
        let result = FileWriter::try_new(
            Vec::<u8>::new(),
            vec![ColumnSpec::new("t", Type::Int96, Repetition::Required)],
        );
        assert!(matches!(
            result.unwrap_err(),
            ParquetError::Unsupported(_)
        ));
    }

    #[test]
    fn file_backed_roundtrip() {
        let values: Vec<Value> = (0..300).map(Value::Int32).collect();

        let mut file = tempfile::tempfile().unwrap();
        let mut writer = FileWriter::try_new(
            file.try_clone().unwrap(),
            vec![ColumnSpec::new("x", Type::Int32, Repetition::Required)],
        )
        .unwrap();
        writer.write_row_group(&[values.clone()]).unwrap();
        writer.close().unwrap();
        drop(writer);

        let reader = FileReader::try_new(file.try_clone().unwrap()).unwrap();
        assert_eq!(values, reader.read_column("x").unwrap());

        // The same bytes parse through the in-memory path.
        let mut raw = Vec::new();
        use std::io::Seek;
        file.rewind().unwrap();
        file.read_to_end(&mut raw).unwrap();
        let reader = FileReader::try_new(Bytes::from(raw)).unwrap();
        assert_eq!(values, reader.read_column("x").unwrap());
    }
}
