//! Wire structs for the file descriptor and page headers.
//!
//! Deserialization is field-id driven: each struct loops over field
//! headers and recursively skips anything it does not know, so readers
//! stay forward compatible with newer writers. Serialization mirrors it,
//! emitting only fields that are present.

use crate::basic::{Compression, ConvertedType, Encoding, PageType, Repetition, Type};
use crate::errors::Result;
use crate::thrift::{CompactType, ThriftReader, ThriftWriter};

/// One node of the flat pre-order schema list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaElement {
    pub physical_type: Option<Type>,
    pub type_length: Option<i32>,
    pub repetition: Option<Repetition>,
    pub name: String,
    pub num_children: Option<i32>,
    pub converted_type: Option<ConvertedType>,
    pub scale: Option<i32>,
    pub precision: Option<i32>,
    pub field_id: Option<i32>,
}

impl SchemaElement {
    pub fn read_from(reader: &mut ThriftReader) -> Result<Self> {
        let mut elem = SchemaElement::default();
        while let Some(header) = reader.read_field_begin()? {
            match header.id {
                1 => elem.physical_type = Some(Type::try_from(reader.read_i32()?)?),
                2 => elem.type_length = Some(reader.read_i32()?),
                3 => elem.repetition = Some(Repetition::try_from(reader.read_i32()?)?),
                4 => elem.name = reader.read_string()?,
                5 => elem.num_children = Some(reader.read_i32()?),
                6 => elem.converted_type = Some(ConvertedType::try_from(reader.read_i32()?)?),
                7 => elem.scale = Some(reader.read_i32()?),
                8 => elem.precision = Some(reader.read_i32()?),
                9 => elem.field_id = Some(reader.read_i32()?),
                _ => reader.skip(header.field_type)?,
            }
        }
        Ok(elem)
    }

    pub fn write_to(&self, w: &mut ThriftWriter) {
        if let Some(t) = self.physical_type {
            w.write_i32(1, t as i32);
        }
        if let Some(l) = self.type_length {
            w.write_i32(2, l);
        }
        if let Some(r) = self.repetition {
            w.write_i32(3, r as i32);
        }
        w.write_binary(4, self.name.as_bytes());
        if let Some(n) = self.num_children {
            w.write_i32(5, n);
        }
        if let Some(c) = self.converted_type {
            w.write_i32(6, c as i32);
        }
        if let Some(s) = self.scale {
            w.write_i32(7, s);
        }
        if let Some(p) = self.precision {
            w.write_i32(8, p);
        }
        if let Some(id) = self.field_id {
            w.write_i32(9, id);
        }
    }
}

/// Metadata of one column chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetaData {
    pub physical_type: Type,
    pub encodings: Vec<Encoding>,
    pub path_in_schema: Vec<String>,
    pub codec: Compression,
    pub num_values: i64,
    pub total_uncompressed_size: i64,
    pub total_compressed_size: i64,
    pub data_page_offset: i64,
    pub index_page_offset: Option<i64>,
    pub dictionary_page_offset: Option<i64>,
}

impl Default for ColumnMetaData {
    fn default() -> Self {
        ColumnMetaData {
            physical_type: Type::Int32,
            encodings: Vec::new(),
            path_in_schema: Vec::new(),
            codec: Compression::Uncompressed,
            num_values: 0,
            total_uncompressed_size: 0,
            total_compressed_size: 0,
            data_page_offset: 0,
            index_page_offset: None,
            dictionary_page_offset: None,
        }
    }
}

impl ColumnMetaData {
    pub fn read_from(reader: &mut ThriftReader) -> Result<Self> {
        let mut meta = ColumnMetaData::default();
        while let Some(header) = reader.read_field_begin()? {
            match header.id {
                1 => meta.physical_type = Type::try_from(reader.read_i32()?)?,
                2 => {
                    let (_, count) = reader.read_list_begin()?;
                    for _ in 0..count {
                        meta.encodings.push(Encoding::try_from(reader.read_i32()?)?);
                    }
                }
                3 => {
                    let (_, count) = reader.read_list_begin()?;
                    for _ in 0..count {
                        meta.path_in_schema.push(reader.read_string()?);
                    }
                }
                4 => meta.codec = Compression::try_from(reader.read_i32()?)?,
                5 => meta.num_values = reader.read_i64()?,
                6 => meta.total_uncompressed_size = reader.read_i64()?,
                7 => meta.total_compressed_size = reader.read_i64()?,
                9 => meta.data_page_offset = reader.read_i64()?,
                10 => meta.index_page_offset = Some(reader.read_i64()?),
                11 => meta.dictionary_page_offset = Some(reader.read_i64()?),
                _ => reader.skip(header.field_type)?,
            }
        }
        Ok(meta)
    }

    pub fn write_to(&self, w: &mut ThriftWriter) {
        w.write_i32(1, self.physical_type as i32);
        w.write_list_begin(2, CompactType::I32, self.encodings.len());
        for encoding in &self.encodings {
            w.write_zigzag_raw(*encoding as i32 as i64);
        }
        w.write_list_begin(3, CompactType::Binary, self.path_in_schema.len());
        for part in &self.path_in_schema {
            w.write_varint_raw(part.len() as u64);
            w.write_raw(part.as_bytes());
        }
        w.write_i32(4, self.codec as i32);
        w.write_i64(5, self.num_values);
        w.write_i64(6, self.total_uncompressed_size);
        w.write_i64(7, self.total_compressed_size);
        w.write_i64(9, self.data_page_offset);
        if let Some(off) = self.index_page_offset {
            w.write_i64(10, off);
        }
        if let Some(off) = self.dictionary_page_offset {
            w.write_i64(11, off);
        }
    }
}

/// A column chunk entry of a row group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnChunk {
    pub file_path: Option<String>,
    pub file_offset: i64,
    pub meta_data: Option<ColumnMetaData>,
}

impl ColumnChunk {
    pub fn read_from(reader: &mut ThriftReader) -> Result<Self> {
        let mut chunk = ColumnChunk::default();
        while let Some(header) = reader.read_field_begin()? {
            match header.id {
                1 => chunk.file_path = Some(reader.read_string()?),
                2 => chunk.file_offset = reader.read_i64()?,
                3 => {
                    reader.read_struct_begin();
                    chunk.meta_data = Some(ColumnMetaData::read_from(reader)?);
                    reader.read_struct_end();
                }
                _ => reader.skip(header.field_type)?,
            }
        }
        Ok(chunk)
    }

    pub fn write_to(&self, w: &mut ThriftWriter) {
        if let Some(path) = &self.file_path {
            w.write_binary(1, path.as_bytes());
        }
        w.write_i64(2, self.file_offset);
        if let Some(meta) = &self.meta_data {
            w.write_struct_begin(3);
            meta.write_to(w);
            w.write_struct_end();
        }
    }
}

/// Sub-header of a v1 data page.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub definition_level_encoding: Encoding,
    pub repetition_level_encoding: Encoding,
}

impl Default for DataPageHeader {
    fn default() -> Self {
        DataPageHeader {
            num_values: 0,
            encoding: Encoding::Plain,
            definition_level_encoding: Encoding::Rle,
            repetition_level_encoding: Encoding::Rle,
        }
    }
}

impl DataPageHeader {
    pub fn read_from(reader: &mut ThriftReader) -> Result<Self> {
        let mut header = DataPageHeader::default();
        while let Some(field) = reader.read_field_begin()? {
            match field.id {
                1 => header.num_values = reader.read_i32()?,
                2 => header.encoding = Encoding::try_from(reader.read_i32()?)?,
                3 => {
                    header.definition_level_encoding = Encoding::try_from(reader.read_i32()?)?;
                }
                4 => {
                    header.repetition_level_encoding = Encoding::try_from(reader.read_i32()?)?;
                }
                _ => reader.skip(field.field_type)?,
            }
        }
        Ok(header)
    }

    pub fn write_to(&self, w: &mut ThriftWriter) {
        w.write_i32(1, self.num_values);
        w.write_i32(2, self.encoding as i32);
        w.write_i32(3, self.definition_level_encoding as i32);
        w.write_i32(4, self.repetition_level_encoding as i32);
    }
}

/// Sub-header of a dictionary page.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub is_sorted: bool,
}

impl Default for DictionaryPageHeader {
    fn default() -> Self {
        DictionaryPageHeader {
            num_values: 0,
            encoding: Encoding::PlainDictionary,
            is_sorted: false,
        }
    }
}

impl DictionaryPageHeader {
    pub fn read_from(reader: &mut ThriftReader) -> Result<Self> {
        let mut header = DictionaryPageHeader::default();
        while let Some(field) = reader.read_field_begin()? {
            match field.id {
                1 => header.num_values = reader.read_i32()?,
                2 => header.encoding = Encoding::try_from(reader.read_i32()?)?,
                3 => header.is_sorted = reader.read_bool(field),
                _ => reader.skip(field.field_type)?,
            }
        }
        Ok(header)
    }

    pub fn write_to(&self, w: &mut ThriftWriter) {
        w.write_i32(1, self.num_values);
        w.write_i32(2, self.encoding as i32);
        if self.is_sorted {
            w.write_bool(3, true);
        }
    }
}

/// Header preceding every page.
///
/// Exactly one of the sub-headers is present for the page kinds this
/// crate decodes. The v2 data page sub-header (field 8) is tolerated and
/// skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub crc: Option<i32>,
    pub data_page_header: Option<DataPageHeader>,
    pub dictionary_page_header: Option<DictionaryPageHeader>,
}

impl Default for PageHeader {
    fn default() -> Self {
        PageHeader {
            page_type: PageType::DataPage,
            uncompressed_page_size: 0,
            compressed_page_size: 0,
            crc: None,
            data_page_header: None,
            dictionary_page_header: None,
        }
    }
}

impl PageHeader {
    pub fn read_from(reader: &mut ThriftReader) -> Result<Self> {
        let mut header = PageHeader::default();
        while let Some(field) = reader.read_field_begin()? {
            match field.id {
                1 => header.page_type = PageType::try_from(reader.read_i32()?)?,
                2 => header.uncompressed_page_size = reader.read_i32()?,
                3 => header.compressed_page_size = reader.read_i32()?,
                4 => header.crc = Some(reader.read_i32()?),
                5 => {
                    reader.read_struct_begin();
                    header.data_page_header = Some(DataPageHeader::read_from(reader)?);
                    reader.read_struct_end();
                }
                7 => {
                    reader.read_struct_begin();
                    header.dictionary_page_header = Some(DictionaryPageHeader::read_from(reader)?);
                    reader.read_struct_end();
                }
                _ => reader.skip(field.field_type)?,
            }
        }
        Ok(header)
    }

    pub fn write_to(&self, w: &mut ThriftWriter) {
        w.write_i32(1, self.page_type as i32);
        w.write_i32(2, self.uncompressed_page_size);
        w.write_i32(3, self.compressed_page_size);
        if let Some(crc) = self.crc {
            w.write_i32(4, crc);
        }
        if let Some(header) = &self.data_page_header {
            w.write_struct_begin(5);
            header.write_to(w);
            w.write_struct_end();
        }
        if let Some(header) = &self.dictionary_page_header {
            w.write_struct_begin(7);
            header.write_to(w);
            w.write_struct_end();
        }
    }

    /// Serializes this header followed by the page payload.
    pub fn encode_with_payload(&self, payload: &[u8]) -> Vec<u8> {
        let mut w = ThriftWriter::new();
        self.write_to(&mut w);
        w.write_stop();
        let mut out = w.into_bytes();
        out.extend_from_slice(payload);
        out
    }
}

/// A horizontal partition of the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowGroup {
    pub columns: Vec<ColumnChunk>,
    pub total_byte_size: i64,
    pub num_rows: i64,
}

impl RowGroup {
    pub fn read_from(reader: &mut ThriftReader) -> Result<Self> {
        let mut rg = RowGroup::default();
        while let Some(header) = reader.read_field_begin()? {
            match header.id {
                1 => {
                    let (_, count) = reader.read_list_begin()?;
                    for _ in 0..count {
                        reader.read_struct_begin();
                        rg.columns.push(ColumnChunk::read_from(reader)?);
                        reader.read_struct_end();
                    }
                }
                2 => rg.total_byte_size = reader.read_i64()?,
                3 => rg.num_rows = reader.read_i64()?,
                _ => reader.skip(header.field_type)?,
            }
        }
        Ok(rg)
    }

    pub fn write_to(&self, w: &mut ThriftWriter) {
        w.write_list_begin(1, CompactType::Struct, self.columns.len());
        for chunk in &self.columns {
            w.push_field_state();
            chunk.write_to(w);
            w.write_stop();
            w.pop_field_state();
        }
        w.write_i64(2, self.total_byte_size);
        w.write_i64(3, self.num_rows);
    }
}

/// Free-form key/value metadata. Tolerated on read, never written by the
/// writer in this crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

impl KeyValue {
    pub fn read_from(reader: &mut ThriftReader) -> Result<Self> {
        let mut kv = KeyValue::default();
        while let Some(header) = reader.read_field_begin()? {
            match header.id {
                1 => kv.key = reader.read_string()?,
                2 => kv.value = Some(reader.read_string()?),
                _ => reader.skip(header.field_type)?,
            }
        }
        Ok(kv)
    }

    pub fn write_to(&self, w: &mut ThriftWriter) {
        w.write_binary(1, self.key.as_bytes());
        if let Some(value) = &self.value {
            w.write_binary(2, value.as_bytes());
        }
    }
}

/// The trailing file descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetaData {
    pub version: i32,
    /// Pre-order schema list, index 0 is the synthetic root.
    pub schema: Vec<SchemaElement>,
    pub num_rows: i64,
    pub row_groups: Vec<RowGroup>,
    pub key_value_metadata: Option<Vec<KeyValue>>,
    pub created_by: Option<String>,
}

impl FileMetaData {
    pub fn read_from(reader: &mut ThriftReader) -> Result<Self> {
        let mut meta = FileMetaData::default();
        while let Some(header) = reader.read_field_begin()? {
            match header.id {
                1 => meta.version = reader.read_i32()?,
                2 => {
                    let (_, count) = reader.read_list_begin()?;
                    for _ in 0..count {
                        reader.read_struct_begin();
                        meta.schema.push(SchemaElement::read_from(reader)?);
                        reader.read_struct_end();
                    }
                }
                3 => meta.num_rows = reader.read_i64()?,
                4 => {
                    let (_, count) = reader.read_list_begin()?;
                    for _ in 0..count {
                        reader.read_struct_begin();
                        meta.row_groups.push(RowGroup::read_from(reader)?);
                        reader.read_struct_end();
                    }
                }
                5 => {
                    let (_, count) = reader.read_list_begin()?;
                    let mut kvs = Vec::with_capacity(count);
                    for _ in 0..count {
                        reader.read_struct_begin();
                        kvs.push(KeyValue::read_from(reader)?);
                        reader.read_struct_end();
                    }
                    meta.key_value_metadata = Some(kvs);
                }
                6 => meta.created_by = Some(reader.read_string()?),
                _ => reader.skip(header.field_type)?,
            }
        }
        Ok(meta)
    }

    pub fn write_to(&self, w: &mut ThriftWriter) {
        w.write_i32(1, self.version);
        w.write_list_begin(2, CompactType::Struct, self.schema.len());
        for elem in &self.schema {
            w.push_field_state();
            elem.write_to(w);
            w.write_stop();
            w.pop_field_state();
        }
        w.write_i64(3, self.num_rows);
        w.write_list_begin(4, CompactType::Struct, self.row_groups.len());
        for rg in &self.row_groups {
            w.push_field_state();
            rg.write_to(w);
            w.write_stop();
            w.pop_field_state();
        }
        if let Some(kvs) = &self.key_value_metadata {
            w.write_list_begin(5, CompactType::Struct, kvs.len());
            for kv in kvs {
                w.push_field_state();
                kv.write_to(w);
                w.write_stop();
                w.pop_field_state();
            }
        }
        if let Some(created_by) = &self.created_by {
            w.write_binary(6, created_by.as_bytes());
        }
    }
}
