//! File reading: the random-access byte source contract and the
//! top-level reader.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use bytes::Bytes;
use hashbrown::HashMap;
use tracing::debug;

use crate::basic::Type;
use crate::column::reader::{ColumnReader, PageResult};
use crate::column::strings::StringColumnIterator;
use crate::data_type::Value;
use crate::errors::Result;
use crate::file::footer::{decode_footer, decode_metadata};
use crate::file::page_index::{build_page_index, PageIndexEntry, PageIterator};
use crate::file::{FOOTER_SIZE, MAGIC, MIN_FILE_SIZE};
use crate::format::FileMetaData;
use crate::schema::types::{project_leaves, ColumnInfo};

/// Random-access byte source.
///
/// Implementations must satisfy any range within `[0, len())`. Sources
/// are treated as cold storage: reads may incur seeks, so callers batch
/// at page granularity.
pub trait ChunkReader {
    /// Total length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the exact range `[start, start + length)` as an owned
    /// buffer.
    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes>;
}

impl ChunkReader for Bytes {
    fn len(&self) -> u64 {
        Bytes::len(self) as u64
    }

    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        let start = start as usize;
        let end = start.saturating_add(length);
        if end > Bytes::len(self) {
            return Err(eof_err!(
                "range {}..{} out of bounds for buffer of {} bytes",
                start,
                end,
                Bytes::len(self)
            ));
        }
        Ok(self.slice(start..end))
    }
}

impl ChunkReader for File {
    fn len(&self) -> u64 {
        self.metadata().map(|m| m.len()).unwrap_or(0)
    }

    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        let mut file = self.try_clone()?;
        file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; length];
        file.read_exact(&mut buf)?;
        Ok(buf.into())
    }
}

/// Options controlling how strictly pages are decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Fail on out-of-range dictionary indices instead of substituting
    /// null.
    pub strict_dictionary: bool,
}

/// Reader over a complete file.
///
/// Opening decodes the descriptor, projects leaf columns, and builds the
/// global page index. Everything after that is on-demand.
#[derive(Debug)]
pub struct FileReader<R: ChunkReader> {
    input: R,
    file_len: u64,
    metadata: FileMetaData,
    columns: Vec<ColumnInfo>,
    columns_by_name: HashMap<String, usize>,
    page_index: Vec<PageIndexEntry>,
    options: ReadOptions,
}

impl<R: ChunkReader> FileReader<R> {
    pub fn try_new(input: R) -> Result<Self> {
        Self::try_new_with_options(input, ReadOptions::default())
    }

    pub fn try_new_with_options(input: R, options: ReadOptions) -> Result<Self> {
        let file_len = input.len();
        if file_len < MIN_FILE_SIZE as u64 {
            return Err(envelope_err!("file of {} bytes is too small", file_len));
        }

        let head = input.get_bytes(0, MAGIC.len())?;
        if head[..] != MAGIC {
            return Err(envelope_err!("missing magic at start of file"));
        }

        let frame = input.get_bytes(file_len - FOOTER_SIZE as u64, FOOTER_SIZE)?;
        let frame: [u8; FOOTER_SIZE] = frame[..].try_into().unwrap();
        let metadata_len = decode_footer(&frame)?;
        if metadata_len + FOOTER_SIZE + MAGIC.len() > file_len as usize {
            return Err(envelope_err!(
                "descriptor of {} bytes does not fit a file of {} bytes",
                metadata_len,
                file_len
            ));
        }

        let metadata_start = file_len - FOOTER_SIZE as u64 - metadata_len as u64;
        let buf = input.get_bytes(metadata_start, metadata_len)?;
        let metadata = decode_metadata(&buf)?;
        debug!(
            descriptor_len = metadata_len,
            num_row_groups = metadata.row_groups.len(),
            num_rows = metadata.num_rows,
            "opened file"
        );

        let columns = project_leaves(&metadata.schema);
        let mut columns_by_name = HashMap::with_capacity(columns.len());
        for (idx, col) in columns.iter().enumerate() {
            // First leaf wins for duplicated names; by-index access stays
            // exact.
            columns_by_name.entry(col.name.clone()).or_insert(idx);
        }

        let page_index = build_page_index(&input, &metadata)?;

        Ok(FileReader {
            input,
            file_len,
            metadata,
            columns,
            columns_by_name,
            page_index,
            options,
        })
    }

    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    pub fn options(&self) -> ReadOptions {
        self.options
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn num_rows(&self) -> i64 {
        self.metadata.num_rows
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.row_groups.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, col_idx: usize) -> Result<&ColumnInfo> {
        self.columns
            .get(col_idx)
            .ok_or_else(|| usage_err!("column index {} out of range", col_idx))
    }

    pub fn column_by_name(&self, name: &str) -> Result<&ColumnInfo> {
        let idx = self
            .find_column(name)
            .ok_or_else(|| usage_err!("column not found: {}", name))?;
        Ok(&self.columns[idx])
    }

    /// Index of the first leaf with this name, if any.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns_by_name.get(name).copied()
    }

    /// Reads a column across all row groups.
    pub fn read_column(&self, name: &str) -> Result<Vec<Value>> {
        let col_idx = self
            .find_column(name)
            .ok_or_else(|| usage_err!("column not found: {}", name))?;
        let mut result = Vec::new();
        for rg_idx in 0..self.metadata.row_groups.len() {
            result.extend(self.read_column_by_index(rg_idx, col_idx)?);
        }
        Ok(result)
    }

    pub fn read_column_in_row_group(&self, name: &str, row_group_idx: usize) -> Result<Vec<Value>> {
        let col_idx = self
            .find_column(name)
            .ok_or_else(|| usage_err!("column not found: {}", name))?;
        self.read_column_by_index(row_group_idx, col_idx)
    }

    pub fn read_column_by_index(&self, row_group_idx: usize, col_idx: usize) -> Result<Vec<Value>> {
        self.column_reader(row_group_idx, col_idx)?.read_all()
    }

    /// Reads a column chunk page by page, preserving page boundaries.
    pub fn read_pages(&self, row_group_idx: usize, col_idx: usize) -> Result<Vec<PageResult>> {
        self.column_reader(row_group_idx, col_idx)?.read_pages()
    }

    /// Reader over one `(row group, column)` chunk.
    pub fn column_reader(
        &self,
        row_group_idx: usize,
        col_idx: usize,
    ) -> Result<ColumnReader<'_, R>> {
        let rg = self
            .metadata
            .row_groups
            .get(row_group_idx)
            .ok_or_else(|| usage_err!("row group index {} out of range", row_group_idx))?;
        let info = self.column(col_idx)?;
        let chunk = rg
            .columns
            .get(info.column_index)
            .ok_or_else(|| usage_err!("row group has no chunk for column {}", col_idx))?;
        ColumnReader::try_new(&self.input, self.file_len, chunk, info, self.options)
    }

    /// Streaming iterator over a BYTE_ARRAY column.
    pub fn column_iterator(&self, name: &str) -> Result<StringColumnIterator<'_, R>> {
        let col_idx = self
            .find_column(name)
            .ok_or_else(|| usage_err!("column not found: {}", name))?;
        let info = &self.columns[col_idx];
        if info.physical_type != Type::ByteArray {
            return Err(usage_err!(
                "column '{}' is not BYTE_ARRAY (type: {:?})",
                name,
                info.physical_type
            ));
        }
        StringColumnIterator::try_new(self, col_idx)
    }

    pub fn num_pages(&self) -> usize {
        self.page_index.len()
    }

    pub fn page_index_entry(&self, page_id: usize) -> Result<PageIndexEntry> {
        self.page_index
            .get(page_id)
            .copied()
            .ok_or_else(|| usage_err!("page id {} out of range", page_id))
    }

    /// Reads one page's payload by global id.
    pub fn read_page_data(&self, page_id: usize) -> Result<Bytes> {
        let entry = self.page_index_entry(page_id)?;
        self.read_range(entry.data_offset, entry.data_size)
    }

    /// Concatenates the payloads of pages `start_page_id..=end_page_id`,
    /// capped at `max_bytes`.
    pub fn read_pages_chunk(
        &self,
        start_page_id: usize,
        end_page_id: usize,
        max_bytes: usize,
    ) -> Result<Vec<u8>> {
        if start_page_id >= self.page_index.len() {
            return Err(usage_err!("start page id {} out of range", start_page_id));
        }
        if end_page_id >= self.page_index.len() {
            return Err(usage_err!("end page id {} out of range", end_page_id));
        }
        if start_page_id > end_page_id {
            return Err(usage_err!("start page id must be <= end page id"));
        }

        let mut out = Vec::new();
        for page_id in start_page_id..=end_page_id {
            let entry = self.page_index[page_id];
            let remaining = max_bytes - out.len();
            if remaining == 0 {
                break;
            }
            let to_read = entry.data_size.min(remaining);
            let data = self.read_range(entry.data_offset, to_read)?;
            out.extend_from_slice(&data);
        }
        Ok(out)
    }

    pub fn page_iterator(&self) -> PageIterator<'_, R> {
        PageIterator::new(self, 0, self.page_index.len())
    }

    pub fn page_iterator_range(&self, start: usize, end: usize) -> Result<PageIterator<'_, R>> {
        if start > self.page_index.len() {
            return Err(usage_err!("start page id {} out of range", start));
        }
        if end > self.page_index.len() {
            return Err(usage_err!("end page id {} out of range", end));
        }
        if start > end {
            return Err(usage_err!("start page id must be <= end page id"));
        }
        Ok(PageIterator::new(self, start, end))
    }

    /// Raw positioned read through the underlying source.
    pub fn read_range(&self, offset: u64, length: usize) -> Result<Bytes> {
        self.input.get_bytes(offset, length)
    }
}
