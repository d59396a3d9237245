//! Global index of data pages, built in one forward walk over every
//! column chunk.
//!
//! Only data pages get an index entry (and with it a global page id).
//! Dictionary pages are discovered and consumed by the column reader in
//! stream order, never by random access.

use bytes::Bytes;
use tracing::debug;

use crate::basic::PageType;
use crate::errors::Result;
use crate::file::reader::{ChunkReader, FileReader};
use crate::file::HEADER_WINDOW_SIZE;
use crate::format::{FileMetaData, PageHeader};
use crate::thrift::ThriftReader;

/// Location of one data page's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageIndexEntry {
    /// Absolute file offset of the payload, after the page header.
    pub data_offset: u64,
    /// Payload length in bytes (the header's compressed size).
    pub data_size: usize,
    pub row_group_idx: usize,
    pub column_idx: usize,
}

pub(crate) fn build_page_index<R: ChunkReader>(
    input: &R,
    metadata: &FileMetaData,
) -> Result<Vec<PageIndexEntry>> {
    let file_len = input.len();
    let mut index = Vec::new();

    for (rg_idx, rg) in metadata.row_groups.iter().enumerate() {
        for (col_idx, chunk) in rg.columns.iter().enumerate() {
            let Some(meta) = &chunk.meta_data else {
                continue;
            };

            let mut start = meta.data_page_offset;
            if let Some(dict_offset) = meta.dictionary_page_offset {
                start = start.min(dict_offset);
            }
            if start < 0 {
                return Err(payload_err!("negative page offset {}", start));
            }
            // The chunk covers exactly total_compressed_size bytes from
            // its first page; the bound keeps chunks whose pages carry no
            // usable value counts (v2 pages are skipped, not decoded)
            // from running into the next chunk.
            let chunk_end = (start + meta.total_compressed_size.max(0)) as u64;

            let mut offset = start as u64;
            let mut values_read: i64 = 0;

            while values_read < meta.num_values && offset < chunk_end && offset < file_len {
                let window = HEADER_WINDOW_SIZE.min((file_len - offset) as usize);
                let buf = input.get_bytes(offset, window)?;
                let mut header_reader = ThriftReader::new(&buf);
                let header = PageHeader::read_from(&mut header_reader)?;
                offset += header_reader.position() as u64;

                if header.compressed_page_size < 0 {
                    return Err(payload_err!(
                        "negative page size {}",
                        header.compressed_page_size
                    ));
                }
                let page_size = header.compressed_page_size as usize;

                match header.page_type {
                    PageType::DataPage | PageType::DataPageV2 => {
                        index.push(PageIndexEntry {
                            data_offset: offset,
                            data_size: page_size,
                            row_group_idx: rg_idx,
                            column_idx: col_idx,
                        });
                        if header.page_type == PageType::DataPage {
                            if let Some(dph) = &header.data_page_header {
                                values_read += dph.num_values as i64;
                            }
                        }
                    }
                    // Dictionary and index pages get no global id.
                    _ => {}
                }

                offset += page_size as u64;
            }
        }
    }

    debug!(num_pages = index.len(), "built page index");
    Ok(index)
}

/// A page payload handed out by [`PageIterator`].
#[derive(Debug, Clone)]
pub struct RawPage {
    pub page_id: usize,
    pub row_group_idx: usize,
    pub column_idx: usize,
    pub data: Bytes,
}

/// Cursor over a range of the page index. Restartable via [`reset`].
///
/// [`reset`]: PageIterator::reset
#[derive(Debug)]
pub struct PageIterator<'a, R: ChunkReader> {
    reader: &'a FileReader<R>,
    start: usize,
    end: usize,
    current: usize,
}

impl<'a, R: ChunkReader> PageIterator<'a, R> {
    pub(crate) fn new(reader: &'a FileReader<R>, start: usize, end: usize) -> Self {
        PageIterator {
            reader,
            start,
            end,
            current: start,
        }
    }

    pub fn has_next(&self) -> bool {
        self.current < self.end
    }

    pub fn next(&mut self) -> Result<RawPage> {
        if !self.has_next() {
            return Err(usage_err!("page iterator is exhausted"));
        }
        let entry = self.reader.page_index_entry(self.current)?;
        let data = self.reader.read_range(entry.data_offset, entry.data_size)?;
        let page = RawPage {
            page_id: self.current,
            row_group_idx: entry.row_group_idx,
            column_idx: entry.column_idx,
            data,
        };
        self.current += 1;
        Ok(page)
    }

    pub fn reset(&mut self) {
        self.current = self.start;
    }
}
