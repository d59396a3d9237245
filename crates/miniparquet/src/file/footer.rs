//! Envelope decode helpers.

use crate::errors::Result;
use crate::file::MAGIC;
use crate::format::FileMetaData;
use crate::thrift::ThriftReader;

/// Decodes the trailing 8-byte frame, returning the descriptor length.
pub fn decode_footer(frame: &[u8; 8]) -> Result<usize> {
    if frame[4..] != MAGIC {
        return Err(envelope_err!("missing magic at end of file"));
    }
    let len = u32::from_le_bytes(frame[0..4].try_into().unwrap());
    Ok(len as usize)
}

/// Decodes the descriptor from its exact byte range.
pub fn decode_metadata(buf: &[u8]) -> Result<FileMetaData> {
    let mut reader = ThriftReader::new(buf);
    FileMetaData::read_from(&mut reader)
}
