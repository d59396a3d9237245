//! File-level APIs: envelope framing, readers, writers, and the page
//! index.

pub mod footer;
pub mod page_index;
pub mod reader;
pub mod writer;

/// Magic bytes at both ends of a file.
pub const MAGIC: [u8; 4] = *b"PAR1";

/// Trailing frame: little-endian descriptor length plus the magic.
pub const FOOTER_SIZE: usize = 8;

/// Smallest possible file: leading magic plus the trailing frame.
pub const MIN_FILE_SIZE: usize = MAGIC.len() + FOOTER_SIZE;

/// Bounded lookahead used when decoding a page header, so reading a
/// header never pulls in a whole page body.
pub(crate) const HEADER_WINDOW_SIZE: usize = 256;
