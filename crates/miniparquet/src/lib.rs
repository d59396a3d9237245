//! Reader and writer for uncompressed parquet files.
//!
//! Files are self-describing: a magic sentinel at both ends, a trailing
//! descriptor in the thrift compact protocol, and a body of column
//! chunks split into independently decodable pages. The read path turns
//! a random-access byte source into typed column values; the write path
//! produces byte-compatible files from columnar value buffers.
//!
//! Only the identity compression codec is supported, and statistics,
//! index pages, and the v2 data page layout are tolerated but never
//! decoded.

#[macro_use]
pub mod errors;

pub mod basic;
pub mod column;
pub mod data_type;
pub mod encodings;
pub mod file;
pub mod format;
pub mod schema;
pub mod thrift;
pub mod util;
