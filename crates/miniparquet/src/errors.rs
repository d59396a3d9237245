//! Error types used across the crate.

use std::io;

/// Convenience result alias.
pub type Result<T, E = ParquetError> = std::result::Result<T, E>;

/// Errors that can be produced while reading or writing a file.
#[derive(Debug, thiserror::Error)]
pub enum ParquetError {
    /// The underlying byte source or sink failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Ran off the end of a buffer while decoding.
    #[error("Unexpected EOF: {0}")]
    Eof(String),
    /// Magic sentinel missing or footer framing is nonsensical.
    #[error("Invalid file envelope: {0}")]
    Envelope(String),
    /// Thrift compact protocol data that does not decode.
    #[error("Malformed thrift: {0}")]
    Thrift(String),
    /// Page data that does not decode as its header claims.
    #[error("Malformed page payload: {0}")]
    Payload(String),
    /// Feature of the format this crate does not implement.
    #[error("Unsupported: {0}")]
    Unsupported(String),
    /// Caller misuse of the API.
    #[error("Usage error: {0}")]
    Usage(String),
}

macro_rules! eof_err {
    ($fmt:expr) => ($crate::errors::ParquetError::Eof($fmt.to_string()));
    ($fmt:expr, $($args:expr),*) => ($crate::errors::ParquetError::Eof(format!($fmt, $($args),*)));
}

macro_rules! envelope_err {
    ($fmt:expr) => ($crate::errors::ParquetError::Envelope($fmt.to_string()));
    ($fmt:expr, $($args:expr),*) => ($crate::errors::ParquetError::Envelope(format!($fmt, $($args),*)));
}

macro_rules! thrift_err {
    ($fmt:expr) => ($crate::errors::ParquetError::Thrift($fmt.to_string()));
    ($fmt:expr, $($args:expr),*) => ($crate::errors::ParquetError::Thrift(format!($fmt, $($args),*)));
}

macro_rules! payload_err {
    ($fmt:expr) => ($crate::errors::ParquetError::Payload($fmt.to_string()));
    ($fmt:expr, $($args:expr),*) => ($crate::errors::ParquetError::Payload(format!($fmt, $($args),*)));
}

macro_rules! unsupported_err {
    ($fmt:expr) => ($crate::errors::ParquetError::Unsupported($fmt.to_string()));
    ($fmt:expr, $($args:expr),*) => ($crate::errors::ParquetError::Unsupported(format!($fmt, $($args),*)));
}

macro_rules! usage_err {
    ($fmt:expr) => ($crate::errors::ParquetError::Usage($fmt.to_string()));
    ($fmt:expr, $($args:expr),*) => ($crate::errors::ParquetError::Usage(format!($fmt, $($args),*)));
}
