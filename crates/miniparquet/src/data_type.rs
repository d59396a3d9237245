//! Decoded column values.

use bytes::Bytes;

use crate::errors::{ParquetError, Result};

/// Owned byte-array payload.
///
/// Clones are cheap, the underlying bytes are shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteArray {
    data: Bytes,
}

impl ByteArray {
    pub fn new(data: Bytes) -> Self {
        ByteArray { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// View the bytes as utf8.
    pub fn as_utf8(&self) -> Result<&str> {
        std::str::from_utf8(&self.data)
            .map_err(|e| ParquetError::Usage(format!("byte array is not valid utf8: {e}")))
    }
}

impl From<Vec<u8>> for ByteArray {
    fn from(data: Vec<u8>) -> Self {
        ByteArray { data: data.into() }
    }
}

impl From<&[u8]> for ByteArray {
    fn from(data: &[u8]) -> Self {
        ByteArray {
            data: Bytes::copy_from_slice(data),
        }
    }
}

impl From<&str> for ByteArray {
    fn from(data: &str) -> Self {
        ByteArray {
            data: Bytes::copy_from_slice(data.as_bytes()),
        }
    }
}

impl From<String> for ByteArray {
    fn from(data: String) -> Self {
        ByteArray {
            data: data.into_bytes().into(),
        }
    }
}

/// A single decoded column value.
///
/// Byte-array values own their bytes, so decoded values outlive the page
/// buffer they came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Bytes(ByteArray),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v.as_bytes()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Bytes(v.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_array_utf8() {
        let b = ByteArray::from("hello");
        assert_eq!(5, b.len());
        assert_eq!("hello", b.as_utf8().unwrap());

        let bad = ByteArray::from(vec![0xff, 0xfe]);
        assert!(bad.as_utf8().is_err());
    }

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert_eq!(Some(3), Value::Int32(3).as_i32());
        assert_eq!(None, Value::Int32(3).as_i64());
        assert_eq!(Some(b"hi".as_slice()), Value::from("hi").as_bytes());
    }
}
