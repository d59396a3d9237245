//! Plain-layout value codec.
//!
//! Every physical type has a fixed layout: little-endian integers and
//! floats, byte arrays with a four-byte little-endian length prefix.
//! Booleans on this path occupy a full byte; the bit-packed boolean
//! layout of plain data pages is handled by the page code.

use crate::basic::Type;
use crate::data_type::{ByteArray, Value};
use crate::errors::Result;
use crate::util::cursor::ByteCursor;

/// Decodes one plain-encoded value.
///
/// `type_length` is the schema-declared width for FIXED_LEN_BYTE_ARRAY
/// and is ignored by every other type.
pub fn decode_value(
    cursor: &mut ByteCursor,
    physical_type: Type,
    type_length: Option<i32>,
) -> Result<Value> {
    match physical_type {
        Type::Boolean => Ok(Value::Boolean(cursor.read_u8()? != 0)),
        Type::Int32 => Ok(Value::Int32(cursor.read_i32_le()?)),
        Type::Int64 => Ok(Value::Int64(cursor.read_i64_le()?)),
        Type::Float => Ok(Value::Float(cursor.read_f32_le()?)),
        Type::Double => Ok(Value::Double(cursor.read_f64_le()?)),
        Type::ByteArray => {
            let len = cursor.read_u32_le()? as usize;
            Ok(Value::Bytes(ByteArray::from(cursor.read_slice(len)?)))
        }
        Type::Int96 => {
            let raw = cursor.read_slice(12)?;
            let low = i64::from_le_bytes(raw[0..8].try_into().unwrap());
            let high = i32::from_le_bytes(raw[8..12].try_into().unwrap());
            Ok(Value::Bytes(ByteArray::from(format!("INT96({high}:{low})"))))
        }
        Type::FixedLenByteArray => match type_length {
            Some(len) if len >= 0 => {
                Ok(Value::Bytes(ByteArray::from(cursor.read_slice(len as usize)?)))
            }
            Some(len) => Err(thrift_err!("invalid type_length {}", len)),
            None => Err(unsupported_err!(
                "FIXED_LEN_BYTE_ARRAY requires a type_length"
            )),
        },
    }
}

/// Appends the plain encoding of a single non-null value.
pub fn encode_value(
    value: &Value,
    physical_type: Type,
    type_length: Option<i32>,
    out: &mut Vec<u8>,
) -> Result<()> {
    match (physical_type, value) {
        (Type::Boolean, Value::Boolean(v)) => out.push(*v as u8),
        (Type::Int32, Value::Int32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Type::Int64, Value::Int64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Type::Float, Value::Float(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Type::Double, Value::Double(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Type::ByteArray, Value::Bytes(v)) => {
            out.extend_from_slice(&(v.len() as u32).to_le_bytes());
            out.extend_from_slice(v.as_bytes());
        }
        (Type::FixedLenByteArray, Value::Bytes(v)) => match type_length {
            Some(len) if len as usize == v.len() => out.extend_from_slice(v.as_bytes()),
            Some(len) => {
                return Err(usage_err!(
                    "value of {} bytes does not match type_length {}",
                    v.len(),
                    len
                ));
            }
            None => {
                return Err(unsupported_err!(
                    "FIXED_LEN_BYTE_ARRAY requires a type_length"
                ));
            }
        },
        (Type::Int96, _) => {
            return Err(unsupported_err!("cannot encode {:?} values", physical_type));
        }
        (_, other) => {
            return Err(usage_err!(
                "value {:?} does not match column type {:?}",
                other,
                physical_type
            ));
        }
    }
    Ok(())
}

/// Appends the plain encoding of every non-null value in `values`.
pub fn encode_values(
    values: &[Value],
    physical_type: Type,
    type_length: Option<i32>,
    out: &mut Vec<u8>,
) -> Result<()> {
    for value in values {
        if !value.is_null() {
            encode_value(value, physical_type, type_length, out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ParquetError;

    fn roundtrip(value: Value, physical_type: Type) -> Value {
        let mut buf = Vec::new();
        encode_value(&value, physical_type, None, &mut buf).unwrap();
        let mut cursor = ByteCursor::new(&buf);
        let decoded = decode_value(&mut cursor, physical_type, None).unwrap();
        assert_eq!(0, cursor.remaining());
        decoded
    }

    #[test]
    fn primitive_roundtrips() {
        assert_eq!(
            Value::Boolean(true),
            roundtrip(Value::Boolean(true), Type::Boolean)
        );
        assert_eq!(
            Value::Int32(-12345),
            roundtrip(Value::Int32(-12345), Type::Int32)
        );
        assert_eq!(
            Value::Int64(i64::MIN),
            roundtrip(Value::Int64(i64::MIN), Type::Int64)
        );
        assert_eq!(
            Value::Float(1.5),
            roundtrip(Value::Float(1.5), Type::Float)
        );
        assert_eq!(
            Value::Double(-0.25),
            roundtrip(Value::Double(-0.25), Type::Double)
        );
    }

    #[test]
    fn byte_array_roundtrip() {
        let value = Value::Bytes(ByteArray::from(vec![0u8, 1, 255, 42]));
        assert_eq!(value, roundtrip(value.clone(), Type::ByteArray));

        let empty = Value::Bytes(ByteArray::from(""));
        assert_eq!(empty, roundtrip(empty.clone(), Type::ByteArray));
    }

    #[test]
    fn int96_decodes_to_formatted_string() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&42i64.to_le_bytes());
        buf.extend_from_slice(&7i32.to_le_bytes());
        let mut cursor = ByteCursor::new(&buf);
        let value = decode_value(&mut cursor, Type::Int96, None).unwrap();
        assert_eq!(Some(b"INT96(7:42)".as_slice()), value.as_bytes());
    }

    #[test]
    fn fixed_len_byte_array_roundtrip() {
        let value = Value::Bytes(ByteArray::from("abcd"));
        let mut buf = Vec::new();
        encode_value(&value, Type::FixedLenByteArray, Some(4), &mut buf).unwrap();
        // No length prefix, just the raw bytes.
        assert_eq!(4, buf.len());

        let mut cursor = ByteCursor::new(&buf);
        let decoded = decode_value(&mut cursor, Type::FixedLenByteArray, Some(4)).unwrap();
        assert_eq!(value, decoded);
        assert_eq!(0, cursor.remaining());
    }

    #[test]
    fn fixed_len_byte_array_without_length() {
        let buf = [0u8; 16];
        let mut cursor = ByteCursor::new(&buf);
        assert!(matches!(
            decode_value(&mut cursor, Type::FixedLenByteArray, None).unwrap_err(),
            ParquetError::Unsupported(_)
        ));

        let mut out = Vec::new();
        assert!(matches!(
            encode_value(
                &Value::Bytes(ByteArray::from("ab")),
                Type::FixedLenByteArray,
                None,
                &mut out
            )
            .unwrap_err(),
            ParquetError::Unsupported(_)
        ));
    }

    #[test]
    fn fixed_len_byte_array_length_mismatch() {
        let mut out = Vec::new();
        assert!(matches!(
            encode_value(
                &Value::Bytes(ByteArray::from("abc")),
                Type::FixedLenByteArray,
                Some(4),
                &mut out
            )
            .unwrap_err(),
            ParquetError::Usage(_)
        ));
    }

    #[test]
    fn mismatched_value_is_usage_error() {
        let mut buf = Vec::new();
        assert!(matches!(
            encode_value(&Value::Int32(1), Type::Int64, None, &mut buf).unwrap_err(),
            ParquetError::Usage(_)
        ));
    }

    #[test]
    fn encode_values_skips_nulls() {
        let values = vec![Value::Int32(1), Value::Null, Value::Int32(2)];
        let mut buf = Vec::new();
        encode_values(&values, Type::Int32, None, &mut buf).unwrap();
        assert_eq!(8, buf.len());
    }
}
