//! Enums mirroring the wire-level constants of the format.

use crate::errors::{ParquetError, Result};

/// Physical types representable in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Boolean = 0,
    Int32 = 1,
    Int64 = 2,
    Int96 = 3,
    Float = 4,
    Double = 5,
    ByteArray = 6,
    FixedLenByteArray = 7,
}

impl TryFrom<i32> for Type {
    type Error = ParquetError;

    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Type::Boolean,
            1 => Type::Int32,
            2 => Type::Int64,
            3 => Type::Int96,
            4 => Type::Float,
            5 => Type::Double,
            6 => Type::ByteArray,
            7 => Type::FixedLenByteArray,
            other => return Err(thrift_err!("invalid physical type {}", other)),
        })
    }
}

/// Value encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Plain = 0,
    GroupVarInt = 1,
    PlainDictionary = 2,
    Rle = 3,
    BitPacked = 4,
    DeltaBinaryPacked = 5,
    DeltaLengthByteArray = 6,
    DeltaByteArray = 7,
    RleDictionary = 8,
    ByteStreamSplit = 9,
}

impl TryFrom<i32> for Encoding {
    type Error = ParquetError;

    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Encoding::Plain,
            1 => Encoding::GroupVarInt,
            2 => Encoding::PlainDictionary,
            3 => Encoding::Rle,
            4 => Encoding::BitPacked,
            5 => Encoding::DeltaBinaryPacked,
            6 => Encoding::DeltaLengthByteArray,
            7 => Encoding::DeltaByteArray,
            8 => Encoding::RleDictionary,
            9 => Encoding::ByteStreamSplit,
            other => return Err(thrift_err!("invalid encoding {}", other)),
        })
    }
}

/// Compression codecs. Only [`Compression::Uncompressed`] can be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Uncompressed = 0,
    Snappy = 1,
    Gzip = 2,
    Lzo = 3,
    Brotli = 4,
    Lz4 = 5,
    Zstd = 6,
    Lz4Raw = 7,
}

impl TryFrom<i32> for Compression {
    type Error = ParquetError;

    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Compression::Uncompressed,
            1 => Compression::Snappy,
            2 => Compression::Gzip,
            3 => Compression::Lzo,
            4 => Compression::Brotli,
            5 => Compression::Lz4,
            6 => Compression::Zstd,
            7 => Compression::Lz4Raw,
            other => return Err(thrift_err!("invalid compression codec {}", other)),
        })
    }
}

/// Page kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    DataPage = 0,
    IndexPage = 1,
    DictionaryPage = 2,
    DataPageV2 = 3,
}

impl TryFrom<i32> for PageType {
    type Error = ParquetError;

    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => PageType::DataPage,
            1 => PageType::IndexPage,
            2 => PageType::DictionaryPage,
            3 => PageType::DataPageV2,
            other => return Err(thrift_err!("invalid page type {}", other)),
        })
    }
}

/// Field repetition. Optional fields contribute a definition level,
/// repeated fields contribute both a definition and a repetition level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    Required = 0,
    Optional = 1,
    Repeated = 2,
}

impl TryFrom<i32> for Repetition {
    type Error = ParquetError;

    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Repetition::Required,
            1 => Repetition::Optional,
            2 => Repetition::Repeated,
            other => return Err(thrift_err!("invalid field repetition {}", other)),
        })
    }
}

/// Converted type hints, deprecated by the format but still written by
/// plenty of producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertedType {
    Utf8 = 0,
    Map = 1,
    MapKeyValue = 2,
    List = 3,
    Enum = 4,
    Decimal = 5,
    Date = 6,
    TimeMillis = 7,
    TimeMicros = 8,
    TimestampMillis = 9,
    TimestampMicros = 10,
    Uint8 = 11,
    Uint16 = 12,
    Uint32 = 13,
    Uint64 = 14,
    Int8 = 15,
    Int16 = 16,
    Int32 = 17,
    Int64 = 18,
    Json = 19,
    Bson = 20,
    Interval = 21,
}

impl TryFrom<i32> for ConvertedType {
    type Error = ParquetError;

    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => ConvertedType::Utf8,
            1 => ConvertedType::Map,
            2 => ConvertedType::MapKeyValue,
            3 => ConvertedType::List,
            4 => ConvertedType::Enum,
            5 => ConvertedType::Decimal,
            6 => ConvertedType::Date,
            7 => ConvertedType::TimeMillis,
            8 => ConvertedType::TimeMicros,
            9 => ConvertedType::TimestampMillis,
            10 => ConvertedType::TimestampMicros,
            11 => ConvertedType::Uint8,
            12 => ConvertedType::Uint16,
            13 => ConvertedType::Uint32,
            14 => ConvertedType::Uint64,
            15 => ConvertedType::Int8,
            16 => ConvertedType::Int16,
            17 => ConvertedType::Int32,
            18 => ConvertedType::Int64,
            19 => ConvertedType::Json,
            20 => ConvertedType::Bson,
            21 => ConvertedType::Interval,
            other => return Err(thrift_err!("invalid converted type {}", other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_roundtrip() {
        for v in 0..8 {
            let t = Type::try_from(v).unwrap();
            assert_eq!(v, t as i32);
        }
        assert!(Type::try_from(8).is_err());
    }

    #[test]
    fn encoding_roundtrip() {
        for v in 0..10 {
            let e = Encoding::try_from(v).unwrap();
            assert_eq!(v, e as i32);
        }
        assert!(Encoding::try_from(10).is_err());
    }

    #[test]
    fn compression_unknown() {
        assert!(Compression::try_from(99).is_err());
    }
}
