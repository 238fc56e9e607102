//! Fixed-format field decoding
//!
//! Every value in an STDB block is one of:
//! - a little-endian `u32`
//! - a fixed-length array of little-endian `u32`
//! - a fixed-width run of UTF-16LE strings, each NUL-padded to the same byte width
//! - an opaque byte blob
//!
//! Decoding is the only supported direction. The encode entry points exist so
//! callers get an explicit [`Error::Unsupported`] instead of a missing method.

use std::fmt;
use std::io::Cursor;

use binrw::BinReaderExt;
use serde::Serialize;

use crate::error::{Error, Result};

/// Width of every integer field in the format
pub const U32_SIZE: usize = 4;

/// Width of one UTF-16 code unit
const CODE_UNIT_SIZE: usize = 2;

/// On-disk format of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Little-endian `u32`
    U32,
    /// `n` consecutive little-endian `u32` values
    U32Array(usize),
    /// `count` UTF-16LE strings of `bytes` bytes each
    Utf16 { bytes: usize, count: usize },
    /// Raw bytes, returned as-is
    Bytes(usize),
}

impl Format {
    /// Fixed UTF-16 string occupying `units` code units
    pub const fn utf16(units: usize) -> Self {
        Format::Utf16 {
            bytes: units * CODE_UNIT_SIZE,
            count: 1,
        }
    }

    /// Size of the field in bytes
    pub const fn size(&self) -> usize {
        match *self {
            Format::U32 => U32_SIZE,
            Format::U32Array(n) => n * U32_SIZE,
            Format::Utf16 { bytes, count } => bytes * count,
            Format::Bytes(n) => n,
        }
    }

    /// Decode a field from exactly [`Format::size`] bytes.
    ///
    /// Single-element arrays collapse to a bare scalar: `U32Array(1)` yields
    /// [`Value::U32`] and a one-string `Utf16` yields [`Value::Str`].
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        if bytes.len() != self.size() {
            return Err(Error::ShortRead {
                offset: 0,
                expected: self.size(),
                actual: bytes.len(),
            });
        }

        let value = match *self {
            Format::U32 => Value::U32(read_u32s(bytes, 1)?[0]),
            Format::U32Array(1) => Value::U32(read_u32s(bytes, 1)?[0]),
            Format::U32Array(n) => Value::U32s(read_u32s(bytes, n)?),
            Format::Utf16 { bytes: 0, .. } => {
                return Err(Error::Layout("zero-width UTF-16 field".into()));
            }
            Format::Utf16 { bytes: width, count } => {
                let mut strings = bytes
                    .chunks_exact(width)
                    .map(decode_utf16_fixed)
                    .collect::<Result<Vec<_>>>()?;
                if count == 1 {
                    Value::Str(strings.remove(0))
                } else {
                    Value::Strs(strings)
                }
            }
            Format::Bytes(_) => Value::Bytes(bytes.to_vec()),
        };
        Ok(value)
    }

    /// Encoding is not implemented for any format.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        Err(Error::Unsupported(format!(
            "encoding {} as {:?}",
            value.type_name(),
            self
        )))
    }
}

/// Decode the field at `offset` of `buf`
pub fn decode_field(buf: &[u8], format: Format, offset: usize) -> Result<Value> {
    let end = offset + format.size();
    let bytes = buf.get(offset..end).ok_or(Error::ShortRead {
        offset: offset as u64,
        expected: format.size(),
        actual: buf.len().saturating_sub(offset),
    })?;
    format.decode(bytes)
}

fn read_u32s(bytes: &[u8], n: usize) -> Result<Vec<u32>> {
    let mut cursor = Cursor::new(bytes);
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(cursor.read_le::<u32>()?);
    }
    Ok(values)
}

/// Decode a NUL-padded UTF-16LE string.
///
/// Trailing NULs are trimmed after decoding, at the code-unit level, so a
/// surrogate pair at the end of the text is never split.
pub fn decode_utf16_fixed(bytes: &[u8]) -> Result<String> {
    let mut cursor = Cursor::new(bytes);
    let mut units = Vec::with_capacity(bytes.len() / CODE_UNIT_SIZE);
    for _ in 0..bytes.len() / CODE_UNIT_SIZE {
        units.push(cursor.read_le::<u16>()?);
    }

    let text: String = char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    Ok(text.trim_end_matches('\0').to_string())
}

/// Pad a string into a fixed UTF-16 field.
///
/// Not implemented: always returns [`Error::Unsupported`].
pub fn encode_utf16_fixed(s: &str, units: usize) -> Result<Vec<u8>> {
    Err(Error::Unsupported(format!(
        "encoding {:?} into a {}-unit UTF-16 field",
        s, units
    )))
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    U32(u32),
    U32s(Vec<u32>),
    Str(String),
    Strs(Vec<String>),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32s(&self) -> Option<&[u32]> {
        match self {
            Value::U32s(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_strs(&self) -> Option<&[String]> {
        match self {
            Value::Strs(v) => Some(v),
            _ => None,
        }
    }

    /// True for zero, all-zero arrays, empty strings and all-zero blobs
    pub fn is_empty(&self) -> bool {
        match self {
            Value::U32(v) => *v == 0,
            Value::U32s(v) => v.iter().all(|&x| x == 0),
            Value::Str(s) => s.is_empty(),
            Value::Strs(v) => v.iter().all(|s| s.is_empty()),
            Value::Bytes(v) => v.iter().all(|&b| b == 0),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::U32(_) => "u32",
            Value::U32s(_) => "u32 array",
            Value::Str(_) => "string",
            Value::Strs(_) => "string array",
            Value::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U32(v) => write!(f, "{}", v),
            Value::U32s(v) => write!(f, "{:?}", v),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Strs(v) => write!(f, "{:?}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16_padded(s: &str, units: usize) -> Vec<u8> {
        let mut bytes: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        bytes.resize(units * 2, 0);
        bytes
    }

    #[test]
    fn test_format_sizes() {
        assert_eq!(Format::U32.size(), 4);
        assert_eq!(Format::U32Array(100).size(), 400);
        assert_eq!(Format::utf16(64).size(), 128);
        assert_eq!(Format::Utf16 { bytes: 64, count: 6 }.size(), 384);
        assert_eq!(Format::Bytes(96).size(), 96);
    }

    #[test]
    fn test_u32_little_endian() {
        let buf = [0x71, 0x13, 0x02, 0x00];
        assert_eq!(decode_field(&buf, Format::U32, 0).unwrap(), Value::U32(0x0002_1371));
    }

    #[test]
    fn test_array_decoding() {
        let buf: Vec<u8> = [1u32, 2, 0, 7].iter().flat_map(|v| v.to_le_bytes()).collect();
        let value = decode_field(&buf, Format::U32Array(4), 0).unwrap();
        assert_eq!(value.as_u32s(), Some(&[1, 2, 0, 7][..]));
    }

    #[test]
    fn test_single_element_array_collapses() {
        let buf = 42u32.to_le_bytes();
        assert_eq!(decode_field(&buf, Format::U32Array(1), 0).unwrap(), Value::U32(42));
    }

    #[test]
    fn test_field_at_offset() {
        let mut buf = vec![0u8; 16];
        buf[8..12].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        assert_eq!(decode_field(&buf, Format::U32, 8).unwrap().as_u32(), Some(0xDEADBEEF));
    }

    #[test]
    fn test_field_past_end_is_short_read() {
        let buf = [0u8; 6];
        let err = decode_field(&buf, Format::U32, 4).unwrap_err();
        assert!(matches!(err, Error::ShortRead { expected: 4, actual: 2, .. }));
    }

    #[test]
    fn test_utf16_trailing_nuls_trimmed() {
        let bytes = utf16_padded("Test Album", 64);
        let value = decode_field(&bytes, Format::utf16(64), 0).unwrap();
        assert_eq!(value, Value::Str("Test Album".into()));
    }

    #[test]
    fn test_utf16_surrogate_pair_at_boundary() {
        // U+1D11E fills the last two code units of a 4-unit field
        let bytes = utf16_padded("ab\u{1D11E}", 4);
        assert_eq!(decode_utf16_fixed(&bytes).unwrap(), "ab\u{1D11E}");
    }

    #[test]
    fn test_utf16_inner_nul_kept() {
        let bytes = utf16_padded("a\0b", 8);
        assert_eq!(decode_utf16_fixed(&bytes).unwrap(), "a\0b");
    }

    #[test]
    fn test_utf16_string_array() {
        let mut bytes = utf16_padded("One", 32);
        bytes.extend(utf16_padded("", 32));
        bytes.extend(utf16_padded("Three", 32));
        let value = Format::Utf16 { bytes: 64, count: 3 }.decode(&bytes).unwrap();
        assert_eq!(
            value.as_strs(),
            Some(&["One".to_string(), String::new(), "Three".to_string()][..])
        );
    }

    #[test]
    fn test_bytes_blob() {
        let buf = [1u8, 2, 3];
        assert_eq!(decode_field(&buf, Format::Bytes(3), 0).unwrap(), Value::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn test_encode_unsupported() {
        assert!(matches!(Format::U32.encode(&Value::U32(1)), Err(Error::Unsupported(_))));
        assert!(matches!(encode_utf16_fixed("Test", 64), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_value_emptiness() {
        assert!(Value::U32(0).is_empty());
        assert!(Value::U32s(vec![0, 0]).is_empty());
        assert!(!Value::U32s(vec![0, 3]).is_empty());
        assert!(Value::Strs(vec![String::new()]).is_empty());
        assert!(!Value::Str("x".into()).is_empty());
    }
}
