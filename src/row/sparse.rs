//! # Sparse Entries and Scope Items
//!
//! Everything after the variable data of a body, and everything inside a scope,
//! is a sequence of self-delimiting entries. This module knows how long each
//! one is without interpreting it.
//!
//! ```text
//! field entry (row, object, schema):  path_len varint | path utf8 | type arg | value
//! untyped item (array, set, tuple):                                type arg | value
//! typed item (typed_*, nullable):                                             value
//!
//! scope value: byte_length u32 | item_count u32 | body (byte_length bytes)
//! ```

use std::ops::Range;

use crate::config::{SCOPE_COUNT_SIZE, SCOPE_LENGTH_SIZE, SCOPE_PREFIX_SIZE};
use crate::encoding::{decode_varint, push_varint};
use crate::error::{ensure_layout, HybridRowError, Result};
use crate::layouts::{LayoutCode, TypeArgument};

/// A field entry located inside a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseEntry {
    pub path: Range<usize>,
    pub type_arg: TypeArgument,
    /// First byte of the entry (the path length).
    pub start: usize,
    pub value: Range<usize>,
}

impl SparseEntry {
    pub fn end(&self) -> usize {
        self.value.end
    }

    pub fn path_str<'a>(&self, bytes: &'a [u8]) -> &'a str {
        // Validated as utf8 when the entry was parsed.
        std::str::from_utf8(&bytes[self.path.clone()]).unwrap_or_default()
    }
}

pub fn read_scope_prefix(bytes: &[u8], at: usize) -> Result<(u32, u32)> {
    ensure_layout!(
        bytes.len() >= at + SCOPE_PREFIX_SIZE,
        "scope prefix at {} overruns {} bytes",
        at,
        bytes.len()
    );
    let length = u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    let c = at + SCOPE_LENGTH_SIZE;
    let count = u32::from_le_bytes([bytes[c], bytes[c + 1], bytes[c + 2], bytes[c + 3]]);
    Ok((length, count))
}

pub fn write_scope_prefix(bytes: &mut [u8], at: usize, length: u32, count: u32) {
    bytes[at..at + SCOPE_LENGTH_SIZE].copy_from_slice(&length.to_le_bytes());
    let c = at + SCOPE_LENGTH_SIZE;
    bytes[c..c + SCOPE_COUNT_SIZE].copy_from_slice(&count.to_le_bytes());
}

/// Byte length of a value of `type_arg` starting at `at`, bounded by `end`.
pub fn value_len(bytes: &[u8], at: usize, end: usize, type_arg: &TypeArgument) -> Result<usize> {
    ensure_layout!(end <= bytes.len() && at <= end, "value bounds {}..{} invalid", at, end);
    let code = type_arg.code;
    let len = if let Some(size) = code.fixed_size() {
        size
    } else if matches!(code, LayoutCode::Utf8 | LayoutCode::Binary) {
        let (value, n) = decode_varint(&bytes[at..end])?;
        n.checked_add(value as usize)
            .ok_or_else(|| HybridRowError::corrupt("value length overflows"))?
    } else if code.is_variable() {
        decode_varint(&bytes[at..end])?.1
    } else {
        let (length, _) = read_scope_prefix(&bytes[..end], at)?;
        SCOPE_PREFIX_SIZE + length as usize
    };
    ensure_layout!(
        len <= end - at,
        "{} value at {} needs {} bytes, {} available",
        code,
        at,
        len,
        end - at
    );
    Ok(len)
}

pub fn parse_entry(bytes: &[u8], at: usize, end: usize) -> Result<SparseEntry> {
    ensure_layout!(end <= bytes.len() && at < end, "sparse entry bounds {}..{} invalid", at, end);
    let (path_len, n) = decode_varint(&bytes[at..end])?;
    let path_start = at + n;
    ensure_layout!(
        path_len as usize <= end - path_start,
        "sparse path length {} overruns scope",
        path_len
    );
    let path_end = path_start + path_len as usize;
    std::str::from_utf8(&bytes[path_start..path_end])
        .map_err(|e| HybridRowError::corrupt(format!("sparse path is not utf8: {}", e)))?;

    let (type_arg, n) = TypeArgument::decode(&bytes[path_end..end])?;
    let value_start = path_end + n;
    let len = value_len(bytes, value_start, end, &type_arg)?;
    Ok(SparseEntry {
        path: path_start..path_end,
        type_arg,
        start: at,
        value: value_start..value_start + len,
    })
}

/// Parses one scope item. `implicit` is the item type of typed scopes, whose
/// items carry no type argument.
pub fn parse_item(
    bytes: &[u8],
    at: usize,
    end: usize,
    implicit: Option<&TypeArgument>,
) -> Result<(TypeArgument, Range<usize>)> {
    let (type_arg, value_start) = match implicit {
        Some(type_arg) => (type_arg.clone(), at),
        None => {
            ensure_layout!(at < end && end <= bytes.len(), "item bounds {}..{} invalid", at, end);
            let (type_arg, n) = TypeArgument::decode(&bytes[at..end])?;
            (type_arg, at + n)
        }
    };
    let len = value_len(bytes, value_start, end, &type_arg)?;
    Ok((type_arg, value_start..value_start + len))
}

pub fn encode_entry_header(path: &str, type_arg: &TypeArgument, out: &mut Vec<u8>) {
    push_varint(path.len() as u64, out);
    out.extend_from_slice(path.as_bytes());
    type_arg.encode(out);
}

/// Walks the field entries in `start..end`, returning the first whose path
/// equals `path`.
pub fn find_entry(bytes: &[u8], start: usize, end: usize, path: &str) -> Result<Option<SparseEntry>> {
    let mut pos = start;
    while pos < end {
        let entry = parse_entry(bytes, pos, end)?;
        if &bytes[entry.path.clone()] == path.as_bytes() {
            return Ok(Some(entry));
        }
        pos = entry.end();
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::FieldValue;

    fn entry(path: &str, value: FieldValue<'_>) -> Vec<u8> {
        let mut out = Vec::new();
        encode_entry_header(path, &TypeArgument::scalar(value.code()), &mut out);
        value.encode(&mut out);
        out
    }

    #[test]
    fn parse_entry_locates_path_and_value() {
        let bytes = entry("name", FieldValue::from("bob"));
        let parsed = parse_entry(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(parsed.path_str(&bytes), "name");
        assert_eq!(parsed.type_arg.code, LayoutCode::Utf8);
        assert_eq!(parsed.value, 6..10);
        assert_eq!(parsed.end(), bytes.len());
    }

    #[test]
    fn find_entry_walks_in_order() {
        let mut bytes = entry("a", FieldValue::Int32(1));
        bytes.extend(entry("b", FieldValue::VarUInt(300)));
        bytes.extend(entry("c", FieldValue::Boolean(true)));

        let b = find_entry(&bytes, 0, bytes.len(), "b").unwrap().unwrap();
        assert_eq!(b.type_arg.code, LayoutCode::VarUInt);
        assert_eq!(b.value.len(), 2);
        assert!(find_entry(&bytes, 0, bytes.len(), "z").unwrap().is_none());
    }

    #[test]
    fn scope_values_use_their_recorded_length() {
        let mut bytes = vec![0u8; 8];
        write_scope_prefix(&mut bytes, 0, 3, 1);
        bytes.extend([1, 2, 3, 99]);
        let ty = TypeArgument::array();
        assert_eq!(value_len(&bytes, 0, bytes.len(), &ty).unwrap(), 11);
        assert_eq!(read_scope_prefix(&bytes, 0).unwrap(), (3, 1));
        assert!(value_len(&bytes, 0, 10, &ty).is_err());
    }

    #[test]
    fn overlong_lengths_are_corrupt() {
        let bytes = [1u8, b'a', LayoutCode::Utf8 as u8, 10, b'x'];
        assert!(matches!(
            parse_entry(&bytes, 0, bytes.len()),
            Err(HybridRowError::CorruptLayout(_))
        ));
    }

    #[test]
    fn typed_items_have_no_type_prefix() {
        let bytes = 7i32.to_le_bytes();
        let ty = TypeArgument::scalar(LayoutCode::Int32);
        let (parsed, range) = parse_item(&bytes, 0, 4, Some(&ty)).unwrap();
        assert_eq!(parsed, ty);
        assert_eq!(range, 0..4);
    }
}
