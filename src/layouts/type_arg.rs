//! # Type Arguments
//!
//! A `TypeArgument` is a layout code plus the nested arguments a generic scope
//! needs (`typed_array<int32>`, `typed_map<utf8, int64>`) and, for nested
//! schematized objects, the id of the schema they follow.
//!
//! ## Wire Encoding
//!
//! ```text
//! +-----------+----------------------+-------------------------+----------------+
//! | code (u8) | count (varint)       | nested type arguments   | schema id (u32)|
//! |           | tuple/typed_tuple    | count implied by arity  | schema only    |
//! +-----------+----------------------+-------------------------+----------------+
//! ```
//!
//! `typed_map<utf8, int64>` is therefore `2A 14 08` and `schema(7)` is
//! `44 07 00 00 00`.
//!
//! ## Validation
//!
//! `validate` enforces the arity table of [`LayoutCode::arity`], the rule that
//! only `schema` carries a schema id, and a bound on nesting depth. Decoding
//! untrusted bytes applies the same bound so a hostile row cannot recurse
//! without limit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::MAX_TYPE_ARGUMENT_DEPTH;
use crate::encoding::{decode_varint, push_varint, varint_len, zigzag_encode};
use crate::error::{ensure_layout, HybridRowError, Result};
use crate::layouts::code::{Arity, LayoutCode};
use crate::row::FieldValue;

/// Identifier of a compiled layout, stored at the start of every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(pub u32);

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SchemaId {
    fn from(value: u32) -> Self {
        SchemaId(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeArgument {
    pub code: LayoutCode,
    #[serde(default, rename = "args", skip_serializing_if = "Vec::is_empty")]
    pub type_args: Vec<TypeArgument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<SchemaId>,
}

impl From<LayoutCode> for TypeArgument {
    fn from(code: LayoutCode) -> Self {
        TypeArgument::scalar(code)
    }
}

impl TypeArgument {
    pub fn scalar(code: LayoutCode) -> Self {
        Self {
            code,
            type_args: Vec::new(),
            schema_id: None,
        }
    }

    pub fn new(code: LayoutCode, type_args: Vec<TypeArgument>) -> Self {
        Self {
            code,
            type_args,
            schema_id: None,
        }
    }

    pub fn schema(id: SchemaId) -> Self {
        Self {
            code: LayoutCode::Schema,
            type_args: Vec::new(),
            schema_id: Some(id),
        }
    }

    pub fn object() -> Self {
        Self::scalar(LayoutCode::Object)
    }

    pub fn array() -> Self {
        Self::scalar(LayoutCode::Array)
    }

    pub fn typed_array(item: impl Into<TypeArgument>) -> Self {
        Self::new(LayoutCode::TypedArray, vec![item.into()])
    }

    pub fn typed_set(item: impl Into<TypeArgument>) -> Self {
        Self::new(LayoutCode::TypedSet, vec![item.into()])
    }

    pub fn typed_map(key: impl Into<TypeArgument>, value: impl Into<TypeArgument>) -> Self {
        Self::new(LayoutCode::TypedMap, vec![key.into(), value.into()])
    }

    pub fn nullable(inner: impl Into<TypeArgument>) -> Self {
        Self::new(LayoutCode::Nullable, vec![inner.into()])
    }

    pub fn tuple(items: Vec<TypeArgument>) -> Self {
        Self::new(LayoutCode::Tuple, items)
    }

    pub fn typed_tuple(items: Vec<TypeArgument>) -> Self {
        Self::new(LayoutCode::TypedTuple, items)
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_at(0)
    }

    fn validate_at(&self, depth: usize) -> Result<()> {
        if depth >= MAX_TYPE_ARGUMENT_DEPTH {
            return Err(HybridRowError::schema(format!(
                "type argument nesting exceeds {}",
                MAX_TYPE_ARGUMENT_DEPTH
            )));
        }
        let arity = self.code.arity();
        if !arity.accepts(self.type_args.len()) {
            return Err(HybridRowError::schema(format!(
                "{} takes {} type arguments, got {}",
                self.code,
                arity,
                self.type_args.len()
            )));
        }
        match (self.code, self.schema_id) {
            (LayoutCode::Schema, None) => {
                return Err(HybridRowError::schema("schema type argument without schema id"))
            }
            (code, Some(id)) if code != LayoutCode::Schema => {
                return Err(HybridRowError::schema(format!(
                    "schema id {} on non-schema type {}",
                    id, code
                )))
            }
            _ => {}
        }
        for arg in &self.type_args {
            arg.validate_at(depth + 1)?;
        }
        Ok(())
    }

    /// Exact number of bytes `value` occupies when written inline under this
    /// type.
    pub fn encoded_size(&self, value: &FieldValue<'_>) -> Result<usize> {
        if value.code() != self.code {
            return Err(HybridRowError::mismatch("", self, value.code()));
        }
        let size = match value {
            FieldValue::Utf8(s) => varint_len(s.len() as u64) + s.len(),
            FieldValue::Binary(b) => varint_len(b.len() as u64) + b.len(),
            FieldValue::VarInt(v) => varint_len(zigzag_encode(*v)),
            FieldValue::VarUInt(v) => varint_len(*v),
            other => other.code().fixed_size().unwrap_or_default(),
        };
        Ok(size)
    }

    /// Collects every schema id referenced anywhere in this type.
    pub fn referenced_schemas(&self, out: &mut Vec<SchemaId>) {
        if let Some(id) = self.schema_id {
            out.push(id);
        }
        for arg in &self.type_args {
            arg.referenced_schemas(out);
        }
    }

    pub fn encoded_len(&self) -> usize {
        let mut len = 1;
        if self.code.is_tuple() {
            len += varint_len(self.type_args.len() as u64);
        }
        len += self.type_args.iter().map(|a| a.encoded_len()).sum::<usize>();
        if self.code == LayoutCode::Schema {
            len += 4;
        }
        len
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.code as u8);
        if self.code.is_tuple() {
            push_varint(self.type_args.len() as u64, out);
        }
        for arg in &self.type_args {
            arg.encode(out);
        }
        if self.code == LayoutCode::Schema {
            let id = self.schema_id.map(|id| id.0).unwrap_or_default();
            out.extend_from_slice(&id.to_le_bytes());
        }
    }

    /// Decodes a type argument and returns it with the number of bytes read.
    pub fn decode(buf: &[u8]) -> Result<(TypeArgument, usize)> {
        Self::decode_at(buf, 0)
    }

    fn decode_at(buf: &[u8], depth: usize) -> Result<(TypeArgument, usize)> {
        ensure_layout!(
            depth < MAX_TYPE_ARGUMENT_DEPTH,
            "type argument nesting exceeds {}",
            MAX_TYPE_ARGUMENT_DEPTH
        );
        ensure_layout!(!buf.is_empty(), "missing type argument");
        let code = LayoutCode::try_from(buf[0])?;
        let mut pos = 1;

        let count = match code.arity() {
            Arity::Exactly(n) => n,
            Arity::AtLeast(min) => {
                let (count, n) = decode_varint(&buf[pos..])?;
                pos += n;
                ensure_layout!(
                    count as usize >= min && count as usize <= buf.len(),
                    "invalid {} argument count {}",
                    code,
                    count
                );
                count as usize
            }
        };

        let mut type_args = Vec::with_capacity(count);
        for _ in 0..count {
            let (arg, n) = Self::decode_at(&buf[pos..], depth + 1)?;
            pos += n;
            type_args.push(arg);
        }

        let schema_id = if code == LayoutCode::Schema {
            ensure_layout!(buf.len() >= pos + 4, "truncated schema id");
            let id = u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]);
            pos += 4;
            Some(SchemaId(id))
        } else {
            None
        };

        Ok((
            TypeArgument {
                code,
                type_args,
                schema_id,
            },
            pos,
        ))
    }
}

impl fmt::Display for TypeArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(id) = self.schema_id {
            write!(f, "({})", id)?;
        }
        if !self.type_args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.type_args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn validate_rejects_bad_arity() {
        let bad = TypeArgument::new(LayoutCode::TypedArray, vec![]);
        assert!(matches!(bad.validate(), Err(HybridRowError::Schema(_))));

        let bad = TypeArgument::new(
            LayoutCode::Int32,
            vec![TypeArgument::scalar(LayoutCode::Int32)],
        );
        assert!(bad.validate().is_err());

        assert!(TypeArgument::typed_map(LayoutCode::Utf8, LayoutCode::Int64)
            .validate()
            .is_ok());
    }

    #[test]
    fn validate_checks_schema_id_placement() {
        let missing = TypeArgument::scalar(LayoutCode::Schema);
        assert!(missing.validate().is_err());

        let misplaced = TypeArgument {
            code: LayoutCode::Object,
            type_args: vec![],
            schema_id: Some(SchemaId(3)),
        };
        assert!(misplaced.validate().is_err());

        assert!(TypeArgument::schema(SchemaId(3)).validate().is_ok());
    }

    #[test]
    fn validate_checks_nested_arguments() {
        let nested = TypeArgument::typed_array(TypeArgument::scalar(LayoutCode::Schema));
        assert!(nested.validate().is_err());
    }

    #[test]
    fn encoded_size_of_scalars() {
        let int32 = TypeArgument::scalar(LayoutCode::Int32);
        assert_eq!(int32.encoded_size(&FieldValue::Int32(7)).unwrap(), 4);

        let utf8 = TypeArgument::scalar(LayoutCode::Utf8);
        let text = FieldValue::Utf8(Cow::Borrowed("abc"));
        assert_eq!(utf8.encoded_size(&text).unwrap(), 4);

        let varint = TypeArgument::scalar(LayoutCode::VarInt);
        assert_eq!(varint.encoded_size(&FieldValue::VarInt(-64)).unwrap(), 1);
        assert_eq!(varint.encoded_size(&FieldValue::VarInt(64)).unwrap(), 2);

        assert!(matches!(
            int32.encoded_size(&text),
            Err(HybridRowError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn wire_bytes_for_known_arguments() {
        let mut out = Vec::new();
        TypeArgument::typed_map(LayoutCode::Utf8, LayoutCode::Int64).encode(&mut out);
        assert_eq!(out, vec![42, 20, 8]);

        out.clear();
        TypeArgument::schema(SchemaId(7)).encode(&mut out);
        assert_eq!(out, vec![68, 7, 0, 0, 0]);

        out.clear();
        let tuple = TypeArgument::tuple(vec![
            TypeArgument::scalar(LayoutCode::Int32),
            TypeArgument::scalar(LayoutCode::Utf8),
        ]);
        tuple.encode(&mut out);
        assert_eq!(out, vec![36, 2, 7, 20]);
        assert_eq!(tuple.encoded_len(), out.len());
    }

    #[test]
    fn decode_reads_nested_arguments() {
        let ty = TypeArgument::typed_array(TypeArgument::nullable(TypeArgument::schema(
            SchemaId(9),
        )));
        let mut out = Vec::new();
        ty.encode(&mut out);
        out.push(0xEE);

        let (decoded, read) = TypeArgument::decode(&out).unwrap();
        assert_eq!(decoded, ty);
        assert_eq!(read, out.len() - 1);
    }

    #[test]
    fn decode_rejects_truncated_and_unbounded_input() {
        assert!(TypeArgument::decode(&[]).is_err());
        assert!(TypeArgument::decode(&[68, 1, 0]).is_err());
        assert!(TypeArgument::decode(&[34]).is_err());

        let deep = vec![LayoutCode::Nullable as u8; MAX_TYPE_ARGUMENT_DEPTH + 1];
        assert!(matches!(
            TypeArgument::decode(&deep),
            Err(HybridRowError::CorruptLayout(_))
        ));
    }

    #[test]
    fn display_is_readable() {
        let ty = TypeArgument::typed_map(LayoutCode::Utf8, TypeArgument::schema(SchemaId(2)));
        assert_eq!(ty.to_string(), "typed_map<utf8, schema(2)>");
    }

    #[test]
    fn serde_uses_compact_field_names() {
        let ty = TypeArgument::typed_array(LayoutCode::Int32);
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, r#"{"code":"typed_array","args":[{"code":"int32"}]}"#);
        let back: TypeArgument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
    }
}
