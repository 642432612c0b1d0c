//! # Layout Codes
//!
//! `LayoutCode` is the one-byte type tag written in front of every sparse value
//! and every type argument. The tag set is closed: a byte outside the table is a
//! corrupt row, never an extension point.
//!
//! ## Discriminant Values
//!
//! | Range  | Category | Codes |
//! |--------|----------|-------|
//! | 1-3    | Null and boolean | null, bool |
//! | 5-12   | Fixed integers | int8 .. uint64 |
//! | 13-14  | Varints | varint, varuint |
//! | 15-19  | Other fixed scalars | float32, float64, decimal, datetime, guid |
//! | 20-21  | Length-prefixed | utf8, binary |
//! | 30-48  | Scopes | object, array, tuple, map, set, nullable (+ typed forms) |
//! | 68     | Nested schema | schema |
//!
//! Even scope codes leave room for an immutable twin at `code + 1`; this crate
//! never writes one.
//!
//! ## Fixed-Width Sizes
//!
//! | Code | Size (bytes) |
//! |------|--------------|
//! | null | 0 |
//! | bool, int8, uint8 | 1 |
//! | int16, uint16 | 2 |
//! | int32, uint32, float32 | 4 |
//! | int64, uint64, float64, datetime | 8 |
//! | decimal, guid | 16 |
//!
//! ## Type Argument Arity
//!
//! | Code | Type arguments |
//! |------|----------------|
//! | typed_array, typed_set, nullable | exactly 1 |
//! | typed_map | exactly 2 (key, value) |
//! | tuple, typed_tuple | at least 1 |
//! | schema | none, plus a schema id |
//! | everything else | none |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HybridRowError;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutCode {
    #[serde(rename = "null")]
    Null = 1,
    #[serde(rename = "bool")]
    Boolean = 3,
    #[serde(rename = "int8")]
    Int8 = 5,
    #[serde(rename = "int16")]
    Int16 = 6,
    #[serde(rename = "int32")]
    Int32 = 7,
    #[serde(rename = "int64")]
    Int64 = 8,
    #[serde(rename = "uint8")]
    UInt8 = 9,
    #[serde(rename = "uint16")]
    UInt16 = 10,
    #[serde(rename = "uint32")]
    UInt32 = 11,
    #[serde(rename = "uint64")]
    UInt64 = 12,
    #[serde(rename = "varint")]
    VarInt = 13,
    #[serde(rename = "varuint")]
    VarUInt = 14,
    #[serde(rename = "float32")]
    Float32 = 15,
    #[serde(rename = "float64")]
    Float64 = 16,
    #[serde(rename = "decimal")]
    Decimal = 17,
    #[serde(rename = "datetime")]
    DateTime = 18,
    #[serde(rename = "guid")]
    Guid = 19,
    #[serde(rename = "utf8")]
    Utf8 = 20,
    #[serde(rename = "binary")]
    Binary = 21,

    #[serde(rename = "object")]
    Object = 30,
    #[serde(rename = "array")]
    Array = 32,
    #[serde(rename = "typed_array")]
    TypedArray = 34,
    #[serde(rename = "tuple")]
    Tuple = 36,
    #[serde(rename = "typed_tuple")]
    TypedTuple = 38,
    #[serde(rename = "map")]
    Map = 40,
    #[serde(rename = "typed_map")]
    TypedMap = 42,
    #[serde(rename = "set")]
    Set = 44,
    #[serde(rename = "typed_set")]
    TypedSet = 46,
    #[serde(rename = "nullable")]
    Nullable = 48,
    #[serde(rename = "schema")]
    Schema = 68,
}

/// Number of type arguments a code takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

impl LayoutCode {
    pub fn name(&self) -> &'static str {
        match self {
            LayoutCode::Null => "null",
            LayoutCode::Boolean => "bool",
            LayoutCode::Int8 => "int8",
            LayoutCode::Int16 => "int16",
            LayoutCode::Int32 => "int32",
            LayoutCode::Int64 => "int64",
            LayoutCode::UInt8 => "uint8",
            LayoutCode::UInt16 => "uint16",
            LayoutCode::UInt32 => "uint32",
            LayoutCode::UInt64 => "uint64",
            LayoutCode::VarInt => "varint",
            LayoutCode::VarUInt => "varuint",
            LayoutCode::Float32 => "float32",
            LayoutCode::Float64 => "float64",
            LayoutCode::Decimal => "decimal",
            LayoutCode::DateTime => "datetime",
            LayoutCode::Guid => "guid",
            LayoutCode::Utf8 => "utf8",
            LayoutCode::Binary => "binary",
            LayoutCode::Object => "object",
            LayoutCode::Array => "array",
            LayoutCode::TypedArray => "typed_array",
            LayoutCode::Tuple => "tuple",
            LayoutCode::TypedTuple => "typed_tuple",
            LayoutCode::Map => "map",
            LayoutCode::TypedMap => "typed_map",
            LayoutCode::Set => "set",
            LayoutCode::TypedSet => "typed_set",
            LayoutCode::Nullable => "nullable",
            LayoutCode::Schema => "schema",
        }
    }

    /// Returns the byte width of a fixed scalar, or None for variable scalars
    /// and scopes.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            LayoutCode::Null => Some(0),
            LayoutCode::Boolean | LayoutCode::Int8 | LayoutCode::UInt8 => Some(1),
            LayoutCode::Int16 | LayoutCode::UInt16 => Some(2),
            LayoutCode::Int32 | LayoutCode::UInt32 | LayoutCode::Float32 => Some(4),
            LayoutCode::Int64 | LayoutCode::UInt64 | LayoutCode::Float64 | LayoutCode::DateTime => {
                Some(8)
            }
            LayoutCode::Decimal | LayoutCode::Guid => Some(16),
            _ => None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed_size().is_some()
    }

    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            LayoutCode::Utf8 | LayoutCode::Binary | LayoutCode::VarInt | LayoutCode::VarUInt
        )
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_scope()
    }

    pub fn is_scope(&self) -> bool {
        (*self as u8) >= LayoutCode::Object as u8
    }

    /// Scopes whose items carry no type tag because the scope's own type
    /// arguments already fix it.
    pub fn is_typed_scope(&self) -> bool {
        matches!(
            self,
            LayoutCode::TypedArray
                | LayoutCode::TypedTuple
                | LayoutCode::TypedMap
                | LayoutCode::TypedSet
                | LayoutCode::Nullable
        )
    }

    /// Scopes whose items are addressed by path rather than position.
    pub fn is_field_scope(&self) -> bool {
        matches!(self, LayoutCode::Object | LayoutCode::Schema)
    }

    /// Scopes that reject duplicate items (sets) or duplicate keys (maps).
    pub fn is_unique_scope(&self) -> bool {
        matches!(
            self,
            LayoutCode::Set | LayoutCode::TypedSet | LayoutCode::Map | LayoutCode::TypedMap
        )
    }

    pub fn is_map(&self) -> bool {
        matches!(self, LayoutCode::Map | LayoutCode::TypedMap)
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, LayoutCode::Tuple | LayoutCode::TypedTuple)
    }

    pub fn arity(&self) -> Arity {
        match self {
            LayoutCode::TypedArray | LayoutCode::TypedSet | LayoutCode::Nullable => {
                Arity::Exactly(1)
            }
            LayoutCode::TypedMap => Arity::Exactly(2),
            LayoutCode::Tuple | LayoutCode::TypedTuple => Arity::AtLeast(1),
            _ => Arity::Exactly(0),
        }
    }
}

impl fmt::Display for LayoutCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for LayoutCode {
    type Error = HybridRowError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let code = match value {
            1 => LayoutCode::Null,
            3 => LayoutCode::Boolean,
            5 => LayoutCode::Int8,
            6 => LayoutCode::Int16,
            7 => LayoutCode::Int32,
            8 => LayoutCode::Int64,
            9 => LayoutCode::UInt8,
            10 => LayoutCode::UInt16,
            11 => LayoutCode::UInt32,
            12 => LayoutCode::UInt64,
            13 => LayoutCode::VarInt,
            14 => LayoutCode::VarUInt,
            15 => LayoutCode::Float32,
            16 => LayoutCode::Float64,
            17 => LayoutCode::Decimal,
            18 => LayoutCode::DateTime,
            19 => LayoutCode::Guid,
            20 => LayoutCode::Utf8,
            21 => LayoutCode::Binary,
            30 => LayoutCode::Object,
            32 => LayoutCode::Array,
            34 => LayoutCode::TypedArray,
            36 => LayoutCode::Tuple,
            38 => LayoutCode::TypedTuple,
            40 => LayoutCode::Map,
            42 => LayoutCode::TypedMap,
            44 => LayoutCode::Set,
            46 => LayoutCode::TypedSet,
            48 => LayoutCode::Nullable,
            68 => LayoutCode::Schema,
            _ => {
                return Err(HybridRowError::corrupt(format!(
                    "invalid layout code: {}",
                    value
                )))
            }
        };
        Ok(code)
    }
}
