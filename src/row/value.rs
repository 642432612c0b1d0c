//! # Field Values
//!
//! `FieldValue` is the dynamically typed scalar carried by the generic
//! accessors, by column defaults, and by the JSON and data-item views. Its
//! variants mirror the scalar layout codes one to one, so `value.code()` is the
//! tag checked against a column or type argument before any byte is written.
//!
//! Text and binary values borrow from the row when read (`Cow::Borrowed`) and
//! own their bytes when built by a caller or stored as a default.
//!
//! ## Encodings
//!
//! | Form | Used by | Utf8 / Binary | VarInt / VarUInt |
//! |------|---------|---------------|------------------|
//! | inline | sparse fields, scope items | varint length + bytes | zigzag / plain LEB128 |
//! | column | variable columns | raw bytes (length from offset table) | zigzag / plain LEB128 |
//!
//! Fixed scalars are identical in both forms.
//!
//! ## Decimal
//!
//! 16 bytes, little-endian: `flags (u32) | hi (u32) | lo (u64)`. The mantissa is
//! the 96-bit unsigned integer `hi:lo`, the scale lives in bits 16..24 of
//! `flags` and the sign in bit 31. All other flag bits must be zero.

use std::borrow::Cow;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::encoding::{decode_varint, decode_varint_signed, push_varint, push_varint_signed};
use crate::error::{ensure_layout, HybridRowError, Result};
use crate::layouts::LayoutCode;

pub const MAX_DECIMAL_SCALE: u32 = 28;

const DECIMAL_SIGN_MASK: u32 = 0x8000_0000;
const DECIMAL_SCALE_SHIFT: u32 = 16;
const DECIMAL_SCALE_MASK: u32 = 0x00FF_0000;
const DECIMAL_MANTISSA_LIMIT: u128 = 1 << 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    flags: u32,
    hi: u32,
    lo: u64,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        flags: 0,
        hi: 0,
        lo: 0,
    };

    /// Builds `mantissa * 10^-scale`. Returns None when the mantissa needs more
    /// than 96 bits or the scale exceeds 28.
    pub fn new(mantissa: i128, scale: u32) -> Option<Self> {
        let magnitude = mantissa.unsigned_abs();
        if magnitude >= DECIMAL_MANTISSA_LIMIT || scale > MAX_DECIMAL_SCALE {
            return None;
        }
        let mut flags = scale << DECIMAL_SCALE_SHIFT;
        if mantissa < 0 {
            flags |= DECIMAL_SIGN_MASK;
        }
        Some(Self {
            flags,
            hi: (magnitude >> 64) as u32,
            lo: magnitude as u64,
        })
    }

    pub fn mantissa(&self) -> i128 {
        let magnitude = ((self.hi as i128) << 64) | self.lo as i128;
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    pub fn scale(&self) -> u32 {
        (self.flags & DECIMAL_SCALE_MASK) >> DECIMAL_SCALE_SHIFT
    }

    pub fn is_negative(&self) -> bool {
        self.flags & DECIMAL_SIGN_MASK != 0
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..4].copy_from_slice(&self.flags.to_le_bytes());
        out[4..8].copy_from_slice(&self.hi.to_le_bytes());
        out[8..16].copy_from_slice(&self.lo.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; 16]) -> Result<Self> {
        let flags = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let hi = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let mut lo = [0u8; 8];
        lo.copy_from_slice(&bytes[8..16]);
        let lo = u64::from_le_bytes(lo);

        ensure_layout!(
            flags & !(DECIMAL_SIGN_MASK | DECIMAL_SCALE_MASK) == 0,
            "invalid decimal flags {:#010x}",
            flags
        );
        let decimal = Self { flags, hi, lo };
        ensure_layout!(
            decimal.scale() <= MAX_DECIMAL_SCALE,
            "decimal scale {} exceeds {}",
            decimal.scale(),
            MAX_DECIMAL_SCALE
        );
        Ok(decimal)
    }

    /// Parses `[-]digits[.digits]`.
    pub fn parse(text: &str) -> Option<Self> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        let mut mantissa: i128 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let digit = c.to_digit(10)? as i128;
            mantissa = mantissa.checked_mul(10)?.checked_add(digit)?;
        }
        if negative {
            mantissa = -mantissa;
        }
        Self::new(mantissa, frac_part.len() as u32)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa().unsigned_abs().to_string();
        let scale = self.scale() as usize;
        if self.is_negative() {
            f.write_str("-")?;
        }
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() <= scale {
            write!(f, "0.{}{}", "0".repeat(scale - digits.len()), digits)
        } else {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{}.{}", int_part, frac_part)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    /// Signed 100ns ticks.
    DateTime(i64),
    Guid([u8; 16]),
    Utf8(Cow<'a, str>),
    Binary(Cow<'a, [u8]>),
    VarInt(i64),
    VarUInt(u64),
}

impl<'a> FieldValue<'a> {
    pub fn code(&self) -> LayoutCode {
        match self {
            FieldValue::Null => LayoutCode::Null,
            FieldValue::Boolean(_) => LayoutCode::Boolean,
            FieldValue::Int8(_) => LayoutCode::Int8,
            FieldValue::Int16(_) => LayoutCode::Int16,
            FieldValue::Int32(_) => LayoutCode::Int32,
            FieldValue::Int64(_) => LayoutCode::Int64,
            FieldValue::UInt8(_) => LayoutCode::UInt8,
            FieldValue::UInt16(_) => LayoutCode::UInt16,
            FieldValue::UInt32(_) => LayoutCode::UInt32,
            FieldValue::UInt64(_) => LayoutCode::UInt64,
            FieldValue::Float32(_) => LayoutCode::Float32,
            FieldValue::Float64(_) => LayoutCode::Float64,
            FieldValue::Decimal(_) => LayoutCode::Decimal,
            FieldValue::DateTime(_) => LayoutCode::DateTime,
            FieldValue::Guid(_) => LayoutCode::Guid,
            FieldValue::Utf8(_) => LayoutCode::Utf8,
            FieldValue::Binary(_) => LayoutCode::Binary,
            FieldValue::VarInt(_) => LayoutCode::VarInt,
            FieldValue::VarUInt(_) => LayoutCode::VarUInt,
        }
    }

    pub fn into_owned(self) -> FieldValue<'static> {
        match self {
            FieldValue::Utf8(s) => FieldValue::Utf8(Cow::Owned(s.into_owned())),
            FieldValue::Binary(b) => FieldValue::Binary(Cow::Owned(b.into_owned())),
            FieldValue::Null => FieldValue::Null,
            FieldValue::Boolean(v) => FieldValue::Boolean(v),
            FieldValue::Int8(v) => FieldValue::Int8(v),
            FieldValue::Int16(v) => FieldValue::Int16(v),
            FieldValue::Int32(v) => FieldValue::Int32(v),
            FieldValue::Int64(v) => FieldValue::Int64(v),
            FieldValue::UInt8(v) => FieldValue::UInt8(v),
            FieldValue::UInt16(v) => FieldValue::UInt16(v),
            FieldValue::UInt32(v) => FieldValue::UInt32(v),
            FieldValue::UInt64(v) => FieldValue::UInt64(v),
            FieldValue::Float32(v) => FieldValue::Float32(v),
            FieldValue::Float64(v) => FieldValue::Float64(v),
            FieldValue::Decimal(v) => FieldValue::Decimal(v),
            FieldValue::DateTime(v) => FieldValue::DateTime(v),
            FieldValue::Guid(v) => FieldValue::Guid(v),
            FieldValue::VarInt(v) => FieldValue::VarInt(v),
            FieldValue::VarUInt(v) => FieldValue::VarUInt(v),
        }
    }

    /// Writes a fixed scalar into `dst`, which must be exactly its width.
    pub(crate) fn write_fixed(&self, dst: &mut [u8]) -> Result<()> {
        let width = self.code().fixed_size();
        ensure_layout!(
            width == Some(dst.len()),
            "{} does not fit a {}-byte slot",
            self.code(),
            dst.len()
        );
        match self {
            FieldValue::Null => {}
            FieldValue::Boolean(v) => dst[0] = *v as u8,
            FieldValue::Int8(v) => dst[0] = *v as u8,
            FieldValue::UInt8(v) => dst[0] = *v,
            FieldValue::Int16(v) => dst.copy_from_slice(&v.to_le_bytes()),
            FieldValue::UInt16(v) => dst.copy_from_slice(&v.to_le_bytes()),
            FieldValue::Int32(v) => dst.copy_from_slice(&v.to_le_bytes()),
            FieldValue::UInt32(v) => dst.copy_from_slice(&v.to_le_bytes()),
            FieldValue::Float32(v) => dst.copy_from_slice(&v.to_le_bytes()),
            FieldValue::Int64(v) | FieldValue::DateTime(v) => {
                dst.copy_from_slice(&v.to_le_bytes())
            }
            FieldValue::UInt64(v) => dst.copy_from_slice(&v.to_le_bytes()),
            FieldValue::Float64(v) => dst.copy_from_slice(&v.to_le_bytes()),
            FieldValue::Decimal(v) => dst.copy_from_slice(&v.to_bytes()),
            FieldValue::Guid(v) => dst.copy_from_slice(v),
            FieldValue::Utf8(_)
            | FieldValue::Binary(_)
            | FieldValue::VarInt(_)
            | FieldValue::VarUInt(_) => {}
        }
        Ok(())
    }

    /// Appends the inline encoding used by sparse fields and scope items.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            FieldValue::Utf8(s) => {
                push_varint(s.len() as u64, out);
                out.extend_from_slice(s.as_bytes());
            }
            FieldValue::Binary(b) => {
                push_varint(b.len() as u64, out);
                out.extend_from_slice(b);
            }
            _ => self.encode_column(out),
        }
    }

    /// Appends the encoding stored in a variable column or fixed slot.
    pub fn encode_column(&self, out: &mut Vec<u8>) {
        match self {
            FieldValue::Utf8(s) => out.extend_from_slice(s.as_bytes()),
            FieldValue::Binary(b) => out.extend_from_slice(b),
            FieldValue::VarInt(v) => {
                push_varint_signed(*v, out);
            }
            FieldValue::VarUInt(v) => {
                push_varint(*v, out);
            }
            fixed => {
                let start = out.len();
                let width = fixed.code().fixed_size().unwrap_or_default();
                out.resize(start + width, 0);
                // Width was taken from the value's own code.
                let _ = fixed.write_fixed(&mut out[start..]);
            }
        }
    }

    /// Decodes a fixed scalar from the start of `bytes`.
    pub fn decode_fixed(code: LayoutCode, bytes: &[u8]) -> Result<FieldValue<'static>> {
        let width = match code.fixed_size() {
            Some(width) => width,
            None => return Err(HybridRowError::corrupt(format!("{} is not fixed-size", code))),
        };
        ensure_layout!(
            bytes.len() >= width,
            "{} needs {} bytes, {} available",
            code,
            width,
            bytes.len()
        );
        let b = &bytes[..width];
        let value = match code {
            LayoutCode::Null => FieldValue::Null,
            LayoutCode::Boolean => match b[0] {
                0 => FieldValue::Boolean(false),
                1 => FieldValue::Boolean(true),
                other => {
                    return Err(HybridRowError::corrupt(format!(
                        "invalid boolean byte {}",
                        other
                    )))
                }
            },
            LayoutCode::Int8 => FieldValue::Int8(b[0] as i8),
            LayoutCode::UInt8 => FieldValue::UInt8(b[0]),
            LayoutCode::Int16 => FieldValue::Int16(i16::from_le_bytes([b[0], b[1]])),
            LayoutCode::UInt16 => FieldValue::UInt16(u16::from_le_bytes([b[0], b[1]])),
            LayoutCode::Int32 => FieldValue::Int32(i32::from_le_bytes(array4(b))),
            LayoutCode::UInt32 => FieldValue::UInt32(u32::from_le_bytes(array4(b))),
            LayoutCode::Float32 => FieldValue::Float32(f32::from_le_bytes(array4(b))),
            LayoutCode::Int64 => FieldValue::Int64(i64::from_le_bytes(array8(b))),
            LayoutCode::UInt64 => FieldValue::UInt64(u64::from_le_bytes(array8(b))),
            LayoutCode::Float64 => FieldValue::Float64(f64::from_le_bytes(array8(b))),
            LayoutCode::DateTime => FieldValue::DateTime(i64::from_le_bytes(array8(b))),
            LayoutCode::Decimal => FieldValue::Decimal(Decimal::from_bytes(&array16(b))?),
            LayoutCode::Guid => FieldValue::Guid(array16(b)),
            _ => return Err(HybridRowError::corrupt(format!("{} is not fixed-size", code))),
        };
        Ok(value)
    }

    /// Decodes an inline value and returns it with the number of bytes read.
    pub fn decode(code: LayoutCode, bytes: &'a [u8]) -> Result<(FieldValue<'a>, usize)> {
        match code {
            LayoutCode::Utf8 | LayoutCode::Binary => {
                let (len, n) = decode_varint(bytes)?;
                let len = len as usize;
                ensure_layout!(
                    bytes.len() - n >= len,
                    "{} length {} overruns {} available bytes",
                    code,
                    len,
                    bytes.len() - n
                );
                let value = Self::decode_column(code, &bytes[n..n + len])?;
                Ok((value, n + len))
            }
            LayoutCode::VarInt => {
                let (v, n) = decode_varint_signed(bytes)?;
                Ok((FieldValue::VarInt(v), n))
            }
            LayoutCode::VarUInt => {
                let (v, n) = decode_varint(bytes)?;
                Ok((FieldValue::VarUInt(v), n))
            }
            _ => {
                let value = Self::decode_fixed(code, bytes)?;
                Ok((value, code.fixed_size().unwrap_or_default()))
            }
        }
    }

    /// Decodes the full contents of a variable column.
    pub fn decode_column(code: LayoutCode, bytes: &'a [u8]) -> Result<FieldValue<'a>> {
        match code {
            LayoutCode::Utf8 => std::str::from_utf8(bytes)
                .map(|s| FieldValue::Utf8(Cow::Borrowed(s)))
                .map_err(|e| HybridRowError::corrupt(format!("invalid utf8: {}", e))),
            LayoutCode::Binary => Ok(FieldValue::Binary(Cow::Borrowed(bytes))),
            LayoutCode::VarInt | LayoutCode::VarUInt => {
                let (value, n) = Self::decode(code, bytes)?;
                ensure_layout!(
                    n == bytes.len(),
                    "{} column has {} trailing bytes",
                    code,
                    bytes.len() - n
                );
                Ok(value)
            }
            _ => Self::decode_fixed(code, bytes),
        }
    }

    /// Converts a JSON literal (column defaults in schema text) to a value of
    /// `code`.
    pub fn from_json(value: &JsonValue, code: LayoutCode) -> Result<FieldValue<'static>> {
        let bad = || HybridRowError::schema(format!("default {} is not a valid {}", value, code));
        let int = || value.as_i64().ok_or_else(bad);
        let uint = || value.as_u64().ok_or_else(bad);
        let parsed = match code {
            LayoutCode::Null if value.is_null() => FieldValue::Null,
            LayoutCode::Boolean => FieldValue::Boolean(value.as_bool().ok_or_else(bad)?),
            LayoutCode::Int8 => FieldValue::Int8(i8::try_from(int()?).map_err(|_| bad())?),
            LayoutCode::Int16 => FieldValue::Int16(i16::try_from(int()?).map_err(|_| bad())?),
            LayoutCode::Int32 => FieldValue::Int32(i32::try_from(int()?).map_err(|_| bad())?),
            LayoutCode::Int64 => FieldValue::Int64(int()?),
            LayoutCode::UInt8 => FieldValue::UInt8(u8::try_from(uint()?).map_err(|_| bad())?),
            LayoutCode::UInt16 => FieldValue::UInt16(u16::try_from(uint()?).map_err(|_| bad())?),
            LayoutCode::UInt32 => FieldValue::UInt32(u32::try_from(uint()?).map_err(|_| bad())?),
            LayoutCode::UInt64 => FieldValue::UInt64(uint()?),
            LayoutCode::VarInt => FieldValue::VarInt(int()?),
            LayoutCode::VarUInt => FieldValue::VarUInt(uint()?),
            LayoutCode::DateTime => FieldValue::DateTime(int()?),
            LayoutCode::Float32 => FieldValue::Float32(value.as_f64().ok_or_else(bad)? as f32),
            LayoutCode::Float64 => FieldValue::Float64(value.as_f64().ok_or_else(bad)?),
            LayoutCode::Decimal => {
                let text = match value {
                    JsonValue::String(s) => s.clone(),
                    JsonValue::Number(n) => n.to_string(),
                    _ => return Err(bad()),
                };
                FieldValue::Decimal(Decimal::parse(&text).ok_or_else(bad)?)
            }
            LayoutCode::Guid => {
                let text = value.as_str().ok_or_else(bad)?;
                FieldValue::Guid(parse_guid(text).ok_or_else(bad)?)
            }
            LayoutCode::Utf8 => {
                let text = value.as_str().ok_or_else(bad)?;
                FieldValue::Utf8(Cow::Owned(text.to_string()))
            }
            LayoutCode::Binary => {
                let items = value.as_array().ok_or_else(bad)?;
                let mut bytes = Vec::with_capacity(items.len());
                for item in items {
                    let byte = item.as_u64().and_then(|b| u8::try_from(b).ok());
                    bytes.push(byte.ok_or_else(bad)?);
                }
                FieldValue::Binary(Cow::Owned(bytes))
            }
            _ => return Err(bad()),
        };
        Ok(parsed)
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Boolean(v) => JsonValue::from(*v),
            FieldValue::Int8(v) => JsonValue::from(*v),
            FieldValue::Int16(v) => JsonValue::from(*v),
            FieldValue::Int32(v) => JsonValue::from(*v),
            FieldValue::Int64(v) | FieldValue::VarInt(v) | FieldValue::DateTime(v) => {
                JsonValue::from(*v)
            }
            FieldValue::UInt8(v) => JsonValue::from(*v),
            FieldValue::UInt16(v) => JsonValue::from(*v),
            FieldValue::UInt32(v) => JsonValue::from(*v),
            FieldValue::UInt64(v) | FieldValue::VarUInt(v) => JsonValue::from(*v),
            FieldValue::Float32(v) => float_json(*v as f64),
            FieldValue::Float64(v) => float_json(*v),
            FieldValue::Decimal(v) => JsonValue::String(v.to_string()),
            FieldValue::Guid(v) => JsonValue::String(format_guid(v)),
            FieldValue::Utf8(s) => JsonValue::String(s.to_string()),
            FieldValue::Binary(b) => JsonValue::from(b.to_vec()),
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Utf8(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

fn float_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Formats as `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` in byte order.
pub fn format_guid(bytes: &[u8; 16]) -> String {
    let mut out = String::with_capacity(36);
    for (i, b) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        out.push_str(&format!("{:02x}", b));
    }
    out
}

pub fn parse_guid(text: &str) -> Option<[u8; 16]> {
    let hex: Vec<u8> = text.bytes().filter(|&c| c != b'-').collect();
    if hex.len() != 32 {
        return None;
    }
    let mut out = [0u8; 16];
    for (i, pair) in hex.chunks(2).enumerate() {
        let s = std::str::from_utf8(pair).ok()?;
        out[i] = u8::from_str_radix(s, 16).ok()?;
    }
    Some(out)
}

fn array4(b: &[u8]) -> [u8; 4] {
    [b[0], b[1], b[2], b[3]]
}

fn array8(b: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&b[..8]);
    out
}

fn array16(b: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&b[..16]);
    out
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue<'_> {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Boolean,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    Decimal => Decimal,
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Utf8(Cow::Borrowed(value))
    }
}

impl From<String> for FieldValue<'_> {
    fn from(value: String) -> Self {
        FieldValue::Utf8(Cow::Owned(value))
    }
}

impl<'a> From<&'a [u8]> for FieldValue<'a> {
    fn from(value: &'a [u8]) -> Self {
        FieldValue::Binary(Cow::Borrowed(value))
    }
}

impl From<Vec<u8>> for FieldValue<'_> {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Binary(Cow::Owned(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_keeps_mantissa_sign_and_scale() {
        let d = Decimal::new(-12345, 2).unwrap();
        assert_eq!(d.mantissa(), -12345);
        assert_eq!(d.scale(), 2);
        assert!(d.is_negative());
        assert_eq!(d.to_string(), "-123.45");
        assert_eq!(Decimal::from_bytes(&d.to_bytes()).unwrap(), d);
    }

    #[test]
    fn decimal_rejects_out_of_range_parts() {
        assert!(Decimal::new(1 << 96, 0).is_none());
        assert!(Decimal::new((1 << 96) - 1, 0).is_some());
        assert!(Decimal::new(1, 29).is_none());

        let mut bytes = Decimal::ZERO.to_bytes();
        bytes[0] = 1;
        assert!(Decimal::from_bytes(&bytes).is_err());

        let mut bytes = Decimal::ZERO.to_bytes();
        bytes[2] = 29;
        assert!(Decimal::from_bytes(&bytes).is_err());
    }

    #[test]
    fn decimal_parse_and_display() {
        assert_eq!(Decimal::parse("0.05").unwrap().to_string(), "0.05");
        assert_eq!(Decimal::parse("-7").unwrap().mantissa(), -7);
        assert_eq!(Decimal::parse("12.500").unwrap().scale(), 3);
        assert!(Decimal::parse("1.2.3").is_none());
        assert!(Decimal::parse("").is_none());
    }

    #[test]
    fn fixed_values_decode_from_their_own_bytes() {
        let values = [
            FieldValue::Boolean(true),
            FieldValue::Int16(-2),
            FieldValue::UInt32(70000),
            FieldValue::Float64(1.5),
            FieldValue::DateTime(-637_000_000),
            FieldValue::Guid([7u8; 16]),
        ];
        for value in values {
            let mut out = Vec::new();
            value.encode(&mut out);
            assert_eq!(out.len(), value.code().fixed_size().unwrap());
            assert_eq!(FieldValue::decode_fixed(value.code(), &out).unwrap(), value);
        }
    }

    #[test]
    fn inline_and_column_forms_differ_only_for_text_and_binary() {
        let text = FieldValue::from("hey");
        let mut inline = Vec::new();
        text.encode(&mut inline);
        assert_eq!(inline, b"\x03hey");

        let mut column = Vec::new();
        text.encode_column(&mut column);
        assert_eq!(column, b"hey");

        let (decoded, read) = FieldValue::decode(LayoutCode::Utf8, &inline).unwrap();
        assert_eq!(decoded, text);
        assert_eq!(read, 4);

        let mut inline = Vec::new();
        FieldValue::VarInt(-1).encode(&mut inline);
        assert_eq!(inline, vec![1]);
    }

    #[test]
    fn decode_rejects_corrupt_input() {
        assert!(FieldValue::decode(LayoutCode::Utf8, &[5, b'a']).is_err());
        assert!(FieldValue::decode_column(LayoutCode::Utf8, &[0xFF, 0xFE]).is_err());
        assert!(FieldValue::decode_fixed(LayoutCode::Boolean, &[2]).is_err());
        assert!(FieldValue::decode_fixed(LayoutCode::Int64, &[0; 4]).is_err());
        assert!(FieldValue::decode_column(LayoutCode::VarUInt, &[1, 2]).is_err());
    }

    #[test]
    fn json_defaults_are_checked_against_the_code() {
        let v = FieldValue::from_json(&serde_json::json!(300), LayoutCode::Int16).unwrap();
        assert_eq!(v, FieldValue::Int16(300));

        assert!(FieldValue::from_json(&serde_json::json!(300), LayoutCode::Int8).is_err());
        assert!(FieldValue::from_json(&serde_json::json!("x"), LayoutCode::Int32).is_err());

        let d = FieldValue::from_json(&serde_json::json!("1.25"), LayoutCode::Decimal).unwrap();
        assert_eq!(d.to_json(), serde_json::json!("1.25"));
    }

    #[test]
    fn guid_text_form_round_trips() {
        let bytes: [u8; 16] = core::array::from_fn(|i| i as u8);
        let text = format_guid(&bytes);
        assert_eq!(text, "00010203-0405-0607-0809-0a0b0c0d0e0f");
        assert_eq!(parse_guid(&text), Some(bytes));
    }
}
