//! # Variable-Length Integer Encoding
//!
//! LEB128-style varints used for variable offset tables, string and binary
//! length prefixes, sparse path lengths, and the `VarInt`/`VarUInt` scalar
//! types. Signed values go through zigzag first so small negative numbers stay
//! short.
//!
//! ## Encoding Format
//!
//! Seven payload bits per byte, least significant group first. The high bit of
//! each byte is the continuation flag.
//!
//! | Value Range                | Bytes |
//! |----------------------------|-------|
//! | 0 - 127                    | 1     |
//! | 128 - 16383                | 2     |
//! | 16384 - 2097151            | 3     |
//! | 2097152 - 268435455        | 4     |
//! | ...                        | ...   |
//! | 2^63 - u64::MAX            | 10    |
//!
//! ## Zigzag
//!
//! ```text
//!  0 -> 0    -1 -> 1    1 -> 2    -2 -> 3    i64::MIN -> u64::MAX
//! ```
//!
//! ## Error Handling
//!
//! `decode_varint` rejects truncated input and encodings longer than ten bytes
//! with `CorruptLayout`, since varints only ever come out of row bytes.

use crate::error::{HybridRowError, Result};

/// Longest encoding of a u64.
pub const MAX_VARINT_LEN: usize = 10;

pub fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Writes `value` into `buf` and returns the number of bytes written.
///
/// `buf` must hold at least `varint_len(value)` bytes.
pub fn encode_varint(mut value: u64, buf: &mut [u8]) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    i + 1
}

/// Appends the encoding of `value` to `out`.
pub fn push_varint(value: u64, out: &mut Vec<u8>) -> usize {
    let mut tmp = [0u8; MAX_VARINT_LEN];
    let n = encode_varint(value, &mut tmp);
    out.extend_from_slice(&tmp[..n]);
    n
}

pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        let bits = (byte & 0x7F) as u64;
        if i == MAX_VARINT_LEN - 1 && bits > 1 {
            return Err(HybridRowError::corrupt("varint overflows u64"));
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Err(HybridRowError::corrupt("varint longer than 10 bytes"))
    } else {
        Err(HybridRowError::corrupt(format!(
            "truncated varint after {} bytes",
            buf.len()
        )))
    }
}

#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub fn push_varint_signed(value: i64, out: &mut Vec<u8>) -> usize {
    push_varint(zigzag_encode(value), out)
}

pub fn decode_varint_signed(buf: &[u8]) -> Result<(i64, usize)> {
    let (raw, n) = decode_varint(buf)?;
    Ok((zigzag_decode(raw), n))
}
