//! # Encoding Module
//!
//! Low-level encoding helpers shared by the row buffer and the cursors:
//!
//! - **Varint encoding**: LEB128 and zigzag varints for offset tables, length
//!   prefixes and the `VarInt`/`VarUInt` scalar types

pub mod varint;

pub use varint::{
    decode_varint, decode_varint_signed, encode_varint, push_varint, push_varint_signed,
    varint_len, zigzag_decode, zigzag_encode, MAX_VARINT_LEN,
};
