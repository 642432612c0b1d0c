//! # Rows
//!
//! The byte-level representation of one row and the values stored in it.
//!
//! ## Module Structure
//!
//! - `header`: the 8-byte zerocopy `RowHeader` (schema id, total length)
//! - `value`: `FieldValue`, `Decimal`, and the scalar wire encodings
//! - `sparse`: self-delimiting sparse entries and scope items
//! - `buffer`: `RowBuffer`, the owned row plus its physical primitives
//!
//! ## Scalar Encodings
//!
//! | Code | Fixed slot | Variable column | Inline (sparse, item) |
//! |------|------------|-----------------|-----------------------|
//! | bool, int*, uint*, float*, datetime | little-endian, natural width | n/a | same as fixed |
//! | decimal | flags u32, hi u32, lo u64 | n/a | same as fixed |
//! | guid | 16 bytes in order | n/a | same as fixed |
//! | utf8, binary | n/a | raw bytes | varint length + bytes |
//! | varint | n/a | zigzag varint | zigzag varint |
//! | varuint | n/a | varint | varint |
//! | null | 0 bytes | n/a | 0 bytes |

pub mod buffer;
pub mod header;
pub mod sparse;
pub mod value;


pub use buffer::{RowBuffer, ScopeFrame};
pub use header::RowHeader;
pub use value::{format_guid, parse_guid, Decimal, FieldValue, MAX_DECIMAL_SCALE};
