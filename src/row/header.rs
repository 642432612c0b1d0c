//! # Row Header
//!
//! Every row starts with an 8-byte header naming its layout and its total
//! length. The header is a zerocopy struct so it can be read straight out of
//! (and patched straight into) the row bytes.
//!
//! ```text
//! +----------------+----------------+
//! | schema_id u32  | row_length u32 |
//! +----------------+----------------+
//! ```
//!
//! `row_length` counts the whole row, header included, and always equals the
//! length of the buffer holding the row.

use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::ROW_HEADER_SIZE;
use crate::error::{HybridRowError, Result};
use crate::layouts::SchemaId;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RowHeader {
    schema_id: U32,
    row_length: U32,
}

const _: () = assert!(std::mem::size_of::<RowHeader>() == ROW_HEADER_SIZE);

impl RowHeader {
    pub fn new(schema_id: SchemaId, row_length: u32) -> Self {
        Self {
            schema_id: U32::new(schema_id.0),
            row_length: U32::new(row_length),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        if bytes.len() < ROW_HEADER_SIZE {
            return Err(HybridRowError::corrupt(format!(
                "row of {} bytes has no room for its {}-byte header",
                bytes.len(),
                ROW_HEADER_SIZE
            )));
        }
        Self::ref_from_bytes(&bytes[..ROW_HEADER_SIZE])
            .map_err(|e| HybridRowError::corrupt(format!("failed to parse row header: {:?}", e)))
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        if bytes.len() < ROW_HEADER_SIZE {
            return Err(HybridRowError::corrupt("row header missing"));
        }
        Self::mut_from_bytes(&mut bytes[..ROW_HEADER_SIZE])
            .map_err(|e| HybridRowError::corrupt(format!("failed to parse row header: {:?}", e)))
    }

    header_accessors! {
        schema_id: u32,
        row_length: u32,
    }

    pub fn schema(&self) -> SchemaId {
        SchemaId(self.schema_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_little_endian_on_the_wire() {
        let header = RowHeader::new(SchemaId(0x0102_0304), 20);
        assert_eq!(header.as_bytes(), &[4, 3, 2, 1, 20, 0, 0, 0]);
    }

    #[test]
    fn patch_in_place() {
        let mut bytes = vec![0u8; 12];
        bytes[..8].copy_from_slice(RowHeader::new(SchemaId(9), 12).as_bytes());

        RowHeader::from_bytes_mut(&mut bytes)
            .unwrap()
            .set_row_length(40);

        let header = RowHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.schema(), SchemaId(9));
        assert_eq!(header.row_length(), 40);
    }

    #[test]
    fn short_input_is_corrupt() {
        assert!(matches!(
            RowHeader::from_bytes(&[1, 2, 3]),
            Err(HybridRowError::CorruptLayout(_))
        ));
    }
}
