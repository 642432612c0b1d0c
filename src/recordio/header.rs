//! # Segment Header
//!
//! A segment starts with its total length, header included, so a reader can
//! find the next segment boundary without parsing the segment body.
//!
//! ```text
//! +--------------+-----------------+-------------+------+------+-----+
//! | length u32   | comment_len u32 | comment     | sdl  | rows | ... |
//! +--------------+-----------------+-------------+------+------+-----+
//! ```
//!
//! A header that is shorter than 4 bytes is a truncation, never corruption:
//! more bytes may still arrive.

use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::SEGMENT_LENGTH_SIZE;
use crate::error::{HybridRowError, Result};

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct SegmentHeader {
    length: U32,
}

const _: () = assert!(std::mem::size_of::<SegmentHeader>() == SEGMENT_LENGTH_SIZE);

impl SegmentHeader {
    pub fn new(length: u32) -> Self {
        Self {
            length: U32::new(length),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        if bytes.len() < SEGMENT_LENGTH_SIZE {
            return Err(HybridRowError::TruncatedSegment {
                needed: SEGMENT_LENGTH_SIZE,
                available: bytes.len(),
            });
        }
        Self::ref_from_bytes(&bytes[..SEGMENT_LENGTH_SIZE]).map_err(|e| {
            HybridRowError::CorruptSegment(format!("failed to parse segment header: {:?}", e))
        })
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        let available = bytes.len();
        if available < SEGMENT_LENGTH_SIZE {
            return Err(HybridRowError::TruncatedSegment {
                needed: SEGMENT_LENGTH_SIZE,
                available,
            });
        }
        Self::mut_from_bytes(&mut bytes[..SEGMENT_LENGTH_SIZE]).map_err(|e| {
            HybridRowError::CorruptSegment(format!("failed to parse segment header: {:?}", e))
        })
    }

    header_accessors! {
        length: u32,
    }
}
