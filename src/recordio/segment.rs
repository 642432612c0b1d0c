//! # Segments
//!
//! A segment packages one schema description and the rows encoded against it.
//!
//! ```text
//! Segment := length u32 | comment_len u32 | comment | sdl_len u32 | sdl | Row*
//! Row     := schema_id u32 | row_length u32 | body
//! ```
//!
//! `length` counts the whole segment including its own four bytes. The writer
//! reserves it up front and patches it once the last row is appended.
//!
//! ## Validation
//!
//! | Condition | Error |
//! |-----------|-------|
//! | fewer than 4 bytes, or fewer than `length` | `TruncatedSegment` |
//! | `length` shorter than the smallest segment | `CorruptSegment` |
//! | comment or sdl overruns `length`, or is not UTF-8 | `CorruptSegment` |
//! | a row header overruns `length` or claims under 8 bytes | `CorruptSegment` |
//!
//! Rows are only framed here, not decoded. Decode each one with
//! `RowBuffer::from_bytes` against the schemas compiled from `sdl`.

use std::sync::Arc;

use tracing::debug;
use zerocopy::IntoBytes;

use crate::config::{MIN_SEGMENT_SIZE, ROW_HEADER_SIZE, SEGMENT_LENGTH_SIZE, STRING_PREFIX_SIZE};
use crate::error::{ensure_layout, HybridRowError, Result};
use crate::layouts::{LayoutResolver, Namespace};
use crate::recordio::header::SegmentHeader;
use crate::row::RowHeader;

/// Segment metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub comment: String,
    pub sdl: String,
    /// Total byte length, header included.
    pub length: u32,
}

impl Segment {
    /// Compiles the embedded schema description. An empty description yields an
    /// empty resolver.
    pub fn compile_schemas(&self) -> Result<Arc<LayoutResolver>> {
        if self.sdl.trim().is_empty() {
            return Ok(Arc::new(LayoutResolver::new()));
        }
        Namespace::parse(&self.sdl)?.compile()
    }
}

/// A segment and its rows, borrowed from the input bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSegment<'a> {
    pub segment: Segment,
    pub rows: Vec<&'a [u8]>,
}

pub struct SegmentWriter {
    bytes: Vec<u8>,
    rows: usize,
}

impl SegmentWriter {
    /// Starts a segment. Fails with `BufferTooSmall` when the comment and
    /// schema text alone overflow the `u32` segment length.
    pub fn new(comment: &str, sdl: &str) -> Result<Self> {
        let required = SEGMENT_LENGTH_SIZE + 2 * STRING_PREFIX_SIZE + comment.len() + sdl.len();
        check_segment_size(required)?;
        let mut bytes = Vec::with_capacity(required);
        bytes.extend_from_slice(SegmentHeader::new(0).as_bytes());
        for text in [comment, sdl] {
            bytes.extend_from_slice(&(text.len() as u32).to_le_bytes());
            bytes.extend_from_slice(text.as_bytes());
        }
        Ok(Self { bytes, rows: 0 })
    }

    /// Appends one encoded row. The row's header must describe exactly the
    /// bytes given.
    pub fn append_row(&mut self, row: &[u8]) -> Result<()> {
        let header = RowHeader::from_bytes(row)?;
        ensure_layout!(
            header.row_length() as usize == row.len(),
            "row_length {} disagrees with {} row bytes",
            header.row_length(),
            row.len()
        );
        check_segment_size(self.bytes.len() + row.len())?;
        self.bytes.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Patches the segment length and returns the finished bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let length = check_segment_size(self.bytes.len())?;
        SegmentHeader::from_bytes_mut(&mut self.bytes)?.set_length(length);
        debug!(length, rows = self.rows, "segment framed");
        Ok(self.bytes)
    }
}

/// Segment lengths are `u32` on the wire.
fn check_segment_size(required: usize) -> Result<u32> {
    u32::try_from(required).map_err(|_| HybridRowError::BufferTooSmall {
        required,
        limit: u32::MAX as usize,
    })
}

/// Frames `rows` into one segment.
pub fn write_segment<I>(comment: &str, sdl: &str, rows: I) -> Result<Vec<u8>>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut writer = SegmentWriter::new(comment, sdl)?;
    for row in rows {
        writer.append_row(row.as_ref())?;
    }
    writer.finish()
}

/// Declared length of the segment starting at `bytes`, if the header is there.
pub fn declared_length(bytes: &[u8]) -> Option<usize> {
    SegmentHeader::from_bytes(bytes)
        .ok()
        .map(|header| header.length() as usize)
}

fn read_string(segment: &[u8], at: usize, what: &str) -> Result<(String, usize)> {
    let corrupt = |reason: String| HybridRowError::CorruptSegment(format!("{}: {}", what, reason));
    if at + STRING_PREFIX_SIZE > segment.len() {
        return Err(corrupt(format!("length prefix at {} overruns segment", at)));
    }
    let mut prefix = [0u8; STRING_PREFIX_SIZE];
    prefix.copy_from_slice(&segment[at..at + STRING_PREFIX_SIZE]);
    let len = u32::from_le_bytes(prefix) as usize;
    let start = at + STRING_PREFIX_SIZE;
    if len > segment.len() - start {
        return Err(corrupt(format!("{} bytes overrun segment", len)));
    }
    let text = std::str::from_utf8(&segment[start..start + len])
        .map_err(|e| corrupt(format!("not utf8: {}", e)))?;
    Ok((text.to_string(), start + len))
}

/// Parses the segment at the start of `bytes`. Bytes past the declared length
/// are left alone.
pub fn parse_segment(bytes: &[u8]) -> Result<ParsedSegment<'_>> {
    let length = SegmentHeader::from_bytes(bytes)?.length() as usize;
    if length < MIN_SEGMENT_SIZE {
        return Err(HybridRowError::CorruptSegment(format!(
            "declared length {} below minimum {}",
            length, MIN_SEGMENT_SIZE
        )));
    }
    if bytes.len() < length {
        return Err(HybridRowError::TruncatedSegment {
            needed: length,
            available: bytes.len(),
        });
    }
    let segment = &bytes[..length];

    let (comment, pos) = read_string(segment, SEGMENT_LENGTH_SIZE, "comment")?;
    let (sdl, mut pos) = read_string(segment, pos, "sdl")?;

    let mut rows = Vec::new();
    while pos < length {
        if length - pos < ROW_HEADER_SIZE {
            return Err(HybridRowError::CorruptSegment(format!(
                "{} trailing bytes at {} cannot hold a row header",
                length - pos,
                pos
            )));
        }
        let row_length = RowHeader::from_bytes(&segment[pos..])
            .map_err(|e| HybridRowError::CorruptSegment(e.to_string()))?
            .row_length() as usize;
        if row_length < ROW_HEADER_SIZE || row_length > length - pos {
            return Err(HybridRowError::CorruptSegment(format!(
                "row {} at {} claims {} bytes, {} left in segment",
                rows.len(),
                pos,
                row_length,
                length - pos
            )));
        }
        rows.push(&segment[pos..pos + row_length]);
        pos += row_length;
    }

    Ok(ParsedSegment {
        segment: Segment {
            comment,
            sdl,
            length: length as u32,
        },
        rows,
    })
}
