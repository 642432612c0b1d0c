//! # Incremental Segment Parser
//!
//! `RecordIoParser` is fed the unconsumed prefix of a growing stream and
//! either asks for more bytes or hands back one whole segment.
//!
//! ## State Machine
//!
//! ```text
//!            ┌───────────────────────┐  < 4 bytes: NeedMore(4)
//!            │  NeedSegmentLength    │
//!            └───────────┬───────────┘
//!                        │ length known
//!                        ▼
//!            ┌───────────────────────┐  < length bytes: NeedMore(length)
//!            │  NeedSegment(length)  │
//!            └───────────┬───────────┘
//!                        │ parse_segment
//!                        ▼
//!          Segment { parsed, consumed = length }  ──> back to NeedSegmentLength
//! ```
//!
//! The caller owns the bytes. After a `Segment` outcome it drops `consumed`
//! bytes from the front and calls `process` again; after `NeedMore` it reads
//! until at least `needed` bytes are buffered.

use crate::config::{MIN_SEGMENT_SIZE, SEGMENT_LENGTH_SIZE};
use crate::error::{HybridRowError, Result};
use crate::recordio::header::SegmentHeader;
use crate::recordio::segment::{parse_segment, ParsedSegment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    NeedSegmentLength,
    NeedSegment { length: usize },
}

#[derive(Debug)]
pub enum ParseOutcome<'a> {
    /// At least `needed` bytes must be buffered before the next call.
    NeedMore { needed: usize },
    Segment {
        parsed: ParsedSegment<'a>,
        consumed: usize,
    },
}

#[derive(Debug)]
pub struct RecordIoParser {
    state: ParserState,
    segments: u64,
}

impl Default for RecordIoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordIoParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::NeedSegmentLength,
            segments: 0,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Segments produced so far.
    pub fn segments(&self) -> u64 {
        self.segments
    }

    /// Advances over `buf`, which must start at a segment boundary. On error
    /// the parser returns to `NeedSegmentLength`.
    pub fn process<'a>(&mut self, buf: &'a [u8]) -> Result<ParseOutcome<'a>> {
        if self.state == ParserState::NeedSegmentLength {
            if buf.len() < SEGMENT_LENGTH_SIZE {
                return Ok(ParseOutcome::NeedMore {
                    needed: SEGMENT_LENGTH_SIZE,
                });
            }
            let length = SegmentHeader::from_bytes(buf)?.length() as usize;
            if length < MIN_SEGMENT_SIZE {
                return Err(HybridRowError::CorruptSegment(format!(
                    "declared length {} below minimum {}",
                    length, MIN_SEGMENT_SIZE
                )));
            }
            self.state = ParserState::NeedSegment { length };
        }

        let ParserState::NeedSegment { length } = self.state else {
            return Ok(ParseOutcome::NeedMore {
                needed: SEGMENT_LENGTH_SIZE,
            });
        };
        if buf.len() < length {
            return Ok(ParseOutcome::NeedMore { needed: length });
        }

        self.state = ParserState::NeedSegmentLength;
        let parsed = parse_segment(&buf[..length])?;
        self.segments += 1;
        Ok(ParseOutcome::Segment {
            parsed,
            consumed: length,
        })
    }
}

/// Parses every segment in an in-memory stream. A trailing partial segment is
/// `TruncatedSegment`.
pub fn parse_all(bytes: &[u8]) -> Result<Vec<ParsedSegment<'_>>> {
    let mut parser = RecordIoParser::new();
    let mut segments = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        match parser.process(&bytes[pos..])? {
            ParseOutcome::NeedMore { needed } => {
                return Err(HybridRowError::TruncatedSegment {
                    needed,
                    available: bytes.len() - pos,
                })
            }
            ParseOutcome::Segment { parsed, consumed } => {
                segments.push(parsed);
                pos += consumed;
            }
        }
    }
    Ok(segments)
}
