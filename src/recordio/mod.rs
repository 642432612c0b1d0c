//! # RecordIO
//!
//! Framing for streams of rows. A stream is a sequence of segments; each
//! segment carries a free-text comment, the schema description (SDL) the rows
//! were written against, and the rows themselves.
//!
//! ## Module Structure
//!
//! - `header`: the 4-byte zerocopy `SegmentHeader`
//! - `segment`: `SegmentWriter` and `parse_segment` for one segment
//! - `parser`: `RecordIoParser`, incremental parsing over a growing buffer
//! - `stream`: `write_stream` / `read_stream` over `std::io`
//!
//! ## Example
//!
//! ```ignore
//! let mut writer = SegmentWriter::new("nightly export", &namespace.to_sdl()?)?;
//! for row in &rows {
//!     writer.append_row(row.as_bytes())?;
//! }
//! let bytes = writer.finish()?;
//!
//! let parsed = parse_segment(&bytes)?;
//! let resolver = parsed.segment.compile_schemas()?;
//! for row in parsed.rows {
//!     let buffer = RowBuffer::from_bytes(row.to_vec(), Arc::clone(&resolver), options)?;
//! }
//! ```

pub mod header;
pub mod parser;
pub mod segment;
pub mod stream;

pub use header::SegmentHeader;
pub use parser::{parse_all, ParseOutcome, ParserState, RecordIoParser};
pub use segment::{declared_length, parse_segment, write_segment, ParsedSegment, Segment, SegmentWriter};
pub use stream::{read_stream, write_stream, StreamStats};
