//! # Stream Helpers
//!
//! Segment framing over `std::io`. These are the only functions in the crate
//! that do I/O, so they return `eyre::Result` with context attached. The typed
//! framing error stays reachable:
//!
//! ```ignore
//! match read_stream(&mut file, &options, |segment| Ok(())) {
//!     Err(report) if matches!(
//!         report.downcast_ref::<HybridRowError>(),
//!         Some(HybridRowError::TruncatedSegment { .. })
//!     ) => { /* partial tail */ }
//!     other => { other?; }
//! }
//! ```
//!
//! ## Corrupt Segments
//!
//! With `RowOptions::skip_corrupt_segments`, a segment that fails validation
//! but whose declared length is fully buffered is skipped with a warning and
//! reading resumes at the next boundary. Truncation is never skipped.

use std::io::{ErrorKind, Read, Write};

use eyre::{Result, WrapErr};
use tracing::{debug, warn};

use crate::config::{RowOptions, DEFAULT_STREAM_BUFFER_SIZE, MIN_SEGMENT_SIZE};
use crate::error::HybridRowError;
use crate::recordio::parser::{ParseOutcome, RecordIoParser};
use crate::recordio::segment::{declared_length, write_segment, ParsedSegment};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub segments: usize,
    pub rows: usize,
    pub skipped: usize,
}

/// Frames `rows` as one segment and writes it. Returns the bytes written.
pub fn write_stream<W, I>(writer: &mut W, comment: &str, sdl: &str, rows: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let bytes = write_segment(comment, sdl, rows).wrap_err("failed to frame segment")?;
    writer
        .write_all(&bytes)
        .wrap_err_with(|| format!("failed to write {}-byte segment", bytes.len()))?;
    Ok(bytes.len())
}

enum Step {
    Fill { needed: usize },
    Advance { consumed: usize },
    Fail(HybridRowError),
}

/// Reads segments until end of stream, calling `visit` for each.
pub fn read_stream<R, F>(reader: &mut R, options: &RowOptions, mut visit: F) -> Result<StreamStats>
where
    R: Read,
    F: FnMut(&ParsedSegment<'_>) -> Result<()>,
{
    let mut parser = RecordIoParser::new();
    let mut stats = StreamStats::default();
    let mut buf: Vec<u8> = Vec::with_capacity(DEFAULT_STREAM_BUFFER_SIZE);
    let mut chunk = vec![0u8; DEFAULT_STREAM_BUFFER_SIZE];
    let mut start = 0usize;

    loop {
        let step = match parser.process(&buf[start..]) {
            Ok(ParseOutcome::NeedMore { needed }) => Step::Fill { needed },
            Ok(ParseOutcome::Segment { parsed, consumed }) => {
                visit(&parsed).wrap_err_with(|| {
                    format!("segment {} rejected by visitor", stats.segments)
                })?;
                stats.segments += 1;
                stats.rows += parsed.rows.len();
                Step::Advance { consumed }
            }
            Err(err) => Step::Fail(err),
        };

        match step {
            Step::Advance { consumed } => start += consumed,
            Step::Fill { needed } => {
                if start > 0 {
                    buf.drain(..start);
                    start = 0;
                }
                let n = loop {
                    match reader.read(&mut chunk) {
                        Ok(n) => break n,
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e).wrap_err("failed to read record stream"),
                    }
                };
                if n == 0 {
                    if buf.is_empty() {
                        break;
                    }
                    let err = HybridRowError::TruncatedSegment {
                        needed,
                        available: buf.len(),
                    };
                    return Err(err).wrap_err("record stream ended inside a segment");
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            Step::Fail(err) => {
                let available = buf.len() - start;
                let skippable = match (&err, declared_length(&buf[start..])) {
                    (HybridRowError::CorruptSegment(_), Some(length)) => {
                        length >= MIN_SEGMENT_SIZE && length <= available
                    }
                    _ => false,
                };
                if !(skippable && options.skips_corrupt_segments()) {
                    return Err(err)
                        .wrap_err_with(|| format!("bad segment after {} segments", stats.segments));
                }
                let length = declared_length(&buf[start..]).unwrap_or(available);
                warn!(segment = stats.segments + stats.skipped, length, error = %err, "skipping corrupt segment");
                stats.skipped += 1;
                start += length;
            }
        }
    }

    debug!(segments = stats.segments, rows = stats.rows, skipped = stats.skipped, "record stream read");
    Ok(stats)
}
