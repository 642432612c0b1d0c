//! Fuzz testing for segment framing.
//!
//! Arbitrary byte streams go through the incremental parser in arbitrary
//! chunk sizes. Parsing must never panic, and a stream that parses must
//! reframe to the same bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;

use hybridrow::recordio::{parse_all, write_segment, ParseOutcome, RecordIoParser};

fuzz_target!(|data: &[u8]| {
    let Ok(segments) = parse_all(data) else {
        return;
    };

    let mut reframed = Vec::with_capacity(data.len());
    for parsed in &segments {
        let bytes = write_segment(&parsed.segment.comment, &parsed.segment.sdl, &parsed.rows)
            .expect("parsed rows reframe");
        reframed.extend_from_slice(&bytes);
    }
    assert_eq!(reframed, data);

    // Feeding the stream one byte at a time finds the same boundaries.
    let mut parser = RecordIoParser::new();
    let mut start = 0;
    let mut end = 0;
    let mut found = 0;
    while start < data.len() {
        match parser.process(&data[start..end]).expect("valid stream") {
            ParseOutcome::NeedMore { .. } => end += 1,
            ParseOutcome::Segment { consumed, .. } => {
                start += consumed;
                found += 1;
            }
        }
    }
    assert_eq!(found, segments.len());
});
