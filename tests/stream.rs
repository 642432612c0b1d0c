//! # Record Stream Integration Tests
//!
//! Segments written to and read back from real files, including streams
//! larger than the read buffer and streams with damaged segments.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::sync::{Arc, Once};

use hybridrow::recordio::{parse_all, read_stream, write_stream, StreamStats};
use hybridrow::{
    HybridRowError, Namespace, RowBuffer, RowOptions, RowReader, RowWriter, SchemaId,
};
use tempfile::tempdir;

static INIT: Once = Once::new();

/// Routes crate logs to the test output. `RUST_LOG` overrides the level.
fn init_tracing() {
    INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

const SDL: &str = r#"{"schemas":[{"name":"event","id":4,"properties":[
    {"path":"seq","type":{"code":"uint32"}},
    {"path":"kind","type":{"code":"utf8"}}
]}]}"#;

fn rows(range: std::ops::Range<u32>) -> Vec<Vec<u8>> {
    let resolver = Namespace::parse(SDL).unwrap().compile().unwrap();
    let layout = resolver.resolve(SchemaId(4)).unwrap();
    let mut buffer = RowBuffer::new(layout, resolver, RowOptions::default()).unwrap();
    range
        .map(|seq| {
            RowWriter::write_buffer(&mut buffer, |w| {
                w.write_u32("seq", seq)?;
                w.write_utf8("kind", if seq % 2 == 0 { "even" } else { "odd" })
            })
            .unwrap();
            buffer.as_bytes().to_vec()
        })
        .collect()
}

fn seqs_of(segment: &hybridrow::ParsedSegment<'_>) -> Vec<u32> {
    let schemas = segment.segment.compile_schemas().unwrap();
    segment
        .rows
        .iter()
        .map(|bytes| {
            let row =
                RowBuffer::from_bytes(bytes.to_vec(), Arc::clone(&schemas), RowOptions::default())
                    .unwrap();
            let mut reader = RowReader::new(&row).unwrap();
            assert!(reader.seek("seq").unwrap());
            reader.read_u32().unwrap()
        })
        .collect()
}

#[test]
fn file_round_trip_across_read_chunks() -> eyre::Result<()> {
    init_tracing();
    let dir = tempdir()?;
    let path = dir.path().join("events.hr");

    {
        let mut out = BufWriter::new(File::create(&path)?);
        write_stream(&mut out, "first", SDL, rows(0..3))?;
        // Large enough to span several read chunks.
        write_stream(&mut out, "bulk", SDL, rows(3..1003))?;
        write_stream(&mut out, "empty", "", Vec::<Vec<u8>>::new())?;
        out.flush()?;
    }

    let mut comments = Vec::new();
    let mut seqs = Vec::new();
    let mut input = BufReader::new(File::open(&path)?);
    let stats = read_stream(&mut input, &RowOptions::default(), |segment| {
        comments.push(segment.segment.comment.clone());
        seqs.extend(seqs_of(segment));
        Ok(())
    })?;

    assert_eq!(
        stats,
        StreamStats {
            segments: 3,
            rows: 1003,
            skipped: 0
        }
    );
    assert_eq!(comments, vec!["first", "bulk", "empty"]);
    assert_eq!(seqs, (0..1003).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn segments_are_byte_identical_after_reframing() {
    let mut first = Vec::new();
    write_stream(&mut first, "c", SDL, rows(0..10)).unwrap();

    let parsed = parse_all(&first).unwrap();
    assert_eq!(parsed.len(), 1);
    let mut second = Vec::new();
    write_stream(
        &mut second,
        &parsed[0].segment.comment,
        &parsed[0].segment.sdl,
        &parsed[0].rows,
    )
    .unwrap();
    assert_eq!(first, second);
}

fn damaged_stream() -> Vec<u8> {
    let mut stream = Vec::new();
    write_stream(&mut stream, "a", SDL, rows(0..2)).unwrap();
    let damaged_at = stream.len();
    write_stream(&mut stream, "b", SDL, rows(2..4)).unwrap();
    write_stream(&mut stream, "c", SDL, rows(4..6)).unwrap();
    // Comment length of the middle segment now overruns the segment.
    stream[damaged_at + 4..damaged_at + 8].copy_from_slice(&u32::MAX.to_le_bytes());
    stream
}

#[test]
fn corrupt_segment_fails_the_stream_by_default() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("damaged.hr");
    std::fs::write(&path, damaged_stream()).unwrap();

    let mut visited = 0;
    let report = read_stream(
        &mut File::open(&path).unwrap(),
        &RowOptions::default(),
        |_| {
            visited += 1;
            Ok(())
        },
    )
    .unwrap_err();
    assert_eq!(visited, 1);
    assert!(matches!(
        report.downcast_ref::<HybridRowError>(),
        Some(HybridRowError::CorruptSegment(_))
    ));
}

#[test]
fn corrupt_segment_is_skipped_when_allowed() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("damaged.hr");
    std::fs::write(&path, damaged_stream()).unwrap();

    let mut seqs = Vec::new();
    let options = RowOptions::default().skip_corrupt_segments(true);
    let stats = read_stream(&mut File::open(&path).unwrap(), &options, |segment| {
        seqs.extend(seqs_of(segment));
        Ok(())
    })
    .unwrap();
    assert_eq!(
        stats,
        StreamStats {
            segments: 2,
            rows: 4,
            skipped: 1
        }
    );
    assert_eq!(seqs, vec![0, 1, 4, 5]);
}

#[test]
fn truncated_tail_is_never_skipped() {
    let mut stream = Vec::new();
    write_stream(&mut stream, "a", SDL, rows(0..2)).unwrap();
    stream.truncate(stream.len() - 3);

    let options = RowOptions::default().skip_corrupt_segments(true);
    let report = read_stream(&mut stream.as_slice(), &options, |_| Ok(())).unwrap_err();
    assert!(matches!(
        report.downcast_ref::<HybridRowError>(),
        Some(HybridRowError::TruncatedSegment { .. })
    ));
}

#[test]
fn visitor_errors_stop_the_stream() {
    let mut stream = Vec::new();
    write_stream(&mut stream, "a", SDL, rows(0..1)).unwrap();
    write_stream(&mut stream, "b", SDL, rows(1..2)).unwrap();

    let mut calls = 0;
    let result = read_stream(&mut stream.as_slice(), &RowOptions::default(), |_| {
        calls += 1;
        eyre::bail!("stop here")
    });
    assert!(result.is_err());
    assert_eq!(calls, 1);
}
