//! # HybridRow - Schema-Driven Binary Rows
//!
//! HybridRow encodes semi-structured records into a dense byte buffer that can
//! be navigated, read and edited field by field without deserializing the
//! whole record. Schematized columns sit at fixed positions; anything the
//! schema does not declare rides along as path-tagged sparse fields in the
//! same row.
//!
//! - **Fixed columns**: constant width and offset, read in constant time
//! - **Variable columns**: packed back to back behind a varint offset table
//! - **Sparse fields**: `path | type | value` entries, declared or not
//! - **Scopes**: arrays, sets, maps, tuples, nullables, objects and nested
//!   schemas, each prefixed by its byte length and item count
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use hybridrow::{ColumnDef, LayoutBuilder, LayoutCode, LayoutResolver, RowBuffer,
//!                 RowOptions, RowReader, RowWriter, SchemaId};
//!
//! let resolver = Arc::new(LayoutResolver::new());
//! let layout = resolver.compile(
//!     &LayoutBuilder::new("person", SchemaId(1))
//!         .column(ColumnDef::new("id", LayoutCode::Int32))
//!         .column(ColumnDef::new("name", LayoutCode::Utf8)),
//! )?;
//!
//! let mut row = RowBuffer::new(layout, resolver, RowOptions::default())?;
//! RowWriter::write_buffer(&mut row, |w| {
//!     w.write_i32("id", 7)?;
//!     w.write_utf8("name", "Ada")?;
//!     w.write_bool("admin", true)
//! })?;
//!
//! let mut reader = RowReader::new(&row)?;
//! while reader.read()? {
//!     println!("{:?} = {}", reader.path(), reader.read_value()?);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  recordio: segments of rows + schema text   │
//! ├─────────────────────────────────────────────┤
//! │  io: RowReader / RowWriter / RowEditor      │
//! ├─────────────────────────────────────────────┤
//! │  row: RowBuffer, FieldValue, sparse entries │
//! ├─────────────────────────────────────────────┤
//! │  layouts: codes, type arguments, Layout,    │
//! │           LayoutResolver, SDL compiler      │
//! ├─────────────────────────────────────────────┤
//! │  encoding: varints       config: RowOptions │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`layouts`]: the type system and layout compilation
//! - [`row`]: the row buffer and scalar encodings
//! - [`io`]: cursors over rows
//! - [`recordio`]: segment framing for row streams
//! - [`encoding`]: LEB128 and zigzag varints
//! - [`config`]: wire constants and `RowOptions`
//! - [`error`]: the `HybridRowError` taxonomy

#[macro_use]
mod macros;

pub mod config;
pub mod encoding;
pub mod error;
pub mod io;
pub mod layouts;
pub mod recordio;
pub mod row;

pub use config::RowOptions;
pub use error::{HybridRowError, Result};
pub use io::{DataItem, ReaderState, RowEditor, RowReader, RowSerializable, RowWriter};
pub use layouts::{
    ColumnDef, Layout, LayoutBuilder, LayoutCode, LayoutResolver, Namespace, SchemaId, StorageKind,
    TypeArgument,
};
pub use recordio::{parse_segment, ParsedSegment, RecordIoParser, Segment, SegmentWriter};
pub use row::{Decimal, FieldValue, RowBuffer};
