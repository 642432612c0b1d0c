//! # Row Cursors
//!
//! Everything that walks or builds a row through its layout.
//!
//! | Type | Borrows | Purpose |
//! |------|---------|---------|
//! | `RowReader` | `&RowBuffer` | forward-only traversal and typed reads |
//! | `RowWriter` | `&mut RowBuffer` | builds a row front to back, scope by scope |
//! | `RowEditor` | `&mut RowBuffer` | in-place updates of top-level fields |
//! | `RowSerializable` | n/a | values that write themselves through a `RowWriter` |
//!
//! The borrow rules give the concurrency model: any number of readers may share
//! a buffer, and a writer or editor excludes everything else.

pub mod editor;
pub mod json;
pub mod reader;
pub mod serializable;
pub mod writer;

pub use editor::RowEditor;
pub use json::DataItem;
pub use reader::{ReaderState, RowReader};
pub use serializable::RowSerializable;
pub use writer::RowWriter;
