//! # RowEditor
//!
//! In-place mutation of an existing row. Unlike the writer, the editor has no
//! ordering rules: any top-level field can be changed at any time.
//!
//! | Target | `set` | `set_null` |
//! |--------|-------|------------|
//! | fixed column | overwrite the slot, set the bit | zero the slot, clear the bit |
//! | variable column | resize in place (shifts later bytes) | shrink to empty, clear the bit |
//! | sparse scalar | replace the value, or append a new entry | remove the entry |
//!
//! A sparse field keeps its type for its whole life: setting it to a value of a
//! different type fails with `TypeMismatch`. Remove it first to change type.
//! Required columns cannot be cleared.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::trace;

use crate::config::ROW_HEADER_SIZE;
use crate::error::{HybridRowError, Result};
use crate::layouts::{SchematizedColumn, TypeArgument};
use crate::row::sparse::{encode_entry_header, find_entry, SparseEntry};
use crate::row::{FieldValue, RowBuffer};

pub struct RowEditor<'b> {
    buffer: &'b mut RowBuffer,
}

impl<'b> RowEditor<'b> {
    pub fn new(buffer: &'b mut RowBuffer) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &RowBuffer {
        self.buffer
    }

    fn find_sparse(&self, path: &str) -> Result<Option<SparseEntry>> {
        let start = self.buffer.sparse_start()?;
        find_entry(self.buffer.as_bytes(), start, self.buffer.len(), path)
    }

    /// Reads a top-level scalar. Absent schematized columns and missing sparse
    /// fields read as None.
    pub fn get(&self, path: &str) -> Result<Option<FieldValue<'_>>> {
        let layout = Arc::clone(self.buffer.layout());
        let buffer: &RowBuffer = self.buffer;
        match layout.schematized(path) {
            Some(SchematizedColumn::Fixed(c)) => match buffer.read_fixed(c)? {
                FieldValue::Null if !buffer.test_null_bit(c.null_bit_index) => Ok(None),
                value => Ok(Some(value)),
            },
            Some(SchematizedColumn::Variable(c)) => {
                if !buffer.test_null_bit(c.null_bit_index) {
                    return Ok(None);
                }
                let bytes = buffer.read_variable(c.variable_index)?;
                FieldValue::decode_column(c.type_arg.code, bytes).map(Some)
            }
            None => match self.find_sparse(path)? {
                Some(entry) if entry.type_arg.code.is_scope() => Err(HybridRowError::mismatch(
                    path,
                    "scalar",
                    entry.type_arg.code,
                )),
                Some(entry) => {
                    let bytes = &buffer.as_bytes()[entry.value.clone()];
                    Ok(Some(FieldValue::decode(entry.type_arg.code, bytes)?.0))
                }
                None => Ok(None),
            },
        }
    }

    pub fn set(&mut self, path: &str, value: &FieldValue<'_>) -> Result<()> {
        let layout = Arc::clone(self.buffer.layout());
        let code = value.code();
        if let Some(column) = layout.schematized(path) {
            if column.code() != code {
                return Err(HybridRowError::mismatch(path, column.type_arg(), code));
            }
            return match column {
                SchematizedColumn::Fixed(c) => self.buffer.write_fixed(c, value),
                SchematizedColumn::Variable(c) => {
                    let mut raw = Vec::new();
                    value.encode_column(&mut raw);
                    self.buffer.write_variable(c.variable_index, &raw)
                }
            };
        }

        let type_arg = TypeArgument::scalar(code);
        if let Some(declared) = layout.sparse(path) {
            if declared.type_arg != type_arg {
                return Err(HybridRowError::mismatch(path, &declared.type_arg, code));
            }
        }

        match self.find_sparse(path)? {
            Some(entry) => {
                if entry.type_arg != type_arg {
                    return Err(HybridRowError::mismatch(path, &entry.type_arg, code));
                }
                let mut encoded = Vec::new();
                value.encode(&mut encoded);
                self.buffer.replace_bytes(entry.value.clone(), &encoded)?;
                trace!(path, old_len = entry.value.len(), new_len = encoded.len(), "sparse field replaced");
                Ok(())
            }
            None => {
                let mut encoded = Vec::new();
                encode_entry_header(path, &type_arg, &mut encoded);
                value.encode(&mut encoded);
                self.buffer.append_bytes(&encoded)
            }
        }
    }

    pub fn set_utf8(&mut self, path: &str, value: &str) -> Result<()> {
        self.set(path, &FieldValue::Utf8(Cow::Borrowed(value)))
    }

    /// Makes a field absent. Missing sparse fields are `NotFound`.
    pub fn set_null(&mut self, path: &str) -> Result<()> {
        let layout = Arc::clone(self.buffer.layout());
        match layout.schematized(path) {
            Some(column) if column.required() => {
                Err(HybridRowError::MissingRequiredField(path.to_string()))
            }
            Some(SchematizedColumn::Fixed(c)) => {
                self.buffer.clear_fixed_at(ROW_HEADER_SIZE, &layout, c)
            }
            Some(SchematizedColumn::Variable(c)) => {
                self.buffer
                    .clear_variable_at(ROW_HEADER_SIZE, &layout, c.variable_index)
            }
            None => self.remove_sparse(path),
        }
    }

    /// Removes a top-level sparse field, scalar or scope.
    pub fn remove_sparse(&mut self, path: &str) -> Result<()> {
        let entry = self
            .find_sparse(path)?
            .ok_or_else(|| HybridRowError::NotFound(path.to_string()))?;
        self.buffer.remove_bytes(entry.start..entry.end())?;
        trace!(path, removed = entry.end() - entry.start, "sparse field removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RowOptions;
    use crate::io::RowWriter;
    use crate::layouts::{ColumnDef, LayoutBuilder, LayoutCode, LayoutResolver, SchemaId};

    fn row() -> RowBuffer {
        let resolver = Arc::new(LayoutResolver::new());
        let layout = resolver
            .compile(
                &LayoutBuilder::new("e", SchemaId(4))
                    .column(ColumnDef::new("id", LayoutCode::Int32))
                    .column(ColumnDef::new("name", LayoutCode::Utf8))
                    .column(ColumnDef::new("note", LayoutCode::Utf8)),
            )
            .unwrap();
        let mut buffer = RowBuffer::new(layout, resolver, RowOptions::default()).unwrap();
        RowWriter::write_buffer(&mut buffer, |w| {
            w.write_i32("id", 1)?;
            w.write_utf8("name", "ab")?;
            w.write_utf8("note", "cd")?;
            w.write_varuint("count", 3)
        })
        .unwrap();
        buffer
    }

    #[test]
    fn variable_resize_keeps_neighbours() {
        let mut buffer = row();
        let mut editor = RowEditor::new(&mut buffer);
        editor.set_utf8("name", "a much longer name").unwrap();
        assert_eq!(editor.get("name").unwrap(), Some(FieldValue::from("a much longer name")));
        assert_eq!(editor.get("note").unwrap(), Some(FieldValue::from("cd")));
        assert_eq!(editor.get("count").unwrap(), Some(FieldValue::VarUInt(3)));
    }

    #[test]
    fn sparse_replace_and_append() {
        let mut buffer = row();
        let mut editor = RowEditor::new(&mut buffer);
        editor.set("count", &FieldValue::VarUInt(100_000)).unwrap();
        editor.set("flag", &FieldValue::Boolean(true)).unwrap();
        assert_eq!(editor.get("count").unwrap(), Some(FieldValue::VarUInt(100_000)));
        assert_eq!(editor.get("flag").unwrap(), Some(FieldValue::Boolean(true)));

        let err = editor.set("count", &FieldValue::Int8(1)).unwrap_err();
        assert!(matches!(err, HybridRowError::TypeMismatch { .. }));
    }

    #[test]
    fn set_null_and_remove() {
        let mut buffer = row();
        let mut editor = RowEditor::new(&mut buffer);
        editor.set_null("id").unwrap();
        editor.set_null("name").unwrap();
        editor.set_null("count").unwrap();
        assert_eq!(editor.get("id").unwrap(), None);
        assert_eq!(editor.get("name").unwrap(), None);
        assert_eq!(editor.get("count").unwrap(), None);
        assert_eq!(editor.get("note").unwrap(), Some(FieldValue::from("cd")));

        assert_eq!(
            editor.remove_sparse("count").unwrap_err(),
            HybridRowError::NotFound("count".to_string())
        );
        let len = editor.buffer().len();
        assert_eq!(editor.buffer().header().unwrap().row_length() as usize, len);
    }
}
