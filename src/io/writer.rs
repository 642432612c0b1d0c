//! # RowWriter
//!
//! Builds a row front to back. A writer is bound to one scope: the top-level
//! row, or a nested scope opened with `write_scope`. Nested writers reborrow the
//! buffer, so only the innermost scope is writable at any time and the open
//! scope is always at the end of the buffer.
//!
//! ## Write Rules
//!
//! | Scope | Rule |
//! |-------|------|
//! | row, schema | schematized columns in layout order, then sparse fields |
//! | row, schema, object | a path declared with a type must be written with that type |
//! | typed_array, typed_set, nullable | every item has the declared item type |
//! | tuple, typed_tuple | item `i` has type argument `i`; all items must be written |
//! | map | items are 2-item `tuple` scopes |
//! | typed_map | items are `typed_tuple<K, V>` scopes |
//! | set, typed_set | no two items share an encoding |
//! | map, typed_map | no two items share a key |
//! | nullable | at most one item |
//!
//! ## Scope Lifecycle
//!
//! ```text
//! write_scope(path, type)
//!     │
//!     ├─> append entry header + 8-byte placeholder (+ empty body for schema)
//!     ├─> push ScopeFrame
//!     ├─> body(&mut child)
//!     ├─> close: fill defaults / check required / check tuple arity
//!     ├─> pop ScopeFrame (depth must match)
//!     └─> patch byte_length and item_count into the placeholder
//! ```
//!
//! Any failure truncates the buffer back to where the scope started and drops
//! the frames it pushed, so the parent scope is left as it was.
//!
//! ## Required Columns
//!
//! When a schema scope (or the row) closes, every required column that was
//! not written is filled from its default if `RowOptions::fill_defaults` is
//! set, otherwise the close fails with `MissingRequiredField`.

use std::borrow::Cow;
use std::sync::Arc;

use hashbrown::HashSet;

use crate::config::{ROW_HEADER_SIZE, SCOPE_PREFIX_SIZE};
use crate::error::{HybridRowError, Result};
use crate::layouts::{Layout, LayoutCode, SchematizedColumn, TypeArgument};
use crate::row::sparse::{encode_entry_header, parse_item};
use crate::row::{Decimal, FieldValue, RowBuffer, ScopeFrame};

pub struct RowWriter<'b> {
    buffer: &'b mut RowBuffer,
    path: String,
    scope: TypeArgument,
    udt: Option<Arc<Layout>>,
    body_start: usize,
    /// Offset of the scope prefix. None for the top-level row.
    prefix_at: Option<usize>,
    depth: usize,
    next_column: usize,
    sparse_started: bool,
    count: u32,
    unique: Option<HashSet<Vec<u8>>>,
}

macro_rules! scalar_writers {
    ($($name:ident($ty:ty) => $variant:ident),* $(,)?) => {
        $(
            pub fn $name(&mut self, path: &str, value: $ty) -> Result<()> {
                self.write_value(path, &FieldValue::$variant(value))
            }
        )*
    };
}

impl<'b> RowWriter<'b> {
    /// Resets `buffer` and writes a whole row with `body`. On failure the
    /// buffer is reset again, so it never holds a partial row.
    pub fn write_buffer<F>(buffer: &mut RowBuffer, body: F) -> Result<()>
    where
        F: FnOnce(&mut RowWriter<'_>) -> Result<()>,
    {
        buffer.reset();
        let result = {
            let layout = Arc::clone(buffer.layout());
            let mut writer = RowWriter {
                buffer: &mut *buffer,
                path: String::new(),
                scope: TypeArgument::schema(layout.schema_id()),
                udt: Some(layout),
                body_start: ROW_HEADER_SIZE,
                prefix_at: None,
                depth: 0,
                next_column: 0,
                sparse_started: false,
                count: 0,
                unique: None,
            };
            body(&mut writer).and_then(|()| writer.close())
        };
        if result.is_err() {
            buffer.reset();
        }
        result
    }

    pub fn scope_type(&self) -> &TypeArgument {
        &self.scope
    }

    /// Items or sparse fields written to this scope so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn is_field_scope(&self) -> bool {
        self.prefix_at.is_none() || self.scope.code.is_field_scope()
    }

    fn qualified(&self, path: &str) -> String {
        if self.is_field_scope() {
            if self.path.is_empty() {
                path.to_string()
            } else {
                format!("{}.{}", self.path, path)
            }
        } else {
            format!("{}[{}]", self.path, self.count)
        }
    }

    /// Writes a scalar. In item scopes `path` is ignored.
    pub fn write_value(&mut self, path: &str, value: &FieldValue<'_>) -> Result<()> {
        let code = value.code();
        if !self.is_field_scope() {
            let type_arg = TypeArgument::scalar(code);
            let implicit = self.check_item(&type_arg)?;
            let mut item = Vec::new();
            if !implicit {
                type_arg.encode(&mut item);
            }
            value.encode(&mut item);
            self.check_unique(&item)?;
            self.buffer.append_bytes(&item)?;
            self.count += 1;
            return Ok(());
        }

        if let Some(layout) = self.udt.clone() {
            if let Some(column) = layout.schematized(path) {
                return self.write_column(&layout, column, path, value);
            }
        }
        self.check_declared(path, &TypeArgument::scalar(code))?;

        let mut entry = Vec::new();
        encode_entry_header(path, &TypeArgument::scalar(code), &mut entry);
        value.encode(&mut entry);
        self.buffer.append_bytes(&entry)?;
        self.sparse_started = true;
        self.count += 1;
        Ok(())
    }

    fn write_column(
        &mut self,
        layout: &Layout,
        column: SchematizedColumn<'_>,
        path: &str,
        value: &FieldValue<'_>,
    ) -> Result<()> {
        let bit = column.null_bit_index();
        if self.sparse_started {
            return Err(HybridRowError::OutOfOrderWrite {
                path: self.qualified(path),
                reason: "schematized column written after sparse fields".to_string(),
            });
        }
        if bit < self.next_column {
            let previous = layout
                .column_at(self.next_column - 1)
                .map(|c| c.path().to_string())
                .unwrap_or_default();
            return Err(HybridRowError::OutOfOrderWrite {
                path: self.qualified(path),
                reason: format!("column precedes '{}' in layout order", previous),
            });
        }
        if column.code() != value.code() {
            return Err(HybridRowError::mismatch(
                &self.qualified(path),
                column.type_arg(),
                value.code(),
            ));
        }
        self.store_column(layout, column, value)?;
        self.next_column = bit + 1;
        Ok(())
    }

    fn store_column(
        &mut self,
        layout: &Layout,
        column: SchematizedColumn<'_>,
        value: &FieldValue<'_>,
    ) -> Result<()> {
        match column {
            SchematizedColumn::Fixed(c) => {
                self.buffer.write_fixed_at(self.body_start, layout, c, value)
            }
            SchematizedColumn::Variable(c) => {
                let mut raw = Vec::new();
                value.encode_column(&mut raw);
                self.buffer
                    .write_variable_at(self.body_start, layout, c.variable_index, &raw)
            }
        }
    }

    /// A sparse path declared in the layout only accepts its declared type.
    fn check_declared(&self, path: &str, type_arg: &TypeArgument) -> Result<()> {
        let Some(layout) = &self.udt else {
            return Ok(());
        };
        if let Some(column) = layout.schematized(path) {
            return Err(HybridRowError::mismatch(
                &self.qualified(path),
                column.type_arg(),
                type_arg.code,
            ));
        }
        match layout.sparse(path) {
            Some(declared) if &declared.type_arg != type_arg => Err(HybridRowError::mismatch(
                &self.qualified(path),
                &declared.type_arg,
                type_arg.code,
            )),
            _ => Ok(()),
        }
    }

    /// Checks the next item against the scope's item rules. Returns true when
    /// the item type is implied by the scope and must not be written.
    fn check_item(&self, type_arg: &TypeArgument) -> Result<bool> {
        let args = &self.scope.type_args;
        let position = self.count as usize;
        let (expected, implicit) = match self.scope.code {
            LayoutCode::Array | LayoutCode::Set => return Ok(false),
            LayoutCode::TypedArray | LayoutCode::TypedSet => (args.first().cloned(), true),
            LayoutCode::Nullable => {
                if self.count > 0 {
                    return Err(HybridRowError::OutOfOrderWrite {
                        path: self.path.clone(),
                        reason: "nullable already holds a value".to_string(),
                    });
                }
                (args.first().cloned(), true)
            }
            LayoutCode::Tuple | LayoutCode::TypedTuple => {
                let expected = args.get(position).cloned();
                if expected.is_none() {
                    return Err(HybridRowError::OutOfOrderWrite {
                        path: self.path.clone(),
                        reason: format!("tuple takes {} items", args.len()),
                    });
                }
                (expected, self.scope.code == LayoutCode::TypedTuple)
            }
            LayoutCode::TypedMap => (Some(TypeArgument::typed_tuple(args.clone())), true),
            LayoutCode::Map => {
                if type_arg.code == LayoutCode::Tuple && type_arg.type_args.len() == 2 {
                    return Ok(false);
                }
                return Err(HybridRowError::mismatch(
                    &self.qualified(""),
                    "tuple<key, value>",
                    type_arg.code,
                ));
            }
            other => {
                return Err(HybridRowError::mismatch(&self.path, "item scope", other));
            }
        };
        match expected {
            Some(expected) if &expected == type_arg => Ok(implicit),
            Some(expected) => Err(HybridRowError::mismatch(
                &self.qualified(""),
                expected,
                type_arg.code,
            )),
            None => Err(HybridRowError::schema(format!(
                "{} without an item type",
                self.scope
            ))),
        }
    }

    fn check_unique(&mut self, key: &[u8]) -> Result<()> {
        if let Some(seen) = &mut self.unique {
            if !seen.insert(key.to_vec()) {
                return Err(HybridRowError::DuplicateItem(self.path.clone()));
            }
        }
        Ok(())
    }

    /// Opens a nested scope, runs `body` against it and closes it. On failure
    /// the scope is removed from the buffer entirely.
    pub fn write_scope<F>(&mut self, path: &str, type_arg: &TypeArgument, body: F) -> Result<()>
    where
        F: FnOnce(&mut RowWriter<'_>) -> Result<()>,
    {
        type_arg.validate()?;
        if !type_arg.code.is_scope() {
            return Err(HybridRowError::mismatch(&self.qualified(path), "scope", type_arg.code));
        }

        let mut head = Vec::new();
        let label = self.qualified(path);
        let implicit_key = if self.is_field_scope() {
            self.check_declared(path, type_arg)?;
            encode_entry_header(path, type_arg, &mut head);
            None
        } else {
            if !self.check_item(type_arg)? {
                type_arg.encode(&mut head);
            }
            match self.scope.code {
                LayoutCode::TypedMap => self.scope.type_args.first().cloned().map(Some),
                LayoutCode::Map => Some(None),
                _ => None,
            }
        };

        let mark = self.buffer.len();
        let depth = self.buffer.scope_depth();
        let prefix_at = mark + head.len();
        let result = self.open_scope(label, type_arg, head, prefix_at, body);
        let result = result.and_then(|()| self.finish_item(mark, prefix_at, implicit_key));
        match result {
            Ok(()) => {
                if self.is_field_scope() {
                    self.sparse_started = true;
                }
                self.count += 1;
                Ok(())
            }
            Err(e) => {
                self.buffer.truncate(mark);
                self.buffer.unwind_scopes(depth);
                Err(e)
            }
        }
    }

    fn open_scope<F>(
        &mut self,
        label: String,
        type_arg: &TypeArgument,
        mut head: Vec<u8>,
        prefix_at: usize,
        body: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut RowWriter<'_>) -> Result<()>,
    {
        head.extend_from_slice(&[0u8; SCOPE_PREFIX_SIZE]);
        let udt = if type_arg.code == LayoutCode::Schema {
            let id = type_arg
                .schema_id
                .ok_or_else(|| HybridRowError::schema("schema scope without schema id"))?;
            let layout = self.buffer.resolver().resolve(id)?;
            head.extend_from_slice(&layout.empty_body());
            Some(layout)
        } else {
            None
        };
        self.buffer.append_bytes(&head)?;
        let depth = self.buffer.push_scope(ScopeFrame {
            code: type_arg.code,
            start: prefix_at,
        })?;

        let mut child = RowWriter {
            buffer: &mut *self.buffer,
            path: label,
            scope: type_arg.clone(),
            udt,
            body_start: prefix_at + SCOPE_PREFIX_SIZE,
            prefix_at: Some(prefix_at),
            depth,
            next_column: 0,
            sparse_started: false,
            count: 0,
            unique: type_arg.code.is_unique_scope().then(HashSet::new),
        };
        body(&mut child)?;
        child.close()
    }

    /// Uniqueness check for a finished scope item: the whole item for sets,
    /// the first tuple element for maps.
    fn finish_item(
        &mut self,
        mark: usize,
        prefix_at: usize,
        implicit_key: Option<Option<TypeArgument>>,
    ) -> Result<()> {
        if self.unique.is_none() {
            return Ok(());
        }
        let bytes = self.buffer.as_bytes();
        let key = match implicit_key {
            Some(key_type) => {
                let body = prefix_at + SCOPE_PREFIX_SIZE;
                let (_, range) = parse_item(bytes, body, bytes.len(), key_type.as_ref())?;
                bytes[body..range.end].to_vec()
            }
            None => bytes[mark..].to_vec(),
        };
        self.check_unique(&key)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(layout) = self.udt.clone() {
            self.fill_required(&layout)?;
        }
        if self.scope.code.is_tuple() && self.prefix_at.is_some() {
            let expected = self.scope.type_args.len();
            if (self.count as usize) < expected {
                return Err(HybridRowError::MissingRequiredField(format!(
                    "{}[{}]",
                    self.path, self.count
                )));
            }
        }
        if let Some(prefix_at) = self.prefix_at {
            self.buffer.pop_scope(self.depth)?;
            let length = self.buffer.len() - prefix_at - SCOPE_PREFIX_SIZE;
            let length = u32::try_from(length).map_err(|_| HybridRowError::BufferTooSmall {
                required: length,
                limit: u32::MAX as usize,
            })?;
            self.buffer.patch_scope(prefix_at, length, self.count);
        }
        Ok(())
    }

    fn fill_required(&mut self, layout: &Layout) -> Result<()> {
        for bit in 0..layout.column_count() {
            let Some(column) = layout.column_at(bit) else {
                break;
            };
            if !column.required() || self.buffer.test_bit_at(self.body_start, bit) {
                continue;
            }
            match column.default() {
                Some(default) if self.buffer.options().fills_defaults() => {
                    self.store_column(layout, column, default)?;
                }
                _ => {
                    return Err(HybridRowError::MissingRequiredField(
                        self.qualified(column.path()),
                    ))
                }
            }
        }
        Ok(())
    }

    scalar_writers! {
        write_bool(bool) => Boolean,
        write_i8(i8) => Int8,
        write_i16(i16) => Int16,
        write_i32(i32) => Int32,
        write_i64(i64) => Int64,
        write_u8(u8) => UInt8,
        write_u16(u16) => UInt16,
        write_u32(u32) => UInt32,
        write_u64(u64) => UInt64,
        write_f32(f32) => Float32,
        write_f64(f64) => Float64,
        write_decimal(Decimal) => Decimal,
        write_datetime(i64) => DateTime,
        write_guid([u8; 16]) => Guid,
        write_varint(i64) => VarInt,
        write_varuint(u64) => VarUInt,
    }

    pub fn write_utf8(&mut self, path: &str, value: &str) -> Result<()> {
        self.write_value(path, &FieldValue::Utf8(Cow::Borrowed(value)))
    }

    pub fn write_binary(&mut self, path: &str, value: &[u8]) -> Result<()> {
        self.write_value(path, &FieldValue::Binary(Cow::Borrowed(value)))
    }

    pub fn write_null(&mut self, path: &str) -> Result<()> {
        self.write_value(path, &FieldValue::Null)
    }

    /// Appends an item to an item scope.
    pub fn push<'v>(&mut self, value: impl Into<FieldValue<'v>>) -> Result<()> {
        self.write_value("", &value.into())
    }
}
