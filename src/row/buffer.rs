//! # RowBuffer
//!
//! `RowBuffer` owns the bytes of exactly one row together with the layout the
//! row follows. It provides the physical primitives the cursors are built on:
//! null bits, fixed slots, the variable offset table, and byte-range splices
//! for the sparse region.
//!
//! ## Physical Layout
//!
//! ```text
//! +--------+-------------+--------------+---------------+---------------+--------+
//! | header | null bitmap | fixed region | offset table  | variable data | sparse |
//! | 8 B    | ceil(n/8) B | fixed_size B | varint / col  | back to back  | region |
//! +--------+-------------+--------------+---------------+---------------+--------+
//! ```
//!
//! The offset table stores, for each variable column, the cumulative END offset
//! of its data relative to the start of the variable data. Column `i` spans
//! `ends[i-1]..ends[i]` (with `ends[-1] = 0`). Because the table entries are
//! varints, growing a column can also grow the table.
//!
//! ## Variable-Length Shift
//!
//! `write_variable` replaces the bytes from the start of the offset table to the
//! end of the column in one splice: the rewritten table, the untouched data of
//! the earlier columns, then the new value. Everything after the column (later
//! columns and the whole sparse region) moves by the size delta. Sparse entries
//! and scopes only hold body-relative lengths, so moving them is safe.
//!
//! ## All-or-Nothing
//!
//! Every structural change computes the final length first and checks it
//! against `RowOptions::max_row_size` and the allocator before touching a byte.
//! After the change the header's `row_length` is patched, so it always equals
//! `bytes.len()`.
//!
//! ## Nested Bodies
//!
//! Nested `schema` scopes reuse the same body layout at a different start
//! offset. The `*_at` primitives take that offset and the nested layout; the
//! public methods are the top-level row case (`body_start = 8`).
//!
//! ## Scope Stack
//!
//! Writers push a frame per open scope and pop it when the scope closes. Frames
//! must close in LIFO order; a writer that closes at the wrong depth gets
//! `ScopeMismatch`.

use std::ops::Range;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;
use zerocopy::IntoBytes;

use crate::config::{RowOptions, DEFAULT_INITIAL_CAPACITY, ROW_HEADER_SIZE};
use crate::encoding::{decode_varint, push_varint};
use crate::error::{ensure_layout, HybridRowError, Result};
use crate::layouts::{FixedColumn, Layout, LayoutCode, LayoutResolver, SchemaId};
use crate::row::header::RowHeader;
use crate::row::sparse::{parse_entry, write_scope_prefix};
use crate::row::value::FieldValue;

/// An open scope on a writer's stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFrame {
    pub code: LayoutCode,
    /// Offset of the scope's 8-byte length/count prefix.
    pub start: usize,
}

/// Decoded offset table of one body. All positions are absolute.
#[derive(Debug, Clone)]
pub(crate) struct VariableTable {
    pub table_start: usize,
    pub table_len: usize,
    pub ends: SmallVec<[usize; 8]>,
}

impl VariableTable {
    pub fn data_start(&self) -> usize {
        self.table_start + self.table_len
    }

    pub fn data_end(&self) -> usize {
        self.data_start() + self.ends.last().copied().unwrap_or(0)
    }

    pub fn bounds(&self, index: usize) -> Range<usize> {
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        self.data_start() + start..self.data_start() + self.ends[index]
    }
}

#[derive(Debug, Clone)]
pub struct RowBuffer {
    bytes: Vec<u8>,
    layout: Arc<Layout>,
    resolver: Arc<LayoutResolver>,
    options: RowOptions,
    scopes: SmallVec<[ScopeFrame; 8]>,
}

impl RowBuffer {
    /// Creates an empty row: header, zeroed bitmap and fixed region, and a zero
    /// offset for every variable column.
    pub fn new(
        layout: Arc<Layout>,
        resolver: Arc<LayoutResolver>,
        options: RowOptions,
    ) -> Result<Self> {
        let empty_len = ROW_HEADER_SIZE + layout.empty_body_size();
        if empty_len > options.max_row_size_limit() {
            return Err(HybridRowError::BufferTooSmall {
                required: empty_len,
                limit: options.max_row_size_limit(),
            });
        }
        let limit = options.max_row_size_limit();
        let capacity = options
            .initial_capacity_hint()
            .unwrap_or_else(|| (ROW_HEADER_SIZE + layout.size_estimate()).max(DEFAULT_INITIAL_CAPACITY))
            .clamp(empty_len, limit);

        let mut bytes = Vec::new();
        bytes
            .try_reserve(capacity)
            .map_err(|_| HybridRowError::BufferTooSmall {
                required: capacity,
                limit,
            })?;

        let mut buffer = Self {
            bytes,
            layout,
            resolver,
            options,
            scopes: SmallVec::new(),
        };
        buffer.reset();
        Ok(buffer)
    }

    /// Adopts an existing row after validating its framing: header present,
    /// `row_length` equal to the byte count, layout known, bitmap and fixed
    /// region in bounds, offset table monotonic and in bounds, and top-level
    /// sparse entries well formed.
    pub fn from_bytes(
        bytes: Vec<u8>,
        resolver: Arc<LayoutResolver>,
        options: RowOptions,
    ) -> Result<Self> {
        let header = RowHeader::from_bytes(&bytes)?;
        ensure_layout!(
            header.row_length() as usize == bytes.len(),
            "row_length {} disagrees with buffer length {}",
            header.row_length(),
            bytes.len()
        );
        if bytes.len() > options.max_row_size_limit() {
            return Err(HybridRowError::BufferTooSmall {
                required: bytes.len(),
                limit: options.max_row_size_limit(),
            });
        }
        let schema = header.schema();
        let layout = resolver
            .get(schema)
            .ok_or_else(|| HybridRowError::corrupt(format!("unknown schema id {}", schema)))?;
        ensure_layout!(
            bytes.len() >= ROW_HEADER_SIZE + layout.offset_table_offset(),
            "row of {} bytes too short for layout '{}'",
            bytes.len(),
            layout.name()
        );

        let buffer = Self {
            bytes,
            layout,
            resolver,
            options,
            scopes: SmallVec::new(),
        };
        let table = buffer.variable_table(ROW_HEADER_SIZE, &buffer.layout)?;
        let end = buffer.bytes.len();
        let mut pos = table.data_end();
        while pos < end {
            pos = parse_entry(&buffer.bytes, pos, end)?.end();
        }
        Ok(buffer)
    }

    /// Discards the row contents and writes an empty row for the same layout.
    pub fn reset(&mut self) {
        self.bytes.clear();
        let header = RowHeader::new(self.layout.schema_id(), 0);
        self.bytes.extend_from_slice(header.as_bytes());
        self.bytes.resize(ROW_HEADER_SIZE + self.layout.empty_body_size(), 0);
        self.scopes.clear();
        self.patch_row_length();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// A row always holds at least its header.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    pub fn resolver(&self) -> &Arc<LayoutResolver> {
        &self.resolver
    }

    pub fn options(&self) -> &RowOptions {
        &self.options
    }

    pub fn schema_id(&self) -> SchemaId {
        self.layout.schema_id()
    }

    pub fn header(&self) -> Result<&RowHeader> {
        RowHeader::from_bytes(&self.bytes)
    }

    // ------------------------------------------------------------------------
    // Top-level row accessors
    // ------------------------------------------------------------------------

    /// Returns true when column `index` (fixed columns first, then variable)
    /// is present.
    pub fn test_null_bit(&self, index: usize) -> bool {
        self.test_bit_at(ROW_HEADER_SIZE, index)
    }

    pub fn set_null_bit(&mut self, index: usize, present: bool) {
        self.set_bit_at(ROW_HEADER_SIZE, index, present)
    }

    /// Reads a fixed column; an absent column reads as `Null`.
    pub fn read_fixed(&self, column: &FixedColumn) -> Result<FieldValue<'static>> {
        let layout = Arc::clone(&self.layout);
        self.read_fixed_at(ROW_HEADER_SIZE, &layout, column)
    }

    pub fn write_fixed(&mut self, column: &FixedColumn, value: &FieldValue<'_>) -> Result<()> {
        let layout = Arc::clone(&self.layout);
        self.write_fixed_at(ROW_HEADER_SIZE, &layout, column, value)
    }

    pub fn read_variable(&self, index: usize) -> Result<&[u8]> {
        let layout = Arc::clone(&self.layout);
        self.read_variable_at(ROW_HEADER_SIZE, &layout, index)
    }

    pub fn write_variable(&mut self, index: usize, value: &[u8]) -> Result<()> {
        let layout = Arc::clone(&self.layout);
        self.write_variable_at(ROW_HEADER_SIZE, &layout, index, value)
    }

    /// Offset of the first top-level sparse entry.
    pub fn sparse_start(&self) -> Result<usize> {
        let layout = Arc::clone(&self.layout);
        Ok(self.variable_table(ROW_HEADER_SIZE, &layout)?.data_end())
    }

    // ------------------------------------------------------------------------
    // Body primitives shared with nested schema scopes
    // ------------------------------------------------------------------------

    pub(crate) fn test_bit_at(&self, body_start: usize, index: usize) -> bool {
        self.bytes
            .get(body_start + index / 8)
            .is_some_and(|byte| byte & (1 << (index % 8)) != 0)
    }

    pub(crate) fn set_bit_at(&mut self, body_start: usize, index: usize, present: bool) {
        if let Some(byte) = self.bytes.get_mut(body_start + index / 8) {
            if present {
                *byte |= 1 << (index % 8);
            } else {
                *byte &= !(1 << (index % 8));
            }
        }
    }

    fn fixed_slot(&self, body_start: usize, layout: &Layout, column: &FixedColumn) -> Result<Range<usize>> {
        let start = body_start + layout.fixed_region_offset() + column.byte_offset;
        let end = start + column.width();
        ensure_layout!(
            end <= self.bytes.len(),
            "fixed column '{}' at {}..{} overruns {} bytes",
            column.path,
            start,
            end,
            self.bytes.len()
        );
        Ok(start..end)
    }

    pub(crate) fn read_fixed_at(
        &self,
        body_start: usize,
        layout: &Layout,
        column: &FixedColumn,
    ) -> Result<FieldValue<'static>> {
        if !self.test_bit_at(body_start, column.null_bit_index) {
            return Ok(FieldValue::Null);
        }
        let slot = self.fixed_slot(body_start, layout, column)?;
        FieldValue::decode_fixed(column.type_arg.code, &self.bytes[slot])
    }

    pub(crate) fn write_fixed_at(
        &mut self,
        body_start: usize,
        layout: &Layout,
        column: &FixedColumn,
        value: &FieldValue<'_>,
    ) -> Result<()> {
        if value.code() != column.type_arg.code {
            return Err(HybridRowError::mismatch(&column.path, &column.type_arg, value.code()));
        }
        let slot = self.fixed_slot(body_start, layout, column)?;
        value.write_fixed(&mut self.bytes[slot])?;
        self.set_bit_at(body_start, column.null_bit_index, true);
        Ok(())
    }

    /// Zeroes a fixed slot and clears its null bit.
    pub(crate) fn clear_fixed_at(
        &mut self,
        body_start: usize,
        layout: &Layout,
        column: &FixedColumn,
    ) -> Result<()> {
        let slot = self.fixed_slot(body_start, layout, column)?;
        self.bytes[slot].fill(0);
        self.set_bit_at(body_start, column.null_bit_index, false);
        Ok(())
    }

    pub(crate) fn variable_table(&self, body_start: usize, layout: &Layout) -> Result<VariableTable> {
        let table_start = body_start + layout.offset_table_offset();
        let count = layout.variable_columns().len();
        let mut ends = SmallVec::with_capacity(count);
        let mut pos = table_start;
        let mut previous = 0usize;
        for i in 0..count {
            ensure_layout!(
                pos < self.bytes.len(),
                "offset table of '{}' truncated at entry {}",
                layout.name(),
                i
            );
            let (end, n) = decode_varint(&self.bytes[pos..])?;
            let end = end as usize;
            ensure_layout!(
                end >= previous,
                "offset table of '{}' not monotonic at entry {}",
                layout.name(),
                i
            );
            ends.push(end);
            previous = end;
            pos += n;
        }
        let table = VariableTable {
            table_start,
            table_len: pos - table_start,
            ends,
        };
        ensure_layout!(
            table.data_end() <= self.bytes.len(),
            "variable data of '{}' ends at {} beyond {} bytes",
            layout.name(),
            table.data_end(),
            self.bytes.len()
        );
        Ok(table)
    }

    pub(crate) fn read_variable_at(
        &self,
        body_start: usize,
        layout: &Layout,
        index: usize,
    ) -> Result<&[u8]> {
        ensure_layout!(
            index < layout.variable_columns().len(),
            "variable column {} out of range",
            index
        );
        let table = self.variable_table(body_start, layout)?;
        Ok(&self.bytes[table.bounds(index)])
    }

    /// Replaces a variable column's bytes and marks the column present.
    pub(crate) fn write_variable_at(
        &mut self,
        body_start: usize,
        layout: &Layout,
        index: usize,
        value: &[u8],
    ) -> Result<()> {
        self.splice_variable_at(body_start, layout, index, value)?;
        let bit = layout.variable_columns()[index].null_bit_index;
        self.set_bit_at(body_start, bit, true);
        Ok(())
    }

    /// Empties a variable column and clears its null bit.
    pub(crate) fn clear_variable_at(
        &mut self,
        body_start: usize,
        layout: &Layout,
        index: usize,
    ) -> Result<()> {
        self.splice_variable_at(body_start, layout, index, &[])?;
        let bit = layout.variable_columns()[index].null_bit_index;
        self.set_bit_at(body_start, bit, false);
        Ok(())
    }

    fn splice_variable_at(
        &mut self,
        body_start: usize,
        layout: &Layout,
        index: usize,
        value: &[u8],
    ) -> Result<()> {
        ensure_layout!(
            index < layout.variable_columns().len(),
            "variable column {} out of range",
            index
        );
        let table = self.variable_table(body_start, layout)?;
        let old = table.bounds(index);
        let old_len = old.len();

        let mut new_table = Vec::with_capacity(table.table_len + 2);
        for (i, &end) in table.ends.iter().enumerate() {
            let end = if i >= index { end - old_len + value.len() } else { end };
            push_varint(end as u64, &mut new_table);
        }

        let data_start = table.data_start();
        let mut replacement = Vec::with_capacity(new_table.len() + (old.start - data_start) + value.len());
        replacement.extend_from_slice(&new_table);
        replacement.extend_from_slice(&self.bytes[data_start..old.start]);
        replacement.extend_from_slice(value);

        self.replace_bytes(table.table_start..old.end, &replacement)?;
        trace!(
            column = %layout.variable_columns()[index].path,
            old_len,
            new_len = value.len(),
            table_delta = new_table.len() as isize - table.table_len as isize,
            "variable column resized"
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Structural changes
    // ------------------------------------------------------------------------

    /// Reserves room for `additional` more bytes. Fails with `BufferTooSmall`
    /// when the row would exceed `max_row_size` or the allocation fails.
    pub fn ensure_capacity(&mut self, additional: usize) -> Result<()> {
        let limit = self.options.max_row_size_limit();
        let required = self
            .bytes
            .len()
            .checked_add(additional)
            .ok_or(HybridRowError::BufferTooSmall {
                required: usize::MAX,
                limit,
            })?;
        if required > limit {
            return Err(HybridRowError::BufferTooSmall { required, limit });
        }
        self.bytes
            .try_reserve(additional)
            .map_err(|_| HybridRowError::BufferTooSmall {
                required,
                limit: self.bytes.capacity(),
            })
    }

    pub(crate) fn replace_bytes(&mut self, range: Range<usize>, with: &[u8]) -> Result<()> {
        ensure_layout!(
            range.start <= range.end && range.end <= self.bytes.len(),
            "splice range {:?} outside {} bytes",
            range,
            self.bytes.len()
        );
        if with.len() > range.len() {
            self.ensure_capacity(with.len() - range.len())?;
        }
        self.bytes.splice(range, with.iter().copied());
        self.patch_row_length();
        Ok(())
    }

    pub(crate) fn insert_bytes(&mut self, at: usize, with: &[u8]) -> Result<()> {
        self.replace_bytes(at..at, with)
    }

    pub(crate) fn remove_bytes(&mut self, range: Range<usize>) -> Result<()> {
        self.replace_bytes(range, &[])
    }

    pub(crate) fn append_bytes(&mut self, with: &[u8]) -> Result<()> {
        self.ensure_capacity(with.len())?;
        self.bytes.extend_from_slice(with);
        self.patch_row_length();
        Ok(())
    }

    /// Drops everything from `len` on. Used to roll back a failed scope.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len < self.bytes.len() {
            self.bytes.truncate(len);
            self.patch_row_length();
        }
    }

    pub(crate) fn patch_scope(&mut self, at: usize, length: u32, count: u32) {
        write_scope_prefix(&mut self.bytes, at, length, count);
        trace!(at, length, count, "scope prefix patched");
    }

    fn patch_row_length(&mut self) {
        let len = self.bytes.len() as u32;
        if let Ok(header) = RowHeader::from_bytes_mut(&mut self.bytes) {
            header.set_row_length(len);
        }
    }

    // ------------------------------------------------------------------------
    // Scope stack
    // ------------------------------------------------------------------------

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Pushes a frame and returns the new depth.
    pub fn push_scope(&mut self, frame: ScopeFrame) -> Result<usize> {
        let limit = self.options.max_depth();
        if self.scopes.len() >= limit {
            return Err(HybridRowError::schema(format!(
                "scope nesting exceeds the limit of {}",
                limit
            )));
        }
        self.scopes.push(frame);
        Ok(self.scopes.len())
    }

    /// Pops the innermost frame, which must be at `depth`.
    pub fn pop_scope(&mut self, depth: usize) -> Result<ScopeFrame> {
        let actual = self.scopes.len();
        if actual != depth {
            return Err(HybridRowError::ScopeMismatch {
                expected: depth,
                actual,
            });
        }
        self.scopes.pop().ok_or(HybridRowError::ScopeMismatch {
            expected: depth,
            actual,
        })
    }

    /// Drops every frame deeper than `depth` after a failed write.
    pub(crate) fn unwind_scopes(&mut self, depth: usize) {
        self.scopes.truncate(depth);
    }
}
