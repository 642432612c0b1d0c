//! # RowReader
//!
//! A forward-only cursor over one row or one nested scope. Readers borrow the
//! buffer immutably, so any number of them may walk the same row at once.
//!
//! ## Traversal Order
//!
//! ```text
//! row / schema scope:  present fixed columns -> present variable columns -> sparse entries
//! object scope:        sparse entries
//! array, set, map, tuple, nullable:  items in write order
//! ```
//!
//! Absent schematized columns are skipped. Sparse entries come back in the
//! order they were written.
//!
//! ## States
//!
//! | State | Meaning |
//! |-------|---------|
//! | `BeforeFirstField` | `read()` not yet called |
//! | `AtField` | accessors describe the current field |
//! | `AfterLastField` | the scope is exhausted; `read()` keeps returning false |
//!
//! ## Nested Scopes
//!
//! `read_scope` hands a child reader to a closure. The parent already knows
//! where the scope ends from its recorded byte length, so whatever the closure
//! leaves unread is skipped. A child that runs to the end of its scope must
//! land exactly on the recorded end, otherwise the row is `CorruptLayout`.
//!
//! ## Usage
//!
//! ```ignore
//! let mut reader = RowReader::new(&buffer)?;
//! while reader.read()? {
//!     match reader.path() {
//!         Some("id") => id = reader.read_i32()?,
//!         Some("tags") => tags = reader.read_list(|item| Ok(item.read_utf8()?.to_string()))?,
//!         _ => {}
//!     }
//! }
//! ```

use std::ops::Range;
use std::sync::Arc;

use crate::config::{ROW_HEADER_SIZE, SCOPE_PREFIX_SIZE};
use crate::encoding::decode_varint;
use crate::error::{ensure_layout, HybridRowError, Result};
use crate::layouts::{Layout, LayoutCode, SchematizedColumn, TypeArgument};
use crate::row::sparse::{parse_entry, parse_item, read_scope_prefix};
use crate::row::{Decimal, FieldValue, RowBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    BeforeFirstField,
    AtField,
    AfterLastField,
}

#[derive(Debug, Clone)]
enum FieldSource {
    /// A schematized column, by null bit index.
    Column(usize),
    Inline {
        path: Option<Range<usize>>,
        value: Range<usize>,
    },
}

#[derive(Debug, Clone)]
struct Field {
    source: FieldSource,
    type_arg: TypeArgument,
}

pub struct RowReader<'b> {
    buffer: &'b RowBuffer,
    scope: TypeArgument,
    udt: Option<Arc<Layout>>,
    body_start: usize,
    end: usize,
    item_count: Option<u32>,
    position: usize,
    next_column: usize,
    state: ReaderState,
    field: Option<Field>,
    index: usize,
    items_read: usize,
    depth: usize,
}

macro_rules! scalar_readers {
    ($($name:ident => $variant:ident : $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&self) -> Result<$ty> {
                match self.read_value_as(LayoutCode::$variant)? {
                    FieldValue::$variant(v) => Ok(v),
                    other => Err(self.mismatch(LayoutCode::$variant, other.code())),
                }
            }
        )*
    };
}

impl<'b> RowReader<'b> {
    /// Creates a reader positioned before the first field of the row.
    pub fn new(buffer: &'b RowBuffer) -> Result<Self> {
        let layout = Arc::clone(buffer.layout());
        let position = buffer.variable_table(ROW_HEADER_SIZE, &layout)?.data_end();
        Ok(Self {
            buffer,
            scope: TypeArgument::schema(layout.schema_id()),
            udt: Some(layout),
            body_start: ROW_HEADER_SIZE,
            end: buffer.len(),
            item_count: None,
            position,
            next_column: 0,
            state: ReaderState::BeforeFirstField,
            field: None,
            index: 0,
            items_read: 0,
            depth: 0,
        })
    }

    fn child(&self, type_arg: &TypeArgument, value: Range<usize>) -> Result<RowReader<'b>> {
        let depth = self.depth + 1;
        let limit = self.buffer.options().max_depth();
        ensure_layout!(depth <= limit, "scope nesting exceeds the limit of {}", limit);

        let bytes = self.buffer.as_bytes();
        let (length, count) = read_scope_prefix(bytes, value.start)?;
        let body_start = value.start + SCOPE_PREFIX_SIZE;
        let end = body_start + length as usize;
        ensure_layout!(end == value.end, "scope length disagrees with its entry");

        let (udt, position) = if type_arg.code == LayoutCode::Schema {
            let id = type_arg
                .schema_id
                .ok_or_else(|| HybridRowError::corrupt("schema scope without schema id"))?;
            let layout = self
                .buffer
                .resolver()
                .get(id)
                .ok_or_else(|| HybridRowError::corrupt(format!("unknown schema id {}", id)))?;
            ensure_layout!(
                body_start + layout.offset_table_offset() <= end,
                "schema scope too short for layout '{}'",
                layout.name()
            );
            let position = self.buffer.variable_table(body_start, &layout)?.data_end();
            ensure_layout!(position <= end, "schema scope variable data overruns scope");
            (Some(layout), position)
        } else {
            (None, body_start)
        };

        Ok(RowReader {
            buffer: self.buffer,
            scope: type_arg.clone(),
            udt,
            body_start,
            end,
            item_count: Some(count),
            position,
            next_column: 0,
            state: ReaderState::BeforeFirstField,
            field: None,
            index: 0,
            items_read: 0,
            depth,
        })
    }

    /// Advances to the next field. Returns false at the end of the scope.
    pub fn read(&mut self) -> Result<bool> {
        if self.state == ReaderState::AfterLastField {
            return Ok(false);
        }

        if let Some(layout) = self.udt.clone() {
            while self.next_column < layout.column_count() {
                let bit = self.next_column;
                self.next_column += 1;
                if !self.buffer.test_bit_at(self.body_start, bit) {
                    continue;
                }
                let Some(column) = layout.column_at(bit) else {
                    break;
                };
                self.enter(Field {
                    source: FieldSource::Column(bit),
                    type_arg: column.type_arg().clone(),
                });
                return Ok(true);
            }
        }

        // Zero-width items (typed `Null`) can sit at the very end of a scope.
        let items_pending = !self.is_field_scope()
            && self
                .item_count
                .is_some_and(|count| self.items_read < count as usize);
        if self.position >= self.end && !items_pending {
            ensure_layout!(
                self.position == self.end,
                "scope content overruns its end by {} bytes",
                self.position - self.end
            );
            if let Some(count) = self.item_count {
                ensure_layout!(
                    self.items_read == count as usize,
                    "{} scope records {} items, found {}",
                    self.scope.code,
                    count,
                    self.items_read
                );
            }
            self.finish();
            return Ok(false);
        }

        let bytes = self.buffer.as_bytes();
        let field = if self.is_field_scope() {
            let entry = parse_entry(bytes, self.position, self.end)?;
            Field {
                source: FieldSource::Inline {
                    path: Some(entry.path.clone()),
                    value: entry.value.clone(),
                },
                type_arg: entry.type_arg,
            }
        } else {
            let implicit = self.implicit_item_type()?;
            let (type_arg, value) = parse_item(bytes, self.position, self.end, implicit.as_ref())?;
            self.check_item_type(&type_arg)?;
            Field {
                source: FieldSource::Inline { path: None, value },
                type_arg,
            }
        };

        if let FieldSource::Inline { value, .. } = &field.source {
            self.position = value.end;
        }
        self.items_read += 1;
        self.enter(field);
        Ok(true)
    }

    /// True for the row, schema and object scopes, whose fields carry paths.
    pub fn is_field_scope(&self) -> bool {
        self.udt.is_some() || self.scope.code == LayoutCode::Object
    }

    fn enter(&mut self, field: Field) {
        if self.state == ReaderState::AtField {
            self.index += 1;
        }
        self.state = ReaderState::AtField;
        self.field = Some(field);
    }

    fn finish(&mut self) {
        self.state = ReaderState::AfterLastField;
        self.field = None;
    }

    fn implicit_item_type(&self) -> Result<Option<TypeArgument>> {
        let args = &self.scope.type_args;
        let implicit = match self.scope.code {
            LayoutCode::TypedArray | LayoutCode::TypedSet | LayoutCode::Nullable => {
                args.first().cloned()
            }
            LayoutCode::TypedTuple => Some(args.get(self.items_read).cloned().ok_or_else(|| {
                HybridRowError::corrupt(format!("typed tuple holds more than {} items", args.len()))
            })?),
            LayoutCode::TypedMap => Some(TypeArgument::typed_tuple(args.clone())),
            _ => None,
        };
        Ok(implicit)
    }

    fn check_item_type(&self, type_arg: &TypeArgument) -> Result<()> {
        match self.scope.code {
            LayoutCode::Tuple => {
                let expected = self.scope.type_args.get(self.items_read);
                ensure_layout!(
                    expected == Some(type_arg),
                    "tuple item {} has type {}",
                    self.items_read,
                    type_arg
                );
            }
            LayoutCode::Map => {
                ensure_layout!(
                    type_arg.code == LayoutCode::Tuple && type_arg.type_args.len() == 2,
                    "map item has type {}",
                    type_arg
                );
            }
            _ => {}
        }
        Ok(())
    }

    /// Consumes the rest of the scope without reading it.
    pub fn skip(&mut self) {
        self.position = self.end;
        self.next_column = usize::MAX;
        self.items_read = self.item_count.map(|c| c as usize).unwrap_or(self.items_read);
        self.finish();
    }

    /// Reads forward until the field at `path`. Returns false if the scope
    /// ends first.
    pub fn seek(&mut self, path: &str) -> Result<bool> {
        while self.read()? {
            if self.path() == Some(path) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Type of the scope this reader walks.
    pub fn scope_type(&self) -> &TypeArgument {
        &self.scope
    }

    /// Item count recorded in the scope prefix. None for a top-level row.
    pub fn item_count(&self) -> Option<u32> {
        self.item_count
    }

    /// Ordinal of the current field within its scope.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Path of the current field. None for scope items, which are positional.
    pub fn path(&self) -> Option<&str> {
        let field = self.field.as_ref()?;
        match &field.source {
            FieldSource::Column(bit) => Some(self.udt.as_ref()?.column_at(*bit)?.path()),
            FieldSource::Inline { path, .. } => {
                let range = path.clone()?;
                std::str::from_utf8(&self.buffer.as_bytes()[range]).ok()
            }
        }
    }

    pub fn type_arg(&self) -> Option<&TypeArgument> {
        self.field.as_ref().map(|f| &f.type_arg)
    }

    pub fn code(&self) -> Option<LayoutCode> {
        self.type_arg().map(|t| t.code)
    }

    fn current(&self) -> Result<&Field> {
        self.field
            .as_ref()
            .ok_or_else(|| HybridRowError::corrupt("reader is not positioned on a field"))
    }

    fn mismatch(&self, expected: impl ToString, actual: LayoutCode) -> HybridRowError {
        HybridRowError::mismatch(self.path().unwrap_or(""), expected, actual)
    }

    fn read_value_as(&self, code: LayoutCode) -> Result<FieldValue<'b>> {
        let actual = self.current()?.type_arg.code;
        if actual != code {
            return Err(self.mismatch(code, actual));
        }
        self.read_value()
    }

    /// Reads the current scalar regardless of its type.
    pub fn read_value(&self) -> Result<FieldValue<'b>> {
        let field = self.current()?;
        let code = field.type_arg.code;
        if code.is_scope() {
            return Err(self.mismatch("scalar", code));
        }
        let buffer: &'b RowBuffer = self.buffer;
        match &field.source {
            FieldSource::Column(bit) => match self.column(*bit)? {
                SchematizedColumn::Fixed(column) => {
                    buffer.read_fixed_at(self.body_start, self.layout()?, column)
                }
                SchematizedColumn::Variable(column) => {
                    let bytes =
                        buffer.read_variable_at(self.body_start, self.layout()?, column.variable_index)?;
                    FieldValue::decode_column(code, bytes)
                }
            },
            FieldSource::Inline { value, .. } => {
                let bytes = &buffer.as_bytes()[value.clone()];
                Ok(FieldValue::decode(code, bytes)?.0)
            }
        }
    }

    fn layout(&self) -> Result<&Layout> {
        self.udt
            .as_deref()
            .ok_or_else(|| HybridRowError::corrupt("schematized field outside a schema scope"))
    }

    fn column(&self, bit: usize) -> Result<SchematizedColumn<'_>> {
        self.layout()?
            .column_at(bit)
            .ok_or_else(|| HybridRowError::corrupt(format!("no column at bit {}", bit)))
    }

    /// Raw bytes of a utf8 or binary field without its length prefix.
    fn read_bytes_as(&self, code: LayoutCode) -> Result<&'b [u8]> {
        let field = self.current()?;
        if field.type_arg.code != code {
            return Err(self.mismatch(code, field.type_arg.code));
        }
        let buffer: &'b RowBuffer = self.buffer;
        match &field.source {
            FieldSource::Column(bit) => match self.column(*bit)? {
                SchematizedColumn::Variable(column) => {
                    buffer.read_variable_at(self.body_start, self.layout()?, column.variable_index)
                }
                SchematizedColumn::Fixed(_) => Err(self.mismatch(code, field.type_arg.code)),
            },
            FieldSource::Inline { value, .. } => {
                let bytes = &buffer.as_bytes()[value.clone()];
                let (len, n) = decode_varint(bytes)?;
                ensure_layout!(n + len as usize == bytes.len(), "{} length prefix mismatch", code);
                Ok(&bytes[n..])
            }
        }
    }

    pub fn read_utf8(&self) -> Result<&'b str> {
        let bytes = self.read_bytes_as(LayoutCode::Utf8)?;
        std::str::from_utf8(bytes).map_err(|e| HybridRowError::corrupt(format!("invalid utf8: {}", e)))
    }

    pub fn read_binary(&self) -> Result<&'b [u8]> {
        self.read_bytes_as(LayoutCode::Binary)
    }

    pub fn read_null(&self) -> Result<()> {
        self.read_value_as(LayoutCode::Null).map(|_| ())
    }

    scalar_readers! {
        read_bool => Boolean: bool,
        read_i8 => Int8: i8,
        read_i16 => Int16: i16,
        read_i32 => Int32: i32,
        read_i64 => Int64: i64,
        read_u8 => UInt8: u8,
        read_u16 => UInt16: u16,
        read_u32 => UInt32: u32,
        read_u64 => UInt64: u64,
        read_f32 => Float32: f32,
        read_f64 => Float64: f64,
        read_decimal => Decimal: Decimal,
        read_datetime => DateTime: i64,
        read_guid => Guid: [u8; 16],
        read_varint => VarInt: i64,
        read_varuint => VarUInt: u64,
    }

    /// Descends into the current scope field. The parent resumes after the
    /// scope whether or not `body` read all of it.
    pub fn read_scope<T, F>(&mut self, body: F) -> Result<T>
    where
        F: FnOnce(&mut RowReader<'b>) -> Result<T>,
    {
        let field = self.current()?.clone();
        let value = match (&field.source, field.type_arg.code.is_scope()) {
            (FieldSource::Inline { value, .. }, true) => value.clone(),
            _ => return Err(self.mismatch("scope", field.type_arg.code)),
        };
        let mut child = self.child(&field.type_arg, value)?;
        let result = body(&mut child)?;
        if child.state == ReaderState::AfterLastField {
            ensure_layout!(
                child.position == child.end,
                "child reader stopped at {} instead of {}",
                child.position,
                child.end
            );
        }
        Ok(result)
    }

    /// Reads an array field item by item. Any item failure fails the whole
    /// list; no partial list is returned.
    pub fn read_list<T, F>(&mut self, mut item: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut RowReader<'b>) -> Result<T>,
    {
        let code = self.current()?.type_arg.code;
        if !matches!(code, LayoutCode::Array | LayoutCode::TypedArray) {
            return Err(self.mismatch("array", code));
        }
        self.read_scope(|child| {
            let hint = child.item_count().unwrap_or(0).min(1024) as usize;
            let mut out = Vec::with_capacity(hint);
            while child.read()? {
                out.push(item(child)?);
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RowOptions;
    use crate::io::RowWriter;
    use crate::layouts::{ColumnDef, LayoutBuilder, LayoutResolver, SchemaId};

    fn buffer() -> RowBuffer {
        let resolver = Arc::new(LayoutResolver::new());
        let layout = resolver
            .compile(
                &LayoutBuilder::new("r", SchemaId(1))
                    .column(ColumnDef::new("a", LayoutCode::Int32))
                    .column(ColumnDef::new("b", LayoutCode::Int64))
                    .column(ColumnDef::new("s", LayoutCode::Utf8)),
            )
            .unwrap();
        RowBuffer::new(layout, resolver, RowOptions::default()).unwrap()
    }

    #[test]
    fn empty_row_reads_nothing() {
        let buffer = buffer();
        let mut reader = RowReader::new(&buffer).unwrap();
        assert_eq!(reader.state(), ReaderState::BeforeFirstField);
        assert!(!reader.read().unwrap());
        assert_eq!(reader.state(), ReaderState::AfterLastField);
        assert!(!reader.read().unwrap());
    }

    #[test]
    fn absent_columns_are_skipped() {
        let mut buffer = buffer();
        RowWriter::write_buffer(&mut buffer, |w| {
            w.write_i64("b", 9)?;
            w.write_utf8("extra", "x")
        })
        .unwrap();

        let mut reader = RowReader::new(&buffer).unwrap();
        assert!(reader.read().unwrap());
        assert_eq!(reader.path(), Some("b"));
        assert_eq!(reader.read_i64().unwrap(), 9);
        assert!(reader.read().unwrap());
        assert_eq!(reader.path(), Some("extra"));
        assert_eq!(reader.index(), 1);
        assert!(!reader.read().unwrap());
    }

    #[test]
    fn accessor_of_the_wrong_type_is_a_mismatch() {
        let mut buffer = buffer();
        RowWriter::write_buffer(&mut buffer, |w| w.write_i32("a", 1)).unwrap();

        let mut reader = RowReader::new(&buffer).unwrap();
        assert!(reader.read().unwrap());
        let err = reader.read_utf8().unwrap_err();
        assert_eq!(err.to_string(), "type mismatch at 'a': expected utf8, found int32");
        assert!(err.is_recoverable());
        assert_eq!(reader.read_i32().unwrap(), 1);
    }

    #[test]
    fn seek_and_skip() {
        let mut buffer = buffer();
        RowWriter::write_buffer(&mut buffer, |w| {
            w.write_i32("a", 1)?;
            w.write_utf8("s", "text")?;
            w.write_bool("flag", true)
        })
        .unwrap();

        let mut reader = RowReader::new(&buffer).unwrap();
        assert!(reader.seek("flag").unwrap());
        assert!(reader.read_bool().unwrap());

        let mut reader = RowReader::new(&buffer).unwrap();
        assert!(reader.read().unwrap());
        reader.skip();
        assert!(!reader.read().unwrap());
    }

    #[test]
    fn zero_width_items_at_scope_end() {
        let mut buffer = buffer();
        let pair = TypeArgument::typed_tuple(vec![LayoutCode::Int32.into(), LayoutCode::Null.into()]);
        RowWriter::write_buffer(&mut buffer, |w| {
            w.write_scope("nulls", &TypeArgument::typed_array(LayoutCode::Null), |list| {
                for _ in 0..3 {
                    list.write_null("")?;
                }
                Ok(())
            })?;
            w.write_scope("maybe", &TypeArgument::nullable(LayoutCode::Null), |n| n.write_null(""))?;
            w.write_scope("pair", &pair, |t| {
                t.write_i32("", 5)?;
                t.write_null("")
            })
        })
        .unwrap();

        let mut reader = RowReader::new(&buffer).unwrap();
        assert!(reader.seek("nulls").unwrap());
        assert_eq!(reader.read_list(|item| item.read_null()).unwrap(), vec![(); 3]);

        assert!(reader.read().unwrap());
        assert_eq!(reader.path(), Some("maybe"));
        let present = reader
            .read_scope(|n| {
                let present = n.read()?;
                n.read_null()?;
                assert!(!n.read()?);
                Ok(present)
            })
            .unwrap();
        assert!(present);

        assert!(reader.read().unwrap());
        assert_eq!(reader.path(), Some("pair"));
        let first = reader
            .read_scope(|t| {
                assert!(t.read()?);
                let first = t.read_i32()?;
                assert!(t.read()?);
                assert_eq!(t.code(), Some(LayoutCode::Null));
                t.read_null()?;
                assert!(!t.read()?);
                Ok(first)
            })
            .unwrap();
        assert_eq!(first, 5);
        assert!(!reader.read().unwrap());
    }
}
