//! # Compiled Layouts
//!
//! A `Layout` is the immutable, compiled form of one schema. It fixes where
//! every schematized column lives inside a row body so reads and writes need no
//! per-row type information.
//!
//! ## Body Layout
//!
//! Offsets in a layout are relative to the start of a body: the first byte
//! after the row header for a top-level row, or the first byte after the scope
//! prefix for a nested `schema` scope.
//!
//! ```text
//! +--------------+--------------+---------------------+---------------+---------+
//! | null bitmap  | fixed region | variable offsets    | variable data | sparse  |
//! | ceil(n/8) B  | fixed_size B | one varint per var  | back to back  | entries |
//! +--------------+--------------+---------------------+---------------+---------+
//! ```
//!
//! ## Null Bits
//!
//! Fixed columns own bits `0..F` in declaration order, variable columns own
//! bits `F..F+V`. A set bit means the column is present. This bit index is also
//! the column's position in layout order, which is the order writers must use.
//!
//! ## Path Lookup
//!
//! Every path, schematized or declared sparse, maps to one [`ColumnRef`] through
//! a hash map built at compile time; no path appears twice.

use hashbrown::HashMap;

use crate::layouts::type_arg::{SchemaId, TypeArgument};
use crate::layouts::LayoutCode;
use crate::row::FieldValue;

#[derive(Debug, Clone, PartialEq)]
pub struct FixedColumn {
    pub path: String,
    pub type_arg: TypeArgument,
    /// Offset from the start of the fixed region.
    pub byte_offset: usize,
    pub null_bit_index: usize,
    pub required: bool,
    pub default: Option<FieldValue<'static>>,
}

impl FixedColumn {
    pub fn width(&self) -> usize {
        self.type_arg.code.fixed_size().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableColumn {
    pub path: String,
    pub type_arg: TypeArgument,
    pub variable_index: usize,
    pub null_bit_index: usize,
    pub required: bool,
    pub default: Option<FieldValue<'static>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SparseColumn {
    pub path: String,
    pub type_arg: TypeArgument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef {
    Fixed(usize),
    Variable(usize),
    Sparse(usize),
}

/// A fixed or variable column addressed by its null bit index.
#[derive(Debug, Clone, Copy)]
pub enum SchematizedColumn<'a> {
    Fixed(&'a FixedColumn),
    Variable(&'a VariableColumn),
}

impl<'a> SchematizedColumn<'a> {
    pub fn path(&self) -> &'a str {
        match self {
            SchematizedColumn::Fixed(c) => &c.path,
            SchematizedColumn::Variable(c) => &c.path,
        }
    }

    pub fn type_arg(&self) -> &'a TypeArgument {
        match self {
            SchematizedColumn::Fixed(c) => &c.type_arg,
            SchematizedColumn::Variable(c) => &c.type_arg,
        }
    }

    pub fn code(&self) -> LayoutCode {
        self.type_arg().code
    }

    pub fn null_bit_index(&self) -> usize {
        match self {
            SchematizedColumn::Fixed(c) => c.null_bit_index,
            SchematizedColumn::Variable(c) => c.null_bit_index,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            SchematizedColumn::Fixed(c) => c.required,
            SchematizedColumn::Variable(c) => c.required,
        }
    }

    pub fn default(&self) -> Option<&'a FieldValue<'static>> {
        match self {
            SchematizedColumn::Fixed(c) => c.default.as_ref(),
            SchematizedColumn::Variable(c) => c.default.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    name: String,
    schema_id: SchemaId,
    fixed_columns: Vec<FixedColumn>,
    variable_columns: Vec<VariableColumn>,
    sparse_columns: Vec<SparseColumn>,
    null_bitmap_size: usize,
    fixed_size: usize,
    sparse_capacity_hint: usize,
    paths: HashMap<String, ColumnRef>,
}

impl Layout {
    pub(crate) fn from_parts(
        name: String,
        schema_id: SchemaId,
        fixed_columns: Vec<FixedColumn>,
        variable_columns: Vec<VariableColumn>,
        sparse_columns: Vec<SparseColumn>,
        sparse_capacity_hint: usize,
    ) -> Self {
        let column_count = fixed_columns.len() + variable_columns.len();
        let fixed_size = fixed_columns.iter().map(|c| c.width()).sum();

        let mut paths = HashMap::with_capacity(column_count + sparse_columns.len());
        for (i, c) in fixed_columns.iter().enumerate() {
            paths.insert(c.path.clone(), ColumnRef::Fixed(i));
        }
        for (i, c) in variable_columns.iter().enumerate() {
            paths.insert(c.path.clone(), ColumnRef::Variable(i));
        }
        for (i, c) in sparse_columns.iter().enumerate() {
            paths.insert(c.path.clone(), ColumnRef::Sparse(i));
        }

        Self {
            name,
            schema_id,
            fixed_columns,
            variable_columns,
            sparse_columns,
            null_bitmap_size: column_count.div_ceil(8),
            fixed_size,
            sparse_capacity_hint,
            paths,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    pub fn fixed_columns(&self) -> &[FixedColumn] {
        &self.fixed_columns
    }

    pub fn variable_columns(&self) -> &[VariableColumn] {
        &self.variable_columns
    }

    pub fn sparse_columns(&self) -> &[SparseColumn] {
        &self.sparse_columns
    }

    pub fn null_bitmap_size(&self) -> usize {
        self.null_bitmap_size
    }

    pub fn fixed_size(&self) -> usize {
        self.fixed_size
    }

    pub fn sparse_capacity_hint(&self) -> usize {
        self.sparse_capacity_hint
    }

    /// Fixed plus variable columns.
    pub fn column_count(&self) -> usize {
        self.fixed_columns.len() + self.variable_columns.len()
    }

    pub fn find(&self, path: &str) -> Option<ColumnRef> {
        self.paths.get(path).copied()
    }

    pub fn column_at(&self, bit: usize) -> Option<SchematizedColumn<'_>> {
        let fixed = self.fixed_columns.len();
        if bit < fixed {
            Some(SchematizedColumn::Fixed(&self.fixed_columns[bit]))
        } else {
            self.variable_columns
                .get(bit - fixed)
                .map(SchematizedColumn::Variable)
        }
    }

    pub fn schematized(&self, path: &str) -> Option<SchematizedColumn<'_>> {
        match self.find(path)? {
            ColumnRef::Fixed(i) => Some(SchematizedColumn::Fixed(&self.fixed_columns[i])),
            ColumnRef::Variable(i) => Some(SchematizedColumn::Variable(&self.variable_columns[i])),
            ColumnRef::Sparse(_) => None,
        }
    }

    pub fn sparse(&self, path: &str) -> Option<&SparseColumn> {
        match self.find(path)? {
            ColumnRef::Sparse(i) => self.sparse_columns.get(i),
            _ => None,
        }
    }

    /// Offset of the fixed region from the body start.
    pub fn fixed_region_offset(&self) -> usize {
        self.null_bitmap_size
    }

    /// Offset of the variable offset table from the body start.
    pub fn offset_table_offset(&self) -> usize {
        self.null_bitmap_size + self.fixed_size
    }

    /// Size of a body with every column absent: zeroed bitmap and fixed region
    /// plus a one-byte zero offset per variable column.
    pub fn empty_body_size(&self) -> usize {
        self.offset_table_offset() + self.variable_columns.len()
    }

    pub fn empty_body(&self) -> Vec<u8> {
        vec![0u8; self.empty_body_size()]
    }

    /// Capacity estimate used when a buffer is created without a hint.
    pub fn size_estimate(&self) -> usize {
        let declared_sparse = self.sparse_columns.len() * 16;
        self.empty_body_size() + self.variable_columns.len() * 16 + declared_sparse
            + self.sparse_capacity_hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(path: &str, code: LayoutCode, offset: usize, bit: usize) -> FixedColumn {
        FixedColumn {
            path: path.to_string(),
            type_arg: TypeArgument::scalar(code),
            byte_offset: offset,
            null_bit_index: bit,
            required: false,
            default: None,
        }
    }

    fn sample() -> Layout {
        Layout::from_parts(
            "sample".to_string(),
            SchemaId(1),
            vec![
                column("id", LayoutCode::Int32, 0, 0),
                column("flag", LayoutCode::Boolean, 4, 1),
            ],
            vec![VariableColumn {
                path: "name".to_string(),
                type_arg: TypeArgument::scalar(LayoutCode::Utf8),
                variable_index: 0,
                null_bit_index: 2,
                required: false,
                default: None,
            }],
            vec![SparseColumn {
                path: "tags".to_string(),
                type_arg: TypeArgument::typed_array(LayoutCode::Utf8),
            }],
            0,
        )
    }

    #[test]
    fn regions_follow_the_bitmap() {
        let layout = sample();
        assert_eq!(layout.column_count(), 3);
        assert_eq!(layout.null_bitmap_size(), 1);
        assert_eq!(layout.fixed_size(), 5);
        assert_eq!(layout.fixed_region_offset(), 1);
        assert_eq!(layout.offset_table_offset(), 6);
        assert_eq!(layout.empty_body(), vec![0u8; 7]);
    }

    #[test]
    fn paths_resolve_to_their_storage() {
        let layout = sample();
        assert_eq!(layout.find("id"), Some(ColumnRef::Fixed(0)));
        assert_eq!(layout.find("name"), Some(ColumnRef::Variable(0)));
        assert_eq!(layout.find("tags"), Some(ColumnRef::Sparse(0)));
        assert_eq!(layout.find("missing"), None);
        assert!(layout.schematized("tags").is_none());
        assert_eq!(layout.sparse("tags").unwrap().type_arg.code, LayoutCode::TypedArray);
    }

    #[test]
    fn column_at_walks_fixed_then_variable() {
        let layout = sample();
        let order: Vec<&str> = (0..layout.column_count())
            .map(|bit| layout.column_at(bit).unwrap().path())
            .collect();
        assert_eq!(order, vec!["id", "flag", "name"]);
        assert!(layout.column_at(3).is_none());
        assert_eq!(layout.column_at(2).unwrap().null_bit_index(), 2);
    }
}
