//! # Layout Compiler
//!
//! `LayoutBuilder` turns an ordered list of column definitions into a
//! [`Layout`]. Columns are partitioned by storage class and assigned their
//! positions once; the result is immutable.
//!
//! ## Storage Classes
//!
//! | Class | Default for | Storage |
//! |-------|-------------|---------|
//! | **Fixed** | null, bool, ints, floats, decimal, datetime, guid | Constant offset in the fixed region |
//! | **Variable** | utf8, binary, varint, varuint | Entry in the offset table + variable data |
//! | **Sparse** | every scope type | Tagged path + type + value after variable data |
//!
//! Any column may be forced to sparse storage. Fixed and variable storage are
//! only valid for the matching scalar types. Fields that are never declared are
//! implicitly sparse and discovered at write time.
//!
//! ## Usage
//!
//! ```ignore
//! let layout = LayoutBuilder::new("person", SchemaId(1))
//!     .column(ColumnDef::new("id", LayoutCode::Int32).required(true).default_value(0i32))
//!     .column(ColumnDef::new("name", LayoutCode::Utf8))
//!     .column(ColumnDef::new("tags", TypeArgument::typed_array(LayoutCode::Utf8)))
//!     .build(&resolver)?;
//! ```
//!
//! ## Errors
//!
//! `build` fails with `Schema` on a duplicate path, a required column without a
//! default, a default of the wrong type, invalid type arguments, a storage class
//! that does not fit the type, or a nested schema id the resolver does not know.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HybridRowError, Result};
use crate::layouts::layout::{FixedColumn, Layout, SparseColumn, VariableColumn};
use crate::layouts::resolver::LayoutResolver;
use crate::layouts::type_arg::{SchemaId, TypeArgument};
use crate::row::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Fixed,
    Variable,
    Sparse,
}

impl StorageKind {
    pub fn default_for(type_arg: &TypeArgument) -> Self {
        if type_arg.code.is_fixed() {
            StorageKind::Fixed
        } else if type_arg.code.is_variable() {
            StorageKind::Variable
        } else {
            StorageKind::Sparse
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub path: String,
    pub type_arg: TypeArgument,
    pub storage: Option<StorageKind>,
    pub required: bool,
    pub default: Option<FieldValue<'static>>,
}

impl ColumnDef {
    pub fn new(path: impl Into<String>, type_arg: impl Into<TypeArgument>) -> Self {
        Self {
            path: path.into(),
            type_arg: type_arg.into(),
            storage: None,
            required: false,
            default: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn default_value(mut self, value: impl Into<FieldValue<'static>>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.storage = Some(storage);
        self
    }

    fn resolved_storage(&self) -> StorageKind {
        self.storage
            .unwrap_or_else(|| StorageKind::default_for(&self.type_arg))
    }
}

#[derive(Debug, Clone)]
pub struct LayoutBuilder {
    name: String,
    schema_id: SchemaId,
    columns: Vec<ColumnDef>,
    sparse_capacity_hint: usize,
}

impl LayoutBuilder {
    pub fn new(name: impl Into<String>, schema_id: SchemaId) -> Self {
        Self {
            name: name.into(),
            schema_id,
            columns: Vec::new(),
            sparse_capacity_hint: 0,
        }
    }

    pub fn column(mut self, def: ColumnDef) -> Self {
        self.columns.push(def);
        self
    }

    pub fn add_column(&mut self, def: ColumnDef) -> &mut Self {
        self.columns.push(def);
        self
    }

    /// Bytes to reserve for sparse fields when a buffer is created.
    pub fn sparse_capacity_hint(mut self, bytes: usize) -> Self {
        self.sparse_capacity_hint = bytes;
        self
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    pub fn build(&self, resolver: &LayoutResolver) -> Result<Layout> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        let mut fixed = Vec::new();
        let mut variable = Vec::new();
        let mut sparse = Vec::new();

        for def in &self.columns {
            self.check_column(def, resolver)?;
            if !seen.insert(def.path.as_str()) {
                return Err(HybridRowError::schema(format!(
                    "duplicate path '{}' in schema '{}'",
                    def.path, self.name
                )));
            }

            match def.resolved_storage() {
                StorageKind::Fixed => fixed.push(def),
                StorageKind::Variable => variable.push(def),
                StorageKind::Sparse => sparse.push(SparseColumn {
                    path: def.path.clone(),
                    type_arg: def.type_arg.clone(),
                }),
            }
        }

        let mut byte_offset = 0;
        let fixed_columns: Vec<FixedColumn> = fixed
            .into_iter()
            .enumerate()
            .map(|(bit, def)| {
                let column = FixedColumn {
                    path: def.path.clone(),
                    type_arg: def.type_arg.clone(),
                    byte_offset,
                    null_bit_index: bit,
                    required: def.required,
                    default: def.default.clone(),
                };
                byte_offset += column.width();
                column
            })
            .collect();

        let first_variable_bit = fixed_columns.len();
        let variable_columns: Vec<VariableColumn> = variable
            .into_iter()
            .enumerate()
            .map(|(index, def)| VariableColumn {
                path: def.path.clone(),
                type_arg: def.type_arg.clone(),
                variable_index: index,
                null_bit_index: first_variable_bit + index,
                required: def.required,
                default: def.default.clone(),
            })
            .collect();

        let layout = Layout::from_parts(
            self.name.clone(),
            self.schema_id,
            fixed_columns,
            variable_columns,
            sparse,
            self.sparse_capacity_hint,
        );

        debug!(
            schema = %self.name,
            schema_id = self.schema_id.0,
            fixed = layout.fixed_columns().len(),
            variable = layout.variable_columns().len(),
            sparse = layout.sparse_columns().len(),
            fixed_size = layout.fixed_size(),
            "compiled layout"
        );

        Ok(layout)
    }

    fn check_column(&self, def: &ColumnDef, resolver: &LayoutResolver) -> Result<()> {
        let fail = |reason: String| {
            Err(HybridRowError::schema(format!(
                "column '{}' of schema '{}': {}",
                def.path, self.name, reason
            )))
        };

        if def.path.is_empty() {
            return fail("empty path".to_string());
        }
        if let Err(err) = def.type_arg.validate() {
            return fail(err.to_string());
        }

        let mut referenced = Vec::new();
        def.type_arg.referenced_schemas(&mut referenced);
        for id in referenced {
            if id != self.schema_id && !resolver.contains(id) {
                return fail(format!("unresolved schema id {}", id));
            }
        }

        let storage = def.resolved_storage();
        match storage {
            StorageKind::Fixed if !def.type_arg.code.is_fixed() => {
                return fail(format!("{} cannot use fixed storage", def.type_arg));
            }
            StorageKind::Variable if !def.type_arg.code.is_variable() => {
                return fail(format!("{} cannot use variable storage", def.type_arg));
            }
            StorageKind::Sparse if def.required || def.default.is_some() => {
                return fail("sparse columns take no required flag or default".to_string());
            }
            _ => {}
        }

        if let Some(default) = &def.default {
            if default.code() != def.type_arg.code {
                return fail(format!(
                    "default of type {} does not match {}",
                    default.code(),
                    def.type_arg
                ));
            }
        }
        if def.required && def.default.is_none() {
            return fail("required column has no default".to_string());
        }
        Ok(())
    }
}
