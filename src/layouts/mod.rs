//! # Layouts
//!
//! The type system of the row format and the compiler that turns schemas into
//! fixed physical layouts.
//!
//! ## Module Structure
//!
//! - `code`: `LayoutCode`, the one-byte type tag, and its arity table
//! - `type_arg`: `TypeArgument` and `SchemaId`, with validation and wire encoding
//! - `layout`: the compiled, immutable `Layout` and its column descriptors
//! - `builder`: `LayoutBuilder` and `ColumnDef`, the programmatic compiler
//! - `resolver`: `LayoutResolver`, compiled layouts keyed by schema id
//! - `sdl`: JSON schema text parsed into a `Namespace` and compiled
//!
//! ## Flow
//!
//! ```text
//! SDL text ──parse──> Namespace ──┐
//!                                 ├──> LayoutBuilder ──build──> Layout ──> LayoutResolver
//! ColumnDef list ─────────────────┘                                          (Arc<Layout>)
//! ```

pub mod builder;
pub mod code;
pub mod layout;
pub mod resolver;
pub mod sdl;
pub mod type_arg;

pub use builder::{ColumnDef, LayoutBuilder, StorageKind};
pub use code::{Arity, LayoutCode};
pub use layout::{ColumnRef, FixedColumn, Layout, SchematizedColumn, SparseColumn, VariableColumn};
pub use resolver::LayoutResolver;
pub use sdl::{Namespace, PropertyDef, SchemaDef};
pub use type_arg::{SchemaId, TypeArgument};
