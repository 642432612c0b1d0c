//! # Schema Description Language
//!
//! Segments carry their schemas as JSON text so a reader needs nothing but the
//! stream to decode it. This module parses that text into a [`Namespace`] and
//! compiles every schema in it into a [`LayoutResolver`].
//!
//! ## Format
//!
//! ```json
//! {
//!   "name": "people",
//!   "schemas": [
//!     { "name": "address", "id": 2, "properties": [
//!         { "path": "city", "type": { "code": "utf8" } } ] },
//!     { "name": "person", "id": 1, "properties": [
//!         { "path": "id",   "type": { "code": "int32" }, "required": true, "default": 0 },
//!         { "path": "home", "type": { "code": "schema", "schema_id": 2 } },
//!         { "path": "note", "type": { "code": "utf8" }, "storage": "sparse" } ] }
//!   ]
//! }
//! ```
//!
//! `type` is a serialized [`TypeArgument`]. `storage` defaults by type exactly
//! as in [`LayoutBuilder`]. Defaults are JSON literals checked against the
//! column type.
//!
//! ## Compile Order
//!
//! Schemas may reference each other in any order. Compilation repeatedly
//! builds every schema whose references are already registered; a pass that
//! makes no progress means a reference can never resolve.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{HybridRowError, Result};
use crate::layouts::builder::{ColumnDef, LayoutBuilder, StorageKind};
use crate::layouts::resolver::LayoutResolver;
use crate::layouts::type_arg::{SchemaId, TypeArgument};
use crate::row::FieldValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub schemas: Vec<SchemaDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    pub id: SchemaId,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub path: String,
    #[serde(rename = "type")]
    pub type_arg: TypeArgument,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageKind>,
}

impl PropertyDef {
    pub fn new(path: impl Into<String>, type_arg: impl Into<TypeArgument>) -> Self {
        Self {
            path: path.into(),
            type_arg: type_arg.into(),
            required: false,
            default: None,
            storage: None,
        }
    }

    fn to_column(&self) -> Result<ColumnDef> {
        let mut column = ColumnDef::new(self.path.clone(), self.type_arg.clone())
            .required(self.required);
        if let Some(storage) = self.storage {
            column = column.storage(storage);
        }
        if let Some(default) = &self.default {
            let value = FieldValue::from_json(default, self.type_arg.code).map_err(|e| {
                HybridRowError::schema(format!("property '{}': {}", self.path, e))
            })?;
            column = column.default_value(value);
        }
        Ok(column)
    }
}

impl SchemaDef {
    pub fn to_builder(&self) -> Result<LayoutBuilder> {
        let mut builder = LayoutBuilder::new(self.name.clone(), self.id);
        for property in &self.properties {
            builder.add_column(property.to_column()?);
        }
        Ok(builder)
    }

    fn references(&self) -> Vec<SchemaId> {
        let mut out = Vec::new();
        for property in &self.properties {
            property.type_arg.referenced_schemas(&mut out);
        }
        out.retain(|id| *id != self.id);
        out
    }
}

impl Namespace {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| HybridRowError::schema(format!("invalid schema text: {}", e)))
    }

    pub fn to_sdl(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| HybridRowError::schema(format!("cannot serialize schema text: {}", e)))
    }

    pub fn compile(&self) -> Result<Arc<LayoutResolver>> {
        let resolver = Arc::new(LayoutResolver::new());
        self.compile_into(&resolver)?;
        Ok(resolver)
    }

    /// Compiles every schema into an existing resolver.
    pub fn compile_into(&self, resolver: &LayoutResolver) -> Result<()> {
        let mut pending: Vec<&SchemaDef> = self.schemas.iter().collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for schema in pending {
                let ready = schema
                    .references()
                    .iter()
                    .all(|id| resolver.contains(*id));
                if ready {
                    resolver.compile(&schema.to_builder()?)?;
                } else {
                    deferred.push(schema);
                }
            }
            if deferred.len() == before {
                let names: Vec<&str> = deferred.iter().map(|s| s.name.as_str()).collect();
                return Err(HybridRowError::schema(format!(
                    "unresolvable schema references in {:?}",
                    names
                )));
            }
            pending = deferred;
        }
        debug!(
            namespace = self.name.as_deref().unwrap_or(""),
            schemas = self.schemas.len(),
            "compiled namespace"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layouts::{ColumnRef, LayoutCode};

    const PEOPLE: &str = r#"{
        "name": "people",
        "schemas": [
            { "name": "person", "id": 1, "properties": [
                { "path": "id", "type": { "code": "int32" }, "required": true, "default": 0 },
                { "path": "name", "type": { "code": "utf8" } },
                { "path": "home", "type": { "code": "schema", "schema_id": 2 } },
                { "path": "tags", "type": { "code": "typed_array", "args": [{ "code": "utf8" }] } }
            ] },
            { "name": "address", "id": 2, "properties": [
                { "path": "city", "type": { "code": "utf8" } }
            ] }
        ]
    }"#;

    #[test]
    fn compiles_schemas_in_dependency_order() {
        let namespace = Namespace::parse(PEOPLE).unwrap();
        let resolver = namespace.compile().unwrap();

        let person = resolver.resolve(SchemaId(1)).unwrap();
        assert_eq!(person.name(), "person");
        assert_eq!(person.find("id"), Some(ColumnRef::Fixed(0)));
        assert_eq!(person.find("name"), Some(ColumnRef::Variable(0)));
        assert_eq!(person.find("home"), Some(ColumnRef::Sparse(0)));
        assert_eq!(
            person.fixed_columns()[0].default,
            Some(FieldValue::Int32(0))
        );
        assert!(resolver.contains(SchemaId(2)));
    }

    #[test]
    fn text_form_survives_serialization() {
        let namespace = Namespace::parse(PEOPLE).unwrap();
        let text = namespace.to_sdl().unwrap();
        assert_eq!(Namespace::parse(&text).unwrap(), namespace);
    }

    #[test]
    fn unresolvable_references_fail() {
        let text = r#"{ "schemas": [
            { "name": "a", "id": 1, "properties": [
                { "path": "b", "type": { "code": "schema", "schema_id": 7 } } ] } ] }"#;
        let err = Namespace::parse(text).unwrap().compile().unwrap_err();
        assert!(matches!(err, HybridRowError::Schema(_)));
    }

    #[test]
    fn bad_defaults_and_bad_json_are_schema_errors() {
        let text = r#"{ "schemas": [
            { "name": "a", "id": 1, "properties": [
                { "path": "x", "type": { "code": "int8" }, "default": 1000 } ] } ] }"#;
        assert!(Namespace::parse(text).unwrap().compile().is_err());
        assert!(Namespace::parse("{ not json").is_err());
    }

    #[test]
    fn property_storage_override() {
        let namespace = Namespace {
            name: None,
            schemas: vec![SchemaDef {
                name: "s".to_string(),
                id: SchemaId(4),
                properties: vec![PropertyDef {
                    storage: Some(StorageKind::Sparse),
                    ..PropertyDef::new("x", LayoutCode::Int64)
                }],
            }],
        };
        let resolver = namespace.compile().unwrap();
        let layout = resolver.resolve(SchemaId(4)).unwrap();
        assert_eq!(layout.find("x"), Some(ColumnRef::Sparse(0)));
    }
}
