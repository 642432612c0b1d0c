//! # Layout Resolver
//!
//! A namespace of compiled layouts keyed by schema id. Rows name their layout
//! only by the id in their header, and nested `schema` scopes name theirs by
//! the id in their type argument; both are looked up here.
//!
//! Registration takes a write lock; lookups take a read lock and hand out
//! `Arc<Layout>` clones, so a resolver can be shared across threads while rows
//! are being encoded.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{HybridRowError, Result};
use crate::layouts::builder::LayoutBuilder;
use crate::layouts::layout::Layout;
use crate::layouts::type_arg::SchemaId;

#[derive(Debug, Default)]
pub struct LayoutResolver {
    layouts: RwLock<HashMap<SchemaId, Arc<Layout>>>,
}

impl LayoutResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, layout: Layout) -> Result<Arc<Layout>> {
        let id = layout.schema_id();
        let mut layouts = self.layouts.write();
        if layouts.contains_key(&id) {
            return Err(HybridRowError::schema(format!(
                "schema id {} is already registered",
                id
            )));
        }
        let layout = Arc::new(layout);
        layouts.insert(id, Arc::clone(&layout));
        debug!(schema = %layout.name(), schema_id = id.0, "registered layout");
        Ok(layout)
    }

    /// Builds `builder` against this resolver and registers the result.
    pub fn compile(&self, builder: &LayoutBuilder) -> Result<Arc<Layout>> {
        let layout = builder.build(self)?;
        self.register(layout)
    }

    pub fn get(&self, id: SchemaId) -> Option<Arc<Layout>> {
        self.layouts.read().get(&id).cloned()
    }

    pub fn resolve(&self, id: SchemaId) -> Result<Arc<Layout>> {
        self.get(id)
            .ok_or_else(|| HybridRowError::schema(format!("unknown schema id {}", id)))
    }

    pub fn contains(&self, id: SchemaId) -> bool {
        self.layouts.read().contains_key(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<Layout>> {
        self.layouts
            .read()
            .values()
            .find(|layout| layout.name() == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.layouts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layouts::{ColumnDef, LayoutCode, TypeArgument};

    #[test]
    fn register_and_resolve() {
        let resolver = LayoutResolver::new();
        assert!(resolver.is_empty());

        let layout = resolver
            .compile(&LayoutBuilder::new("a", SchemaId(1)).column(ColumnDef::new("x", LayoutCode::Int8)))
            .unwrap();
        assert_eq!(layout.schema_id(), SchemaId(1));
        assert!(resolver.contains(SchemaId(1)));
        assert_eq!(resolver.len(), 1);
        assert!(Arc::ptr_eq(&resolver.resolve(SchemaId(1)).unwrap(), &layout));
        assert_eq!(resolver.find_by_name("a").unwrap().schema_id(), SchemaId(1));
    }

    #[test]
    fn unknown_ids_and_duplicates_are_schema_errors() {
        let resolver = LayoutResolver::new();
        assert!(matches!(
            resolver.resolve(SchemaId(3)),
            Err(HybridRowError::Schema(_))
        ));

        resolver.compile(&LayoutBuilder::new("a", SchemaId(3))).unwrap();
        let err = resolver
            .compile(&LayoutBuilder::new("b", SchemaId(3)))
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn nested_layouts_resolve_after_registration() {
        let resolver = LayoutResolver::new();
        let outer = LayoutBuilder::new("outer", SchemaId(2))
            .column(ColumnDef::new("inner", TypeArgument::schema(SchemaId(1))));
        assert!(resolver.compile(&outer).is_err());

        resolver.compile(&LayoutBuilder::new("inner", SchemaId(1))).unwrap();
        assert!(resolver.compile(&outer).is_ok());
    }

    #[test]
    fn shared_across_threads() {
        let resolver = Arc::new(LayoutResolver::new());
        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || {
                    resolver
                        .compile(&LayoutBuilder::new(format!("t{}", i), SchemaId(i)))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(resolver.len(), 4);
    }
}
