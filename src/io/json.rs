//! # JSON View and Flattened Items
//!
//! Two debugging views over a reader:
//!
//! - `to_json` renders the rest of the current scope as a `serde_json::Value`.
//!   Row, schema and object scopes become JSON objects; every other scope
//!   becomes an array, except `nullable`, which becomes its value or `null`.
//! - `data_items` flattens every scalar leaf into a [`DataItem`] carrying the
//!   full path from the row root.
//!
//! ## Paths
//!
//! ```text
//! nodes: ["address", "lines", "[1]"]   ->   path: "address.lines[1]"
//! nodes: ["[0]", "x"]                  ->   path: "[0].x"
//! ```

use serde_json::{Map, Value as JsonValue};

use crate::error::Result;
use crate::io::reader::RowReader;
use crate::layouts::LayoutCode;
use crate::row::FieldValue;

/// A scalar leaf of a row with its full path.
#[derive(Debug, Clone, PartialEq)]
pub struct DataItem {
    pub nodes: Vec<String>,
    pub path: String,
    pub code: LayoutCode,
    pub value: FieldValue<'static>,
}

impl DataItem {
    pub fn new(nodes: Vec<String>, code: LayoutCode, value: FieldValue<'static>) -> Self {
        let path = join_nodes(&nodes);
        Self {
            nodes,
            path,
            code,
            value,
        }
    }
}

fn join_nodes(nodes: &[String]) -> String {
    let mut path = String::new();
    for node in nodes {
        if !path.is_empty() && !node.starts_with('[') {
            path.push('.');
        }
        path.push_str(node);
    }
    path
}

impl RowReader<'_> {
    /// Renders the unread fields of the current scope.
    pub fn to_json(&mut self) -> Result<JsonValue> {
        if self.is_field_scope() {
            let mut object = Map::new();
            while self.read()? {
                let key = self.path().unwrap_or_default().to_string();
                let value = self.field_json()?;
                object.insert(key, value);
            }
            return Ok(JsonValue::Object(object));
        }

        let mut items = Vec::new();
        while self.read()? {
            items.push(self.field_json()?);
        }
        if self.scope_type().code == LayoutCode::Nullable {
            return Ok(items.pop().unwrap_or(JsonValue::Null));
        }
        Ok(JsonValue::Array(items))
    }

    fn field_json(&mut self) -> Result<JsonValue> {
        match self.code() {
            Some(code) if code.is_scope() => self.read_scope(|child| child.to_json()),
            _ => Ok(self.read_value()?.to_json()),
        }
    }

    /// Flattens every scalar leaf below the current scope.
    pub fn data_items(&mut self) -> Result<Vec<DataItem>> {
        let mut out = Vec::new();
        let mut nodes = Vec::new();
        collect(self, &mut nodes, &mut out)?;
        Ok(out)
    }
}

fn collect(reader: &mut RowReader<'_>, nodes: &mut Vec<String>, out: &mut Vec<DataItem>) -> Result<()> {
    while reader.read()? {
        let node = match reader.path() {
            Some(path) => path.to_string(),
            None => format!("[{}]", reader.index()),
        };
        nodes.push(node);
        match reader.code() {
            Some(code) if code.is_scope() => {
                reader.read_scope(|child| collect(child, nodes, out))?;
            }
            Some(code) => {
                let value = reader.read_value()?.into_owned();
                out.push(DataItem::new(nodes.clone(), code, value));
            }
            None => {}
        }
        nodes.pop();
    }
    Ok(())
}
