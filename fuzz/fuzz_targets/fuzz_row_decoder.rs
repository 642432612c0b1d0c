//! Fuzz testing for row decoding.
//!
//! Arbitrary bytes are adopted as a row of a fixed layout that covers fixed,
//! variable and sparse storage, then walked through every reader view. Any
//! input may be rejected, but none may panic.

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use hybridrow::{
    ColumnDef, LayoutBuilder, LayoutCode, LayoutResolver, RowBuffer, RowEditor, RowOptions,
    RowReader, SchemaId, TypeArgument,
};

#[derive(Debug, Arbitrary)]
struct RowInput {
    body: Vec<u8>,
    edit: Option<String>,
}

fn resolver() -> Arc<LayoutResolver> {
    let resolver = Arc::new(LayoutResolver::new());
    let _ = resolver.compile(
        &LayoutBuilder::new("inner", SchemaId(2))
            .column(ColumnDef::new("n", LayoutCode::Int16))
            .column(ColumnDef::new("s", LayoutCode::Utf8)),
    );
    let _ = resolver.compile(
        &LayoutBuilder::new("outer", SchemaId(1))
            .column(ColumnDef::new("id", LayoutCode::Int64))
            .column(ColumnDef::new("flag", LayoutCode::Boolean))
            .column(ColumnDef::new("name", LayoutCode::Utf8))
            .column(ColumnDef::new("blob", LayoutCode::Binary))
            .column(ColumnDef::new("inner", TypeArgument::schema(SchemaId(2)))),
    );
    resolver
}

fuzz_target!(|input: RowInput| {
    // Frame the body with a consistent header so decoding gets past it.
    let mut bytes = Vec::with_capacity(8 + input.body.len());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&((8 + input.body.len()) as u32).to_le_bytes());
    bytes.extend_from_slice(&input.body);

    let options = RowOptions::default().max_nesting_depth(8);
    let Ok(mut row) = RowBuffer::from_bytes(bytes, resolver(), options) else {
        return;
    };

    let readable = RowReader::new(&row)
        .and_then(|mut reader| reader.to_json())
        .is_ok();
    if let Ok(mut reader) = RowReader::new(&row) {
        let _ = reader.data_items();
    }

    if let Some(text) = input.edit {
        if RowEditor::new(&mut row).set_utf8("name", &text).is_ok() && readable {
            let after = RowReader::new(&row).and_then(|mut reader| reader.to_json());
            assert!(after.is_ok(), "edited row must stay readable: {:?}", after);
        }
    }
});
