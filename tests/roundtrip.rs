//! # Nested Scope Round-Trip Integration Tests
//!
//! Rows mixing schematized columns, sparse fields and every scope kind,
//! written once and read back through the reader, the JSON view and the
//! data item view.

use std::sync::Arc;

use hybridrow::io::DataItem;
use hybridrow::{
    FieldValue, HybridRowError, LayoutCode, Namespace, RowBuffer, RowOptions, RowReader,
    RowWriter, SchemaId, TypeArgument,
};
use serde_json::json;

const SDL: &str = r#"{
    "name": "orders",
    "schemas": [
        { "name": "address", "id": 2, "properties": [
            { "path": "zip", "type": { "code": "int32" } },
            { "path": "city", "type": { "code": "utf8" } }
        ] },
        { "name": "order", "id": 1, "properties": [
            { "path": "id", "type": { "code": "int64" }, "required": true, "default": 0 },
            { "path": "paid", "type": { "code": "bool" } },
            { "path": "customer", "type": { "code": "utf8" } },
            { "path": "ship_to", "type": { "code": "schema", "schema_id": 2 } },
            { "path": "tags", "type": { "code": "typed_set", "args": [{ "code": "utf8" }] } }
        ] }
    ]
}"#;

fn order_buffer(options: RowOptions) -> RowBuffer {
    let resolver = Namespace::parse(SDL).unwrap().compile().unwrap();
    let layout = resolver.resolve(SchemaId(1)).unwrap();
    RowBuffer::new(layout, resolver, options).unwrap()
}

fn write_order(buffer: &mut RowBuffer) {
    RowWriter::write_buffer(buffer, |w| {
        w.write_i64("id", 1001)?;
        w.write_bool("paid", true)?;
        w.write_utf8("customer", "Ada")?;
        w.write_scope("ship_to", &TypeArgument::schema(SchemaId(2)), |addr| {
            addr.write_i32("zip", 98052)?;
            addr.write_utf8("city", "Redmond")
        })?;
        w.write_scope("tags", &TypeArgument::typed_set(LayoutCode::Utf8), |set| {
            set.push("gift")?;
            set.push("rush")
        })?;
        w.write_scope(
            "qty",
            &TypeArgument::typed_map(LayoutCode::Utf8, LayoutCode::Int32),
            |map| {
                for (sku, n) in [("a-1", 2), ("b-7", 5)] {
                    map.write_scope(
                        "",
                        &TypeArgument::typed_tuple(vec![
                            LayoutCode::Utf8.into(),
                            LayoutCode::Int32.into(),
                        ]),
                        |pair| {
                            pair.push(sku)?;
                            pair.push(n)
                        },
                    )?;
                }
                Ok(())
            },
        )?;
        w.write_scope(
            "span",
            &TypeArgument::tuple(vec![LayoutCode::Int32.into(), LayoutCode::Int32.into()]),
            |t| {
                t.push(3i32)?;
                t.push(9i32)
            },
        )?;
        w.write_scope("note", &TypeArgument::nullable(LayoutCode::Utf8), |_| Ok(()))?;
        w.write_scope("meta", &TypeArgument::object(), |obj| {
            obj.write_utf8("source", "web")?;
            obj.write_scope("history", &TypeArgument::array(), |arr| {
                arr.push(1i32)?;
                arr.push("two")?;
                arr.push(true)
            })
        })
    })
    .unwrap();
}

#[test]
fn full_row_renders_as_json() {
    let mut buffer = order_buffer(RowOptions::default());
    write_order(&mut buffer);

    let json = RowReader::new(&buffer).unwrap().to_json().unwrap();
    assert_eq!(
        json,
        json!({
            "id": 1001,
            "paid": true,
            "customer": "Ada",
            "ship_to": { "zip": 98052, "city": "Redmond" },
            "tags": ["gift", "rush"],
            "qty": [["a-1", 2], ["b-7", 5]],
            "span": [3, 9],
            "note": null,
            "meta": { "source": "web", "history": [1, "two", true] }
        })
    );
}

#[test]
fn data_items_carry_full_paths() {
    let mut buffer = order_buffer(RowOptions::default());
    write_order(&mut buffer);

    let items = RowReader::new(&buffer).unwrap().data_items().unwrap();
    let paths: Vec<&str> = items.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "id",
            "paid",
            "customer",
            "ship_to.zip",
            "ship_to.city",
            "tags[0]",
            "tags[1]",
            "qty[0][0]",
            "qty[0][1]",
            "qty[1][0]",
            "qty[1][1]",
            "span[0]",
            "span[1]",
            "meta.source",
            "meta.history[0]",
            "meta.history[1]",
            "meta.history[2]",
        ]
    );
    let city: &DataItem = &items[4];
    assert_eq!(city.code, LayoutCode::Utf8);
    assert_eq!(city.value, FieldValue::from("Redmond").into_owned());
}

#[test]
fn nested_schema_scope_reads_through_its_layout() {
    let mut buffer = order_buffer(RowOptions::default());
    write_order(&mut buffer);

    let mut reader = RowReader::new(&buffer).unwrap();
    assert!(reader.seek("ship_to").unwrap());
    assert_eq!(reader.code(), Some(LayoutCode::Schema));
    let (zip, city) = reader
        .read_scope(|addr| {
            assert!(addr.is_field_scope());
            assert!(addr.read()?);
            let zip = addr.read_i32()?;
            assert!(addr.read()?);
            let city = addr.read_utf8()?.to_string();
            assert!(!addr.read()?);
            Ok((zip, city))
        })
        .unwrap();
    assert_eq!((zip, city.as_str()), (98052, "Redmond"));

    // Reading resumes after the scope.
    assert!(reader.read().unwrap());
    assert_eq!(reader.path(), Some("tags"));
}

#[test]
fn skipping_a_scope_leaves_the_parent_consistent() {
    let mut buffer = order_buffer(RowOptions::default());
    write_order(&mut buffer);

    let mut reader = RowReader::new(&buffer).unwrap();
    let mut seen = Vec::new();
    while reader.read().unwrap() {
        seen.push(reader.path().unwrap_or_default().to_string());
        if reader.code() == Some(LayoutCode::Object) {
            let first = reader
                .read_scope(|obj| {
                    obj.read()?;
                    Ok(obj.path().map(str::to_string))
                })
                .unwrap();
            assert_eq!(first.as_deref(), Some("source"));
        }
    }
    assert_eq!(
        seen,
        vec!["id", "paid", "customer", "ship_to", "tags", "qty", "span", "note", "meta"]
    );
}

#[test]
fn required_column_gets_its_default() {
    let mut buffer = order_buffer(RowOptions::default());
    RowWriter::write_buffer(&mut buffer, |w| w.write_utf8("customer", "Bo")).unwrap();

    let mut reader = RowReader::new(&buffer).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.path(), Some("id"));
    assert_eq!(reader.read_i64().unwrap(), 0);

    let mut strict = order_buffer(RowOptions::default().fill_defaults(false));
    let err = RowWriter::write_buffer(&mut strict, |w| w.write_utf8("customer", "Bo")).unwrap_err();
    assert_eq!(err, HybridRowError::MissingRequiredField("id".to_string()));
    assert!(!err.is_recoverable());
}

#[test]
fn duplicate_set_item_rolls_back_the_scope() {
    let mut buffer = order_buffer(RowOptions::default());
    let err = RowWriter::write_buffer(&mut buffer, |w| {
        w.write_i64("id", 1)?;
        let before = w.count();
        let result = w.write_scope("tags", &TypeArgument::typed_set(LayoutCode::Utf8), |set| {
            set.push("x")?;
            set.push("x")
        });
        assert_eq!(w.count(), before);
        result
    })
    .unwrap_err();
    assert_eq!(err, HybridRowError::DuplicateItem("tags".to_string()));
}

#[test]
fn map_keys_must_be_unique() {
    let mut buffer = order_buffer(RowOptions::default());
    let pair = TypeArgument::typed_tuple(vec![LayoutCode::Utf8.into(), LayoutCode::Int32.into()]);
    let err = RowWriter::write_buffer(&mut buffer, |w| {
        w.write_scope(
            "qty",
            &TypeArgument::typed_map(LayoutCode::Utf8, LayoutCode::Int32),
            |map| {
                map.write_scope("", &pair, |p| {
                    p.push("k")?;
                    p.push(1i32)
                })?;
                map.write_scope("", &pair, |p| {
                    p.push("k")?;
                    p.push(2i32)
                })
            },
        )
    })
    .unwrap_err();
    assert_eq!(err, HybridRowError::DuplicateItem("qty".to_string()));
    assert_eq!(buffer.len(), RowBuffer::new(
        Arc::clone(buffer.layout()),
        Arc::clone(buffer.resolver()),
        RowOptions::default(),
    )
    .unwrap()
    .len());
}

#[test]
fn declared_scope_type_is_enforced() {
    let mut buffer = order_buffer(RowOptions::default());
    let err = RowWriter::write_buffer(&mut buffer, |w| {
        w.write_scope("tags", &TypeArgument::typed_array(LayoutCode::Utf8), |_| Ok(()))
    })
    .unwrap_err();
    assert!(matches!(err, HybridRowError::TypeMismatch { ref path, .. } if path == "tags"));
}
