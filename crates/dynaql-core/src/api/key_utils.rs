use serde_json::Value;
use tracing::trace;

use crate::encoding::codec::number_text;
use crate::encoding::wire::decode_base64;
use crate::encoding::{Item, NativeValue, WireMap, WireValue, encode};
use crate::error::{Error, SchemaError};
use crate::types::{ScalarAttributeType, TableSchema};

/// Build the wire form of a key (or a whole item) for `schema`.
///
/// Every field in `data` is converted. A field whose type the table
/// declares is wrapped directly under that tag; anything else goes through
/// type inference in [`encode`]. The partition key must be present; the sort
/// key may be omitted.
pub fn build_key(schema: &TableSchema, data: &Item) -> Result<WireMap, Error> {
    let pk_name = schema
        .partition_key_name()
        .ok_or_else(|| SchemaError::PartitionKeyRequired(schema.table_name.clone()))?;
    if !data.contains_key(pk_name) {
        return Err(SchemaError::MissingPartitionKey(pk_name.to_string()).into());
    }

    let mut key = WireMap::new();
    for (name, value) in data {
        let wire = match schema.declared_type(name) {
            Some(declared) => wrap_declared(value, declared, name)?,
            None => encode(value)?,
        };
        key.insert(name.clone(), wire);
    }

    trace!(table = %schema.table_name, fields = key.len(), "built key");
    Ok(key)
}

/// [`build_key`] over a JSON object.
pub fn build_key_from_json(schema: &TableSchema, data: &Value) -> Result<WireMap, Error> {
    match NativeValue::try_from_json(data)? {
        NativeValue::Map(item) => build_key(schema, &item),
        other => Err(SchemaError::ItemNotAnObject(other.kind()).into()),
    }
}

/// Build the wire form of every item in a batch write.
///
/// Fails on the first item that lacks the partition key.
pub fn build_items(schema: &TableSchema, items: &[Item]) -> Result<Vec<WireMap>, Error> {
    items.iter().map(|item| build_key(schema, item)).collect()
}

/// Wrap a value under the table's declared tag, bypassing inference.
///
/// Numbers are carried as text under both `N` and `S`; text declared `B` must
/// be base64, as it is on the wire.
fn wrap_declared(
    value: &NativeValue,
    declared: ScalarAttributeType,
    name: &str,
) -> Result<WireValue, Error> {
    let wire = match (declared, value) {
        (ScalarAttributeType::N, NativeValue::Number(n)) => WireValue::N(number_text(n)?),
        (ScalarAttributeType::N, NativeValue::String(s)) => WireValue::N(s.clone()),
        (ScalarAttributeType::S, NativeValue::String(s)) => WireValue::S(s.clone()),
        (ScalarAttributeType::S, NativeValue::Number(n)) => WireValue::S(number_text(n)?),
        (ScalarAttributeType::B, NativeValue::Binary(b)) => WireValue::B(b.clone()),
        (ScalarAttributeType::B, NativeValue::String(s)) => {
            let bytes = decode_base64(s).map_err(|_| SchemaError::AttributeTypeMismatch {
                name: name.to_string(),
                expected: declared,
                actual: "non-base64 string",
            })?;
            WireValue::B(bytes)
        }
        (expected, other) => {
            return Err(SchemaError::AttributeTypeMismatch {
                name: name.to_string(),
                expected,
                actual: other.kind(),
            }
            .into());
        }
    };
    Ok(wire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use serde_json::json;

    fn orders_schema() -> TableSchema {
        TableSchema::builder("orders")
            .partition_key("customer", ScalarAttributeType::S)
            .sort_key("placed_at", ScalarAttributeType::N)
            .build()
            .unwrap()
    }

    fn item(v: Value) -> Item {
        match NativeValue::from(v) {
            NativeValue::Map(m) => m,
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn test_build_key_partition_only() {
        let key = build_key(&orders_schema(), &item(json!({"customer": "alice"}))).unwrap();
        assert_eq!(key.len(), 1);
        assert_eq!(key["customer"], WireValue::s("alice"));
    }

    #[test]
    fn test_build_key_with_sort_key() {
        let key = build_key(
            &orders_schema(),
            &item(json!({"customer": "alice", "placed_at": 1700000000})),
        )
        .unwrap();
        assert_eq!(key["placed_at"], WireValue::n("1700000000"));
    }

    #[test]
    fn test_declared_type_overrides_inference() {
        // "123" would infer as N; the declared S wins.
        let key = build_key(&orders_schema(), &item(json!({"customer": "123"}))).unwrap();
        assert_eq!(key["customer"], WireValue::s("123"));

        // Numeric text declared N is carried verbatim.
        let key = build_key(
            &orders_schema(),
            &item(json!({"customer": "a", "placed_at": "0042"})),
        )
        .unwrap();
        assert_eq!(key["placed_at"], WireValue::n("0042"));

        // A number under a declared S becomes its text.
        let key = build_key(&orders_schema(), &item(json!({"customer": 7}))).unwrap();
        assert_eq!(key["customer"], WireValue::s("7"));
    }

    #[test]
    fn test_undeclared_fields_are_inferred() {
        let key = build_key(
            &orders_schema(),
            &item(json!({"customer": "a", "total": "19.99", "items": ["x", "y"]})),
        )
        .unwrap();
        assert_eq!(key["total"], WireValue::n("19.99"));
        assert_eq!(key["items"], WireValue::Ss(vec!["x".into(), "y".into()]));
    }

    #[test]
    fn test_missing_partition_key() {
        let err = build_key(&orders_schema(), &item(json!({"placed_at": 1}))).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema(SchemaError::MissingPartitionKey(ref name)) if name == "customer"
        ));
    }

    #[test]
    fn test_declared_type_mismatch() {
        let err = build_key(&orders_schema(), &item(json!({"customer": true}))).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema(SchemaError::AttributeTypeMismatch {
                expected: ScalarAttributeType::S,
                actual: "boolean",
                ..
            })
        ));
    }

    #[test]
    fn test_declared_binary() {
        let schema = TableSchema::builder("blobs")
            .partition_key("digest", ScalarAttributeType::B)
            .build()
            .unwrap();
        let mut data = Item::new();
        data.insert("digest".to_string(), NativeValue::Binary(vec![0xde, 0xad]));
        let key = build_key(&schema, &data).unwrap();
        assert_eq!(key["digest"], WireValue::B(vec![0xde, 0xad]));
        assert_eq!(
            serde_json::to_value(&key).unwrap(),
            json!({"digest": {"B": "3q0="}})
        );

        // JSON input carries binary keys as base64 text.
        let key = build_key_from_json(&schema, &json!({"digest": "3q0="})).unwrap();
        assert_eq!(key["digest"], WireValue::B(vec![0xde, 0xad]));

        let err = build_key_from_json(&schema, &json!({"digest": "zz"})).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema(SchemaError::AttributeTypeMismatch {
                expected: ScalarAttributeType::B,
                ..
            })
        ));
    }

    #[test]
    fn test_undeclared_binary_is_unclassifiable() {
        let mut data = item(json!({"customer": "a"}));
        data.insert("raw".to_string(), NativeValue::Binary(vec![1]));
        let err = build_key(&orders_schema(), &data).unwrap_err();
        assert!(matches!(
            err,
            Error::Codec(CodecError::UnclassifiableValue { kind: "binary" })
        ));
    }

    #[test]
    fn test_build_key_from_json() {
        let key = build_key_from_json(&orders_schema(), &json!({"customer": "bob"})).unwrap();
        assert_eq!(key["customer"], WireValue::s("bob"));

        let err = build_key_from_json(&orders_schema(), &json!(["customer"])).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::ItemNotAnObject("list"))));
    }

    #[test]
    fn test_declared_number_must_be_finite() {
        let mut data = item(json!({"customer": "a"}));
        data.insert(
            "placed_at".to_string(),
            NativeValue::Number(crate::encoding::Number::Float(f64::NAN)),
        );
        let err = build_key(&orders_schema(), &data).unwrap_err();
        assert!(matches!(
            err,
            Error::Codec(CodecError::UnclassifiableValue {
                kind: "non-finite number"
            })
        ));
    }

    #[test]
    fn test_build_key_from_json_depth_limit() {
        let mut nested = json!({"leaf": true});
        for _ in 0..crate::types::MAX_NESTING_DEPTH + 1 {
            nested = json!({"child": nested});
        }
        let err = build_key_from_json(&orders_schema(), &json!({"customer": "a", "doc": nested}))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Codec(CodecError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn test_build_items_stops_at_first_bad_item() {
        let items = vec![
            item(json!({"customer": "a", "n": 1})),
            item(json!({"n": 2})),
        ];
        assert!(build_items(&orders_schema(), &items).is_err());

        let built = build_items(&orders_schema(), &items[..1]).unwrap();
        assert_eq!(built.len(), 1);
        assert_eq!(built[0]["n"], WireValue::n("1"));
    }
}
