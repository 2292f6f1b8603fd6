use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::CodecError;
use crate::types::MAX_NESTING_DEPTH;

use super::number::Number;

/// A map of attribute name to native value, as used for items and keys.
pub type Item = BTreeMap<String, NativeValue>;

/// An ordinary in-memory value as application code sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Raw bytes. Only produced by decoding; encoding rejects it unless the
    /// attribute is declared binary by the table.
    Binary(Vec<u8>),
    List(Vec<NativeValue>),
    Map(Item),
    NumberSet(Vec<Number>),
    StringSet(Vec<String>),
    BinarySet(Vec<Vec<u8>>),
    /// Decode outcome of a `NULL` wire value whose marker is `false`.
    ///
    /// Kept distinct from [`NativeValue::Null`]; re-encodes to `{"NULL": false}`
    /// and renders as the placeholder string `"1"` in JSON.
    NullSentinel,
}

impl NativeValue {
    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            NativeValue::Null => "null",
            NativeValue::Bool(_) => "boolean",
            NativeValue::Number(_) => "number",
            NativeValue::String(_) => "string",
            NativeValue::Binary(_) => "binary",
            NativeValue::List(_) => "list",
            NativeValue::Map(_) => "map",
            NativeValue::NumberSet(_) => "number set",
            NativeValue::StringSet(_) => "string set",
            NativeValue::BinarySet(_) => "binary set",
            NativeValue::NullSentinel => "null sentinel",
        }
    }

    /// Truthiness as the filter syntax sees it: null, `false`, zero and the
    /// empty string are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            NativeValue::Null => false,
            NativeValue::Bool(b) => *b,
            NativeValue::Number(n) => !n.is_zero(),
            NativeValue::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Item> {
        match self {
            NativeValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Render as JSON. Sets become arrays and binary becomes an array of
    /// byte values.
    pub fn to_json(&self) -> Value {
        match self {
            NativeValue::Null => Value::Null,
            NativeValue::Bool(b) => Value::Bool(*b),
            NativeValue::Number(n) => n.to_json(),
            NativeValue::String(s) => Value::String(s.clone()),
            NativeValue::Binary(b) => bytes_to_json(b),
            NativeValue::List(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            NativeValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            NativeValue::NumberSet(ns) => Value::Array(ns.iter().map(|n| n.to_json()).collect()),
            NativeValue::StringSet(ss) => {
                Value::Array(ss.iter().map(|s| Value::String(s.clone())).collect())
            }
            NativeValue::BinarySet(bs) => Value::Array(bs.iter().map(|b| bytes_to_json(b)).collect()),
            NativeValue::NullSentinel => Value::String("1".to_string()),
        }
    }
}

impl NativeValue {
    /// Convert caller-supplied JSON, rejecting nesting deeper than
    /// [`MAX_NESTING_DEPTH`].
    ///
    /// The `From<&Value>` conversion has no bound and is meant for values
    /// built in code.
    pub fn try_from_json(value: &Value) -> Result<Self, CodecError> {
        Self::from_json_at(value, 0)
    }

    fn from_json_at(value: &Value, depth: usize) -> Result<Self, CodecError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(CodecError::NestingTooDeep {
                max: MAX_NESTING_DEPTH,
            });
        }

        Ok(match value {
            Value::Array(items) => NativeValue::List(
                items
                    .iter()
                    .map(|v| Self::from_json_at(v, depth + 1))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => NativeValue::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), Self::from_json_at(v, depth + 1)?)))
                    .collect::<Result<_, CodecError>>()?,
            ),
            scalar => NativeValue::from(scalar),
        })
    }
}

/// [`NativeValue::is_truthy`] without converting the value; arrays and
/// objects are truthy.
pub(crate) fn json_is_truthy(value: &Value) -> bool {
    match value {
        Value::Array(_) | Value::Object(_) => true,
        scalar => NativeValue::from(scalar).is_truthy(),
    }
}

fn bytes_to_json(bytes: &[u8]) -> Value {
    Value::Array(bytes.iter().map(|&byte| Value::from(byte)).collect())
}

impl From<&Value> for NativeValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => NativeValue::Null,
            Value::Bool(b) => NativeValue::Bool(*b),
            Value::Number(n) => Number::from_json(n)
                .map(NativeValue::Number)
                .unwrap_or(NativeValue::Null),
            Value::String(s) => NativeValue::String(s.clone()),
            Value::Array(items) => NativeValue::List(items.iter().map(NativeValue::from).collect()),
            Value::Object(map) => NativeValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), NativeValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for NativeValue {
    fn from(value: Value) -> Self {
        NativeValue::from(&value)
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::String(value.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::String(value)
    }
}

impl From<bool> for NativeValue {
    fn from(value: bool) -> Self {
        NativeValue::Bool(value)
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        NativeValue::Number(Number::Int(value))
    }
}

impl From<i32> for NativeValue {
    fn from(value: i32) -> Self {
        NativeValue::Number(Number::from(value))
    }
}

/// NaN and the infinities become [`NativeValue::Null`], as in `serde_json`.
impl From<f64> for NativeValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(NativeValue::Number)
            .unwrap_or(NativeValue::Null)
    }
}

impl From<Number> for NativeValue {
    fn from(value: Number) -> Self {
        NativeValue::Number(value)
    }
}

impl<T: Into<NativeValue>> From<Vec<T>> for NativeValue {
    fn from(values: Vec<T>) -> Self {
        NativeValue::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!NativeValue::Null.is_truthy());
        assert!(!NativeValue::from(false).is_truthy());
        assert!(!NativeValue::from(0).is_truthy());
        assert!(!NativeValue::from(0.0).is_truthy());
        assert!(!NativeValue::from("").is_truthy());

        assert!(NativeValue::from(true).is_truthy());
        assert!(NativeValue::from(-1).is_truthy());
        assert!(NativeValue::from("0").is_truthy());
        assert!(NativeValue::List(vec![]).is_truthy());
        assert!(NativeValue::NullSentinel.is_truthy());
    }

    #[test]
    fn test_from_json_nested() {
        let v = NativeValue::from(json!({"a": [1, "x", null], "b": {"c": true}}));
        let map = v.as_map().unwrap();
        assert_eq!(
            map["a"],
            NativeValue::List(vec![
                NativeValue::from(1),
                NativeValue::from("x"),
                NativeValue::Null
            ])
        );
        assert_eq!(map["b"].as_map().unwrap()["c"], NativeValue::Bool(true));
    }

    #[test]
    fn test_to_json_sets_and_binary() {
        let ns = NativeValue::NumberSet(vec![Number::Int(1), Number::Float(2.5)]);
        assert_eq!(ns.to_json(), json!([1, 2.5]));

        let bin = NativeValue::Binary(vec![0, 255]);
        assert_eq!(bin.to_json(), json!([0, 255]));

        assert_eq!(NativeValue::NullSentinel.to_json(), json!("1"));
    }

    #[test]
    fn test_json_roundtrip() {
        let doc = json!({"name": "Alice", "age": 30, "score": 9.5, "tags": ["a", "b"]});
        assert_eq!(NativeValue::from(&doc).to_json(), doc);
    }

    #[test]
    fn test_nan_becomes_null() {
        assert_eq!(NativeValue::from(f64::NAN), NativeValue::Null);
    }

    #[test]
    fn test_try_from_json_matches_from() {
        let doc = json!({"a": [1, "x", null], "b": {"c": true}});
        assert_eq!(
            NativeValue::try_from_json(&doc).unwrap(),
            NativeValue::from(&doc)
        );
    }

    /// Nesting far past the limit, built without the parser's own recursion cap.
    fn deep_array(levels: usize) -> Value {
        let mut value = json!(1);
        for _ in 0..levels {
            value = Value::Array(vec![value]);
        }
        value
    }

    #[test]
    fn test_try_from_json_depth_limit() {
        assert!(NativeValue::try_from_json(&deep_array(MAX_NESTING_DEPTH)).is_ok());

        let err = NativeValue::try_from_json(&deep_array(MAX_NESTING_DEPTH + 1)).unwrap_err();
        assert_eq!(
            err,
            CodecError::NestingTooDeep {
                max: MAX_NESTING_DEPTH
            }
        );

        let deep = deep_array(100_000);
        assert!(NativeValue::try_from_json(&deep).is_err());
        assert!(json_is_truthy(&deep));
        // Dismantle iteratively; the default drop recurses.
        let mut value = deep;
        while let Value::Array(mut items) = value {
            value = items.pop().unwrap_or(Value::Null);
        }
    }

    #[test]
    fn test_json_is_truthy() {
        assert!(!json_is_truthy(&json!(0)));
        assert!(!json_is_truthy(&json!("")));
        assert!(!json_is_truthy(&json!(null)));
        assert!(json_is_truthy(&json!([])));
        assert!(json_is_truthy(&json!({})));
        assert!(json_is_truthy(&json!("x")));
    }
}
