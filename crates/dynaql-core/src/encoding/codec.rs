//! Conversion between [`NativeValue`] and [`WireValue`].

use serde_json::Value;
use tracing::trace;

use crate::error::CodecError;
use crate::types::MAX_NESTING_DEPTH;

use super::native::{Item, NativeValue, json_is_truthy};
use super::number::{Number, is_numeric_literal};
use super::wire::{PrimitiveTag, WireMap, WireTag, WireValue, decode_base64};

/// Classify a scalar.
///
/// Strings that look numeric classify as [`PrimitiveTag::N`], so numbers
/// that arrive as text still travel as numbers. Structured values (lists,
/// maps, sets, binary) are not classifiable.
pub fn classify(value: &NativeValue) -> Option<PrimitiveTag> {
    match value {
        NativeValue::Null | NativeValue::NullSentinel => Some(PrimitiveTag::Null),
        NativeValue::Bool(_) => Some(PrimitiveTag::Bool),
        NativeValue::Number(_) => Some(PrimitiveTag::N),
        NativeValue::String(s) if is_numeric_literal(s) => Some(PrimitiveTag::N),
        NativeValue::String(_) => Some(PrimitiveTag::S),
        _ => None,
    }
}

/// Encode a native value into its wire form.
pub fn encode(value: &NativeValue) -> Result<WireValue, CodecError> {
    encode_inner(value, 0)
}

/// Encode every attribute of an item.
pub fn encode_item(item: &Item) -> Result<WireMap, CodecError> {
    encode_map(item, 0)
}

fn encode_inner(value: &NativeValue, depth: usize) -> Result<WireValue, CodecError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(CodecError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        });
    }

    match value {
        NativeValue::Null => Ok(WireValue::Null(true)),
        NativeValue::NullSentinel => Ok(WireValue::Null(false)),
        NativeValue::Bool(b) => Ok(WireValue::Bool(*b)),
        NativeValue::Number(n) => Ok(WireValue::N(number_text(n)?)),
        NativeValue::String(s) if is_numeric_literal(s) => Ok(WireValue::N(s.clone())),
        NativeValue::String(s) => Ok(WireValue::S(s.clone())),
        NativeValue::List(items) => encode_list(items, depth),
        NativeValue::Map(map) => Ok(WireValue::M(encode_map(map, depth)?)),
        NativeValue::NumberSet(ns) => Ok(WireValue::Ns(
            ns.iter().map(number_text).collect::<Result<_, _>>()?,
        )),
        NativeValue::StringSet(ss) => Ok(WireValue::Ss(ss.clone())),
        NativeValue::Binary(_) | NativeValue::BinarySet(_) => {
            Err(CodecError::UnclassifiableValue { kind: value.kind() })
        }
    }
}

fn encode_list(items: &[NativeValue], depth: usize) -> Result<WireValue, CodecError> {
    // An empty list stays a list; the store has no empty sets.
    if items.is_empty() {
        return Ok(WireValue::L(Vec::new()));
    }

    let all = |tag: PrimitiveTag| items.iter().all(|v| classify(v) == Some(tag));
    if all(PrimitiveTag::N) {
        return Ok(WireValue::Ns(
            items.iter().map(literal_text).collect::<Result<_, _>>()?,
        ));
    }
    if all(PrimitiveTag::S) {
        return Ok(WireValue::Ss(
            items.iter().map(literal_text).collect::<Result<_, _>>()?,
        ));
    }

    let encoded = items
        .iter()
        .map(|v| encode_inner(v, depth + 1))
        .collect::<Result<_, _>>()?;
    Ok(WireValue::L(encoded))
}

fn encode_map(map: &Item, depth: usize) -> Result<WireMap, CodecError> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), encode_inner(v, depth + 1)?)))
        .collect()
}

/// Set members are carried as raw literal text, not nested wire values.
fn literal_text(value: &NativeValue) -> Result<String, CodecError> {
    match value {
        NativeValue::Number(n) => number_text(n),
        NativeValue::String(s) => Ok(s.clone()),
        other => Err(CodecError::UnclassifiableValue { kind: other.kind() }),
    }
}

/// Decimal text of a number; NaN and the infinities have none.
pub(crate) fn number_text(n: &Number) -> Result<String, CodecError> {
    if n.is_finite() {
        Ok(n.to_string())
    } else {
        Err(CodecError::UnclassifiableValue {
            kind: "non-finite number",
        })
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a wire value into its native form.
///
/// `N` and `NS` payloads are parsed into numbers; `SS` and `BS` members are
/// passed through unparsed. `{"NULL": false}` decodes to
/// [`NativeValue::NullSentinel`].
pub fn decode(wire: &WireValue) -> Result<NativeValue, CodecError> {
    decode_inner(wire, 0)
}

/// Decode every attribute of an item.
pub fn decode_item(item: &WireMap) -> Result<Item, CodecError> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), decode_inner(v, 1)?)))
        .collect()
}

fn decode_inner(wire: &WireValue, depth: usize) -> Result<NativeValue, CodecError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(CodecError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        });
    }

    Ok(match wire {
        WireValue::S(s) => NativeValue::String(s.clone()),
        WireValue::N(text) => NativeValue::Number(parse_number(text)?),
        WireValue::Bool(b) => NativeValue::Bool(*b),
        WireValue::Null(true) => NativeValue::Null,
        WireValue::Null(false) => NativeValue::NullSentinel,
        WireValue::B(bytes) => NativeValue::Binary(bytes.clone()),
        WireValue::Ns(items) => NativeValue::NumberSet(
            items
                .iter()
                .map(|t| parse_number(t))
                .collect::<Result<_, _>>()?,
        ),
        WireValue::Ss(items) => NativeValue::StringSet(items.clone()),
        WireValue::Bs(items) => NativeValue::BinarySet(items.clone()),
        WireValue::M(map) => NativeValue::Map(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), decode_inner(v, depth + 1)?)))
                .collect::<Result<_, CodecError>>()?,
        ),
        WireValue::L(items) => NativeValue::List(
            items
                .iter()
                .map(|v| decode_inner(v, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
    })
}

fn parse_number(text: &str) -> Result<Number, CodecError> {
    Number::parse(text)
        .ok_or_else(|| CodecError::MalformedWireValue(format!("invalid number literal '{text}'")))
}

/// Decode untyped wire JSON as it comes back from the store.
///
/// Accepts the well-formed shapes [`decode`] does, plus:
/// - arrays of wire values (e.g. an `Items` list) decode element-wise;
/// - an object with zero or several keys is walked as an attribute map;
/// - `S` payloads that are not strings are coerced to their JSON text;
/// - a single unknown tag whose payload is an object or array decodes to a
///   one-entry map with the payload decoded recursively.
///
/// An unknown tag over a scalar payload, or a bare scalar, is
/// [`CodecError::MalformedWireValue`].
pub fn decode_json(raw: &Value) -> Result<NativeValue, CodecError> {
    decode_json_inner(raw, 0)
}

fn decode_json_inner(raw: &Value, depth: usize) -> Result<NativeValue, CodecError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(CodecError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        });
    }

    match raw {
        Value::Array(items) => Ok(NativeValue::List(
            items
                .iter()
                .map(|v| decode_json_inner(v, depth + 1))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(obj) => {
            let mut entries = obj.iter();
            match (entries.next(), entries.next()) {
                (Some((tag, payload)), None) => decode_tagged(tag, payload, depth),
                _ => walk_object(obj, depth),
            }
        }
        other => Err(CodecError::MalformedWireValue(format!(
            "expected a tagged object, got {other}"
        ))),
    }
}

fn walk_object(
    obj: &serde_json::Map<String, Value>,
    depth: usize,
) -> Result<NativeValue, CodecError> {
    Ok(NativeValue::Map(
        obj.iter()
            .map(|(k, v)| Ok((k.clone(), decode_json_inner(v, depth + 1)?)))
            .collect::<Result<_, CodecError>>()?,
    ))
}

fn decode_tagged(tag: &str, payload: &Value, depth: usize) -> Result<NativeValue, CodecError> {
    let malformed = || CodecError::MalformedWireValue(format!("bad {tag} payload: {payload}"));

    let Some(known) = WireTag::from_name(tag) else {
        return match payload {
            Value::Object(_) | Value::Array(_) => {
                trace!(attribute = %tag, "treating unknown tag as attribute name");
                let inner = decode_json_inner(payload, depth + 1)?;
                Ok(NativeValue::Map(Item::from([(tag.to_string(), inner)])))
            }
            _ => Err(CodecError::MalformedWireValue(format!(
                "unknown tag '{tag}' with scalar payload {payload}"
            ))),
        };
    };

    match known {
        WireTag::S => Ok(NativeValue::String(match payload {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        WireTag::N => json_number(payload).map(NativeValue::Number),
        WireTag::Bool => payload.as_bool().map(NativeValue::Bool).ok_or_else(malformed),
        WireTag::Null => Ok(if json_is_truthy(payload) {
            NativeValue::Null
        } else {
            NativeValue::NullSentinel
        }),
        WireTag::B => json_bytes(payload).map(NativeValue::Binary),
        WireTag::Ns => json_array(payload)
            .ok_or_else(malformed)?
            .iter()
            .map(json_number)
            .collect::<Result<_, _>>()
            .map(NativeValue::NumberSet),
        WireTag::Ss => json_array(payload)
            .ok_or_else(malformed)?
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(malformed))
            .collect::<Result<_, _>>()
            .map(NativeValue::StringSet),
        WireTag::Bs => json_array(payload)
            .ok_or_else(malformed)?
            .iter()
            .map(json_bytes)
            .collect::<Result<_, _>>()
            .map(NativeValue::BinarySet),
        WireTag::M => match payload {
            Value::Object(obj) => walk_object(obj, depth),
            _ => Err(malformed()),
        },
        WireTag::L => match payload {
            Value::Array(_) => decode_json_inner(payload, depth),
            _ => Err(malformed()),
        },
    }
}

fn json_array(payload: &Value) -> Option<&Vec<Value>> {
    payload.as_array()
}

fn json_number(payload: &Value) -> Result<Number, CodecError> {
    match payload {
        Value::String(text) => parse_number(text),
        Value::Number(n) => Number::from_json(n).ok_or_else(|| {
            CodecError::MalformedWireValue(format!("non-finite number {n}"))
        }),
        other => Err(CodecError::MalformedWireValue(format!(
            "expected number literal, got {other}"
        ))),
    }
}

/// Binary payloads are base64 text, or arrays of byte values.
fn json_bytes(payload: &Value) -> Result<Vec<u8>, CodecError> {
    match payload {
        Value::String(s) => decode_base64(s)
            .map_err(|e| CodecError::MalformedWireValue(format!("bad base64 payload '{s}': {e}"))),
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| CodecError::MalformedWireValue(format!("bad byte {v}")))
            })
            .collect(),
        other => Err(CodecError::MalformedWireValue(format!(
            "expected binary payload, got {other}"
        ))),
    }
}
