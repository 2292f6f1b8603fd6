//! Filter objects: the operator DSL callers use to select items.
//!
//! A filter arrives as a JSON object such as
//! `{"age": {"gte": 18}, "status": ["A", "B"], "$or": [{"x": 1}, {"y": 2}]}`
//! and is parsed into a [`Query`] before compilation.

use serde_json::{Map, Value};
use tracing::debug;

use crate::encoding::NativeValue;
use crate::encoding::native::json_is_truthy;
use crate::error::{Error, QueryError};
use crate::types::MAX_FILTER_DEPTH;

/// Logical grouping operator (`$and`, `$or`, `$not`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl LogicalOp {
    /// Resolve a `$`-prefixed key, ignoring case.
    pub fn from_key(key: &str) -> Option<Self> {
        let name = key.strip_prefix('$')?;
        if name.eq_ignore_ascii_case("and") {
            Some(LogicalOp::And)
        } else if name.eq_ignore_ascii_case("or") {
            Some(LogicalOp::Or)
        } else if name.eq_ignore_ascii_case("not") {
            Some(LogicalOp::Not)
        } else {
            None
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::Not => "NOT",
        }
    }
}

/// Comparison operator inside an operator map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
    /// Substring containment.
    Like,
}

impl CompareOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "eq" => CompareOp::Eq,
            "ne" => CompareOp::Ne,
            "ge" | "gte" => CompareOp::Ge,
            "gt" => CompareOp::Gt,
            "le" | "lte" => CompareOp::Le,
            "lt" => CompareOp::Lt,
            "like" => CompareOp::Like,
            _ => return None,
        })
    }
}

/// What a single field entry asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field = value`
    Equals(NativeValue),
    /// `field IN (...)`; an empty list selects nothing and emits nothing.
    In(Vec<NativeValue>),
    /// One clause per operator, joined with `AND`.
    Compare(Vec<(CompareOp, NativeValue)>),
}

/// One entry of a filter object.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Field { name: String, condition: Condition },
    /// A parenthesized group whose operands are joined by `op`.
    /// `Not` joins its operands with `AND` and negates the result.
    Group { op: LogicalOp, operands: Vec<Filter> },
}

/// A filter object: its entries are joined with `AND`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    pub exprs: Vec<FilterExpr>,
}

/// A parsed filter object plus the `limit`/`offset` pseudo-fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub filter: Filter,
    /// Row cap for one page of results.
    pub limit: Option<u64>,
    /// Opaque continuation token from a previous page.
    pub offset: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Add `name = value`.
    pub fn eq(mut self, name: impl Into<String>, value: impl Into<NativeValue>) -> Self {
        self.exprs.push(FilterExpr::Field {
            name: name.into(),
            condition: Condition::Equals(value.into()),
        });
        self
    }

    /// Add `name IN (values...)`.
    pub fn is_in<V: Into<NativeValue>>(mut self, name: impl Into<String>, values: Vec<V>) -> Self {
        self.exprs.push(FilterExpr::Field {
            name: name.into(),
            condition: Condition::In(values.into_iter().map(Into::into).collect()),
        });
        self
    }

    /// Add one comparison clause per `(op, value)` pair on `name`.
    pub fn compare(
        mut self,
        name: impl Into<String>,
        ops: Vec<(CompareOp, NativeValue)>,
    ) -> Self {
        self.exprs.push(FilterExpr::Field {
            name: name.into(),
            condition: Condition::Compare(ops),
        });
        self
    }

    /// Add a logical group.
    pub fn group(mut self, op: LogicalOp, operands: Vec<Filter>) -> Self {
        self.exprs.push(FilterExpr::Group { op, operands });
        self
    }
}

impl Query {
    /// Parse a filter object.
    ///
    /// `limit` and `offset` are taken out first. Scalar entries that are
    /// falsy (null, `false`, zero, the empty string) are dropped without a
    /// clause, so `{"count": 0}` filters nothing.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let obj = value.as_object().ok_or_else(|| {
            QueryError::FilterSyntax(format!("filter must be an object, got {value}"))
        })?;

        let limit = obj.get("limit").map(parse_limit).transpose()?.flatten();
        let offset = obj.get("offset").map(parse_offset).transpose()?.flatten();
        let rest = obj
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "limit" | "offset"));
        let filter = parse_entries(rest, 0)?;

        Ok(Query {
            filter,
            limit,
            offset,
        })
    }
}

fn parse_limit(value: &Value) -> Result<Option<u64>, Error> {
    if !json_is_truthy(value) {
        return Ok(None);
    }
    let limit = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    limit
        .map(Some)
        .ok_or_else(|| QueryError::FilterSyntax(format!("invalid limit {value}")).into())
}

fn parse_offset(value: &Value) -> Result<Option<String>, Error> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(QueryError::FilterSyntax(format!(
            "offset must be a token string, got {other}"
        ))
        .into()),
    }
}

fn parse_entries<'a>(
    entries: impl IntoIterator<Item = (&'a String, &'a Value)>,
    depth: usize,
) -> Result<Filter, Error> {
    if depth > MAX_FILTER_DEPTH {
        return Err(QueryError::NestingTooDeep {
            max: MAX_FILTER_DEPTH,
        }
        .into());
    }

    let mut filter = Filter::new();
    for (key, value) in entries {
        if key.starts_with('$') {
            let op = LogicalOp::from_key(key).ok_or_else(|| {
                QueryError::FilterSyntax(format!("unknown logical operator '{key}'"))
            })?;
            let operands = parse_operands(key, value, depth)?;
            filter.exprs.push(FilterExpr::Group { op, operands });
            continue;
        }

        let condition = match value {
            Value::Object(ops) => Condition::Compare(parse_operator_map(key, ops)?),
            Value::Array(items) => Condition::In(
                items
                    .iter()
                    .map(NativeValue::try_from_json)
                    .collect::<Result<_, _>>()?,
            ),
            scalar => {
                let literal = NativeValue::from(scalar);
                if !literal.is_truthy() {
                    debug!(field = %key, "skipping falsy filter value");
                    continue;
                }
                Condition::Equals(literal)
            }
        };
        filter.exprs.push(FilterExpr::Field {
            name: key.clone(),
            condition,
        });
    }
    Ok(filter)
}

/// A group takes either a list of filter objects or one filter object, in
/// which case each entry is its own operand.
fn parse_operands(key: &str, value: &Value, depth: usize) -> Result<Vec<Filter>, Error> {
    match value {
        Value::Array(members) => members
            .iter()
            .map(|member| match member {
                Value::Object(obj) => parse_entries(obj, depth + 1),
                other => Err(QueryError::FilterSyntax(format!(
                    "'{key}' members must be objects, got {other}"
                ))
                .into()),
            })
            .collect(),
        Value::Object(obj) => obj
            .iter()
            .map(|entry| parse_entries([entry], depth + 1))
            .collect(),
        other => Err(QueryError::FilterSyntax(format!(
            "'{key}' expects an object or a list of objects, got {other}"
        ))
        .into()),
    }
}

fn parse_operator_map(
    field: &str,
    ops: &Map<String, Value>,
) -> Result<Vec<(CompareOp, NativeValue)>, Error> {
    ops.iter()
        .map(|(name, operand)| {
            let op = CompareOp::from_name(name).ok_or_else(|| {
                QueryError::FilterSyntax(format!("unknown operator '{name}' on field '{field}'"))
            })?;
            Ok((op, NativeValue::try_from_json(operand)?))
        })
        .collect()
}
