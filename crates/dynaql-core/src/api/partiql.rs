//! Compiles filter objects into parameterized PartiQL `SELECT` statements.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::encoding::{NativeValue, WireValue, encode};
use crate::error::{Error, QueryError};
use crate::types::{MAX_FILTER_DEPTH, TableSchema};

use super::filter::{CompareOp, Condition, Filter, FilterExpr, LogicalOp, Query};

/// A statement ready to hand to the store's execute-statement call.
///
/// `parameters` binds positionally: the n-th `?` in `statement` takes the
/// n-th parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompiledStatement {
    pub statement: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<WireValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnConsumedCapacity {
    Total,
}

/// Compile a JSON filter object against `schema`.
pub fn compile(schema: &TableSchema, filter: &Value) -> Result<CompiledStatement, Error> {
    let query = Query::from_json(filter)?;
    compile_query(schema, &query)
}

/// Compile an already parsed [`Query`].
pub fn compile_query(schema: &TableSchema, query: &Query) -> Result<CompiledStatement, Error> {
    let mut writer = StatementWriter::default();
    let clauses = writer.clauses(&query.filter, 0)?;

    let mut statement = format!("SELECT * FROM {}", quote_identifier(&schema.table_name));
    let mut return_consumed_capacity = None;
    if !clauses.is_empty() {
        statement.push_str(" WHERE ");
        statement.push_str(&clauses.join(" AND "));
        return_consumed_capacity = Some(ReturnConsumedCapacity::Total);
    }

    debug!(
        table = %schema.table_name,
        statement = %statement,
        parameters = writer.parameters.len(),
        "compiled statement"
    );

    Ok(CompiledStatement {
        statement,
        parameters: writer.parameters,
        limit: query.limit,
        next_token: query.offset.clone(),
        return_consumed_capacity,
    })
}

/// Accumulates parameters in the same order their placeholders are written.
#[derive(Default)]
struct StatementWriter {
    parameters: Vec<WireValue>,
}

impl StatementWriter {
    fn bind(&mut self, value: &NativeValue) -> Result<(), Error> {
        self.parameters.push(encode(value)?);
        Ok(())
    }

    /// The clauses of one filter object; the caller joins them with `AND`.
    fn clauses(&mut self, filter: &Filter, depth: usize) -> Result<Vec<String>, Error> {
        if depth > MAX_FILTER_DEPTH {
            return Err(QueryError::NestingTooDeep {
                max: MAX_FILTER_DEPTH,
            }
            .into());
        }

        let mut out = Vec::new();
        for expr in &filter.exprs {
            match expr {
                FilterExpr::Field { name, condition } => self.field(name, condition, &mut out)?,
                FilterExpr::Group { op, operands } => {
                    if let Some(group) = self.group(*op, operands, depth)? {
                        out.push(group);
                    }
                }
            }
        }
        Ok(out)
    }

    fn field(
        &mut self,
        name: &str,
        condition: &Condition,
        out: &mut Vec<String>,
    ) -> Result<(), Error> {
        let path = quote_path(name);
        match condition {
            Condition::Equals(value) => {
                self.bind(value)?;
                out.push(format!("{path} = ?"));
            }
            Condition::In(values) if values.is_empty() => {}
            Condition::In(values) => {
                for value in values {
                    self.bind(value)?;
                }
                let placeholders = vec!["?"; values.len()].join(",");
                out.push(format!("{path} IN ({placeholders})"));
            }
            Condition::Compare(ops) => {
                for (op, value) in ops {
                    self.bind(value)?;
                    out.push(comparison(*op, &path));
                }
            }
        }
        Ok(())
    }

    fn group(
        &mut self,
        op: LogicalOp,
        operands: &[Filter],
        depth: usize,
    ) -> Result<Option<String>, Error> {
        let mut parts = Vec::with_capacity(operands.len());
        for operand in operands {
            let clauses = self.clauses(operand, depth + 1)?;
            match clauses.len() {
                0 => {}
                1 => parts.extend(clauses),
                _ => parts.push(format!("({})", clauses.join(" AND "))),
            }
        }
        if parts.is_empty() {
            return Ok(None);
        }

        Ok(Some(match op {
            LogicalOp::And | LogicalOp::Or => {
                let separator = format!(" {} ", op.keyword());
                format!("({})", parts.join(separator.as_str()))
            }
            LogicalOp::Not => format!("NOT ({})", parts.join(" AND ")),
        }))
    }
}

fn comparison(op: CompareOp, path: &str) -> String {
    match op {
        CompareOp::Eq => format!("{path} = ?"),
        CompareOp::Ne => format!("{path} <> ?"),
        CompareOp::Ge => format!("{path} >= ?"),
        CompareOp::Gt => format!("{path} > ?"),
        CompareOp::Le => format!("{path} <= ?"),
        CompareOp::Lt => format!("{path} < ?"),
        CompareOp::Like => format!("contains({path}, ?)"),
    }
}

/// Double-quote an identifier, doubling any embedded quotes.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Plain (optionally dotted) identifiers stay bare; anything else is quoted.
fn quote_path(name: &str) -> String {
    let is_identifier = |segment: &str| {
        let mut chars = segment.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    if name.split('.').all(is_identifier) {
        name.to_string()
    } else {
        quote_identifier(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::types::ScalarAttributeType;
    use serde_json::json;

    fn users() -> TableSchema {
        TableSchema::builder("users")
            .partition_key("id", ScalarAttributeType::S)
            .build()
            .unwrap()
    }

    fn compiled(filter: Value) -> CompiledStatement {
        compile(&users(), &filter).unwrap()
    }

    #[test]
    fn test_empty_filter_has_no_where() {
        let c = compiled(json!({}));
        assert_eq!(c.statement, "SELECT * FROM \"users\"");
        assert!(c.parameters.is_empty());
        assert_eq!(c.limit, None);
        assert_eq!(c.return_consumed_capacity, None);
    }

    #[test]
    fn test_limit_offset_only_has_no_where() {
        let c = compiled(json!({"limit": 5, "offset": "next-page"}));
        assert_eq!(c.statement, "SELECT * FROM \"users\"");
        assert_eq!(c.limit, Some(5));
        assert_eq!(c.next_token.as_deref(), Some("next-page"));
    }

    #[test]
    fn test_scalar_equality() {
        let c = compiled(json!({"name": "Alice"}));
        assert_eq!(c.statement, "SELECT * FROM \"users\" WHERE name = ?");
        assert_eq!(c.parameters, vec![WireValue::s("Alice")]);
        assert_eq!(c.return_consumed_capacity, Some(ReturnConsumedCapacity::Total));
    }

    #[test]
    fn test_operator_map_range() {
        let c = compiled(json!({"age": {"gte": 18, "lt": 65}}));
        assert_eq!(
            c.statement,
            "SELECT * FROM \"users\" WHERE age >= ? AND age < ?"
        );
        assert_eq!(c.parameters, vec![WireValue::n("18"), WireValue::n("65")]);
    }

    #[test]
    fn test_every_operator() {
        let c = compiled(json!({
            "f": {"eq": 1, "ne": 2, "ge": 3, "gt": 4, "le": 5, "lte": 6, "lt": 7, "like": "ab"}
        }));
        assert_eq!(
            c.statement,
            "SELECT * FROM \"users\" WHERE f = ? AND f <> ? AND f >= ? AND f > ? \
             AND f <= ? AND f <= ? AND f < ? AND contains(f, ?)"
        );
        assert_eq!(c.parameters.len(), 8);
        assert_eq!(c.parameters[7], WireValue::s("ab"));
    }

    #[test]
    fn test_membership_list() {
        let c = compiled(json!({"tags": ["x", "y", "z"]}));
        assert_eq!(c.statement, "SELECT * FROM \"users\" WHERE tags IN (?,?,?)");
        assert_eq!(
            c.parameters,
            vec![WireValue::s("x"), WireValue::s("y"), WireValue::s("z")]
        );
    }

    #[test]
    fn test_empty_membership_list_emits_nothing() {
        let c = compiled(json!({"tags": [], "name": "a"}));
        assert_eq!(c.statement, "SELECT * FROM \"users\" WHERE name = ?");
        assert_eq!(c.parameters.len(), 1);

        let c = compiled(json!({"tags": []}));
        assert_eq!(c.statement, "SELECT * FROM \"users\"");
        assert!(c.parameters.is_empty());
    }

    #[test]
    fn test_falsy_scalars_are_skipped() {
        let c = compiled(json!({"count": 0, "name": "", "active": false, "role": "admin"}));
        assert_eq!(c.statement, "SELECT * FROM \"users\" WHERE role = ?");
        assert_eq!(c.parameters, vec![WireValue::s("admin")]);
    }

    #[test]
    fn test_or_group_list_form() {
        let c = compiled(json!({"$or": [{"status": "A"}, {"status": "B"}]}));
        assert_eq!(
            c.statement,
            "SELECT * FROM \"users\" WHERE (status = ? OR status = ?)"
        );
        assert_eq!(c.parameters, vec![WireValue::s("A"), WireValue::s("B")]);
    }

    #[test]
    fn test_or_group_object_form() {
        let c = compiled(json!({"$OR": {"a": "x", "b": "y"}}));
        assert_eq!(c.statement, "SELECT * FROM \"users\" WHERE (a = ? OR b = ?)");
    }

    #[test]
    fn test_group_parameters_spliced_in_order() {
        let c = compiled(json!({
            "first": "1st",
            "$or": [{"a": "A", "b": {"gt": 2}}, {"c": ["C1", "C2"]}],
            "last": "end"
        }));
        assert_eq!(
            c.statement,
            "SELECT * FROM \"users\" WHERE first = ? AND ((a = ? AND b > ?) OR c IN (?,?)) \
             AND last = ?"
        );
        assert_eq!(
            c.parameters,
            vec![
                WireValue::s("1st"),
                WireValue::s("A"),
                WireValue::n("2"),
                WireValue::s("C1"),
                WireValue::s("C2"),
                WireValue::s("end"),
            ]
        );
    }

    #[test]
    fn test_not_group() {
        let c = compiled(json!({"$not": {"status": "banned", "age": {"lt": 13}}}));
        assert_eq!(
            c.statement,
            "SELECT * FROM \"users\" WHERE NOT (status = ? AND age < ?)"
        );
    }

    #[test]
    fn test_nested_groups() {
        let c = compiled(json!({"$and": [{"$or": [{"a": "x"}, {"b": "y"}]}, {"c": "z"}]}));
        assert_eq!(
            c.statement,
            "SELECT * FROM \"users\" WHERE ((a = ? OR b = ?) AND c = ?)"
        );
        assert_eq!(c.parameters.len(), 3);
    }

    #[test]
    fn test_group_of_skipped_entries_emits_nothing() {
        let c = compiled(json!({"$or": [{"a": 0}, {"b": []}]}));
        assert_eq!(c.statement, "SELECT * FROM \"users\"");
    }

    #[test]
    fn test_numeric_text_parameter_is_n() {
        let c = compiled(json!({"zip": "97201"}));
        assert_eq!(c.parameters, vec![WireValue::n("97201")]);
    }

    #[test]
    fn test_identifier_quoting() {
        let schema = TableSchema::builder("my\"table")
            .partition_key("id", ScalarAttributeType::S)
            .build()
            .unwrap();
        let c = compile(
            &schema,
            &json!({"first-name": "a", "address.city": "b", "_x1": "c"}),
        )
        .unwrap();
        assert_eq!(
            c.statement,
            "SELECT * FROM \"my\"\"table\" WHERE \"first-name\" = ? AND address.city = ? AND _x1 = ?"
        );
    }

    #[test]
    fn test_compile_query_from_builder() {
        let query = Query {
            filter: Filter::new()
                .eq("count", 0)
                .compare("age", vec![(CompareOp::Gt, NativeValue::from(21))])
                .group(
                    LogicalOp::Or,
                    vec![Filter::new().eq("a", "x"), Filter::new().is_in("b", vec![1, 2])],
                ),
            limit: Some(10),
            offset: None,
        };
        let c = compile_query(&users(), &query).unwrap();
        // Falsy values are only dropped when parsing JSON filters.
        assert_eq!(
            c.statement,
            "SELECT * FROM \"users\" WHERE count = ? AND age > ? AND (a = ? OR b IN (?,?))"
        );
        assert_eq!(c.parameters[0], WireValue::n("0"));
        assert_eq!(c.limit, Some(10));
    }

    #[test]
    fn test_compile_depth_limit_on_built_filters() {
        let mut filter = Filter::new().eq("leaf", "x");
        for _ in 0..MAX_FILTER_DEPTH + 2 {
            filter = Filter::new().group(LogicalOp::And, vec![filter]);
        }
        let query = Query {
            filter,
            ..Query::default()
        };
        let err = compile_query(&users(), &query).unwrap_err();
        assert!(matches!(err, Error::Query(QueryError::NestingTooDeep { .. })));
    }

    #[test]
    fn test_binary_operand_is_unclassifiable() {
        let query = Query {
            filter: Filter::new().eq("blob", NativeValue::Binary(vec![1])),
            ..Query::default()
        };
        let err = compile_query(&users(), &query).unwrap_err();
        assert!(matches!(
            err,
            Error::Codec(CodecError::UnclassifiableValue { .. })
        ));
    }

    #[test]
    fn test_statement_serializes_in_request_shape() {
        let c = compiled(json!({"age": {"gt": 30}, "limit": "20"}));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(
            json,
            json!({
                "Statement": "SELECT * FROM \"users\" WHERE age > ?",
                "Parameters": [{"N": "30"}],
                "Limit": 20,
                "ReturnConsumedCapacity": "TOTAL"
            })
        );

        let empty = serde_json::to_value(compiled(json!({}))).unwrap();
        assert_eq!(empty, json!({"Statement": "SELECT * FROM \"users\""}));
    }
}
