use std::error::Error;
use std::io::Read;
use std::path::Path;

use dynaql_core::api::{build_key_from_json, compile};
use dynaql_core::encoding::{NativeValue, decode_json, encode};
use dynaql_core::types::TableSchema;
use serde_json::Value;
use tracing::debug;

use crate::Command;

type CommandResult = Result<Value, Box<dyn Error>>;

/// Run one subcommand and return the JSON it produces.
pub fn execute(command: &Command) -> CommandResult {
    match command {
        Command::Compile { schema, filter } => {
            let schema = load_schema(schema)?;
            let filter = read_json(filter.as_deref())?;
            let statement = compile(&schema, &filter)?;
            Ok(serde_json::to_value(&statement)?)
        }
        Command::Key { schema, data } => {
            let schema = load_schema(schema)?;
            match read_json(data.as_deref())? {
                Value::Array(items) => {
                    let mut built = Vec::with_capacity(items.len());
                    for item in &items {
                        built.push(serde_json::to_value(build_key_from_json(&schema, item)?)?);
                    }
                    Ok(Value::Array(built))
                }
                item => Ok(serde_json::to_value(build_key_from_json(&schema, &item)?)?),
            }
        }
        Command::Encode { value } => {
            let value = read_json(value.as_deref())?;
            let wire = encode(&NativeValue::try_from_json(&value)?)?;
            Ok(serde_json::to_value(&wire)?)
        }
        Command::Decode { value } => {
            let value = read_json(value.as_deref())?;
            Ok(decode_json(&value)?.to_json())
        }
    }
}

fn load_schema(path: &Path) -> Result<TableSchema, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read schema {}: {e}", path.display()))?;
    let description: Value = serde_json::from_str(&text)
        .map_err(|e| format!("schema {} is not valid JSON: {e}", path.display()))?;
    let schema = TableSchema::from_describe_json(&description)?;
    debug!(table = %schema.table_name, "loaded schema");
    Ok(schema)
}

/// Parse `arg` as JSON; `None` or `-` reads stdin instead.
fn read_json(arg: Option<&str>) -> Result<Value, Box<dyn Error>> {
    let text = match arg {
        Some(text) if text != "-" => text.to_string(),
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    serde_json::from_str(&text).map_err(|e| format!("invalid JSON input: {e}").into())
}
