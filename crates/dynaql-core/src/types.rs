//! Core types: table schemas as described by the store, and recursion limits.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, SchemaError};

/// Maximum nesting depth accepted by the codec when encoding or decoding.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum nesting depth of logical groups (`$and`/`$or`/`$not`) in a filter.
pub const MAX_FILTER_DEPTH: usize = 16;

/// The role an attribute plays in a table's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyRole {
    /// Partition key.
    #[serde(rename = "HASH")]
    Hash,
    /// Sort key.
    #[serde(rename = "RANGE")]
    Range,
}

/// The declared primitive type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarAttributeType {
    S,
    N,
    B,
}

/// One element of a table's key schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: KeyRole,
}

/// An attribute whose type is declared by the table rather than inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: ScalarAttributeType,
}

/// Schema of a table, in the shape returned by the store's describe-table call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableSchema {
    pub table_name: String,
    #[serde(default)]
    pub key_schema: Vec<KeySchemaElement>,
    #[serde(default)]
    pub attribute_definitions: Vec<AttributeDefinition>,
}

impl TableSchema {
    /// Start building a schema for `table_name`.
    pub fn builder(table_name: &str) -> TableSchemaBuilder {
        TableSchemaBuilder::new(table_name.to_string())
    }

    /// Parse a describe-table response.
    ///
    /// Accepts either the bare table description or the `{"Table": {...}}`
    /// envelope the store wraps it in. The description must name a
    /// partition key.
    pub fn from_describe_json(description: &Value) -> Result<Self, Error> {
        let table = description.get("Table").unwrap_or(description);
        let schema: TableSchema = serde_json::from_value(table.clone())
            .map_err(|e| SchemaError::InvalidDescription(e.to_string()))?;
        if schema.partition_key_name().is_none() {
            return Err(SchemaError::PartitionKeyRequired(schema.table_name).into());
        }
        Ok(schema)
    }

    /// Name of the partition (HASH) key attribute.
    pub fn partition_key_name(&self) -> Option<&str> {
        self.key_name(KeyRole::Hash)
    }

    /// Name of the sort (RANGE) key attribute, if the table has one.
    pub fn sort_key_name(&self) -> Option<&str> {
        self.key_name(KeyRole::Range)
    }

    /// The declared type of `attribute`, if the table declares one.
    pub fn declared_type(&self, attribute: &str) -> Option<ScalarAttributeType> {
        self.attribute_definitions
            .iter()
            .find(|def| def.attribute_name == attribute)
            .map(|def| def.attribute_type)
    }

    fn key_name(&self, role: KeyRole) -> Option<&str> {
        self.key_schema
            .iter()
            .find(|k| k.key_type == role)
            .map(|k| k.attribute_name.as_str())
    }
}

// ---------------------------------------------------------------------------
// TableSchemaBuilder
// ---------------------------------------------------------------------------

/// Builder for a [`TableSchema`].
pub struct TableSchemaBuilder {
    name: String,
    partition_key: Option<(String, ScalarAttributeType)>,
    sort_key: Option<(String, ScalarAttributeType)>,
    attributes: Vec<AttributeDefinition>,
}

impl TableSchemaBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            partition_key: None,
            sort_key: None,
            attributes: Vec::new(),
        }
    }

    /// Set the partition key attribute and its declared type.
    pub fn partition_key(mut self, name: &str, attr_type: ScalarAttributeType) -> Self {
        self.partition_key = Some((name.to_string(), attr_type));
        self
    }

    /// Set the (optional) sort key attribute and its declared type.
    pub fn sort_key(mut self, name: &str, attr_type: ScalarAttributeType) -> Self {
        self.sort_key = Some((name.to_string(), attr_type));
        self
    }

    /// Declare the type of a non-key attribute.
    pub fn attribute(mut self, name: &str, attr_type: ScalarAttributeType) -> Self {
        self.attributes.push(AttributeDefinition {
            attribute_name: name.to_string(),
            attribute_type: attr_type,
        });
        self
    }

    pub fn build(self) -> Result<TableSchema, Error> {
        let (pk_name, pk_type) = self
            .partition_key
            .ok_or_else(|| SchemaError::PartitionKeyRequired(self.name.clone()))?;

        let mut key_schema = vec![KeySchemaElement {
            attribute_name: pk_name.clone(),
            key_type: KeyRole::Hash,
        }];
        let mut attribute_definitions = vec![AttributeDefinition {
            attribute_name: pk_name,
            attribute_type: pk_type,
        }];
        if let Some((sk_name, sk_type)) = self.sort_key {
            key_schema.push(KeySchemaElement {
                attribute_name: sk_name.clone(),
                key_type: KeyRole::Range,
            });
            attribute_definitions.push(AttributeDefinition {
                attribute_name: sk_name,
                attribute_type: sk_type,
            });
        }
        attribute_definitions.extend(self.attributes);

        Ok(TableSchema {
            table_name: self.name,
            key_schema,
            attribute_definitions,
        })
    }
}
