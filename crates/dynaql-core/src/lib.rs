//! # dynaql
//!
//! Value codec and query compiler for DynamoDB-style document stores.
//!
//! dynaql converts ordinary values to and from the store's tagged wire
//! format, builds item keys from a table's schema, and compiles
//! MongoDB-style filter objects into parameterized PartiQL statements. It
//! performs no I/O: the schema comes from a describe-table response and the
//! compiled statement is handed to whatever client talks to the store.
//!
//! ## Quick Start
//!
//! ```
//! use dynaql_core::api::{build_key_from_json, compile};
//! use dynaql_core::encoding::WireValue;
//! use dynaql_core::types::{ScalarAttributeType, TableSchema};
//! use serde_json::json;
//!
//! let schema = TableSchema::builder("users")
//!     .partition_key("user_id", ScalarAttributeType::S)
//!     .build()
//!     .unwrap();
//!
//! // Key for a get/delete.
//! let key = build_key_from_json(&schema, &json!({"user_id": "alice"})).unwrap();
//! assert_eq!(key["user_id"], WireValue::s("alice"));
//!
//! // Statement for a query.
//! let stmt = compile(&schema, &json!({"age": {"gte": 18}, "limit": 10})).unwrap();
//! assert_eq!(stmt.statement, "SELECT * FROM \"users\" WHERE age >= ?");
//! assert_eq!(stmt.parameters, vec![WireValue::n("18")]);
//! assert_eq!(stmt.limit, Some(10));
//! ```

pub mod api;
pub mod encoding;
pub mod error;
pub mod types;
