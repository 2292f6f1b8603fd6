//! Public API: key construction, filter parsing, and PartiQL compilation.

pub mod filter;
pub mod key_utils;
pub mod partiql;

pub use filter::{CompareOp, Condition, Filter, FilterExpr, LogicalOp, Query};
pub use key_utils::{build_items, build_key, build_key_from_json};
pub use partiql::{CompiledStatement, ReturnConsumedCapacity, compile, compile_query};
