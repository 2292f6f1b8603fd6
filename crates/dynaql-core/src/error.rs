//! Error types for all dynaql operations.

use thiserror::Error;

use crate::types::ScalarAttributeType;

/// Top-level error type for dynaql operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("cannot encode a {kind} value")]
    UnclassifiableValue { kind: &'static str },

    #[error("malformed wire value: {0}")]
    MalformedWireValue(String),

    #[error("value nesting exceeds maximum depth of {max}")]
    NestingTooDeep { max: usize },
}

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("missing partition key attribute: {0}")]
    MissingPartitionKey(String),

    #[error("table '{0}' declares no partition key")]
    PartitionKeyRequired(String),

    #[error("attribute '{name}' is declared as {expected:?} but got a {actual} value")]
    AttributeTypeMismatch {
        name: String,
        expected: ScalarAttributeType,
        actual: &'static str,
    },

    #[error("invalid table description: {0}")]
    InvalidDescription(String),

    #[error("item must be an object, got a {0} value")]
    ItemNotAnObject(&'static str),
}

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("filter syntax error: {0}")]
    FilterSyntax(String),

    #[error("filter nesting exceeds maximum depth of {max}")]
    NestingTooDeep { max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
