use thiserror::Error;

use super::FieldKind;

/// Errors raised while computing a type schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Malformed tag on {type_name}.{field}: {group:?} ({reason})")]
    MalformedTag {
        type_name: &'static str,
        field: &'static str,
        group: String,
        reason: &'static str,
    },
}

/// Errors raised when a single attribute cannot be converted to a field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("expected {expected:?}, found attribute of type {found}")]
    TypeMismatch {
        expected: FieldKind,
        found: &'static str,
    },

    #[error("{value:?} is not a valid {expected:?}")]
    InvalidNumber { value: String, expected: FieldKind },

    #[error("no such field")]
    UnknownField,
}
