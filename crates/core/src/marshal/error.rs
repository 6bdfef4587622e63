use thiserror::Error;

use crate::schema::{ConversionError, SchemaError};

/// Errors that can occur while converting records to and from items.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarshalError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Cannot convert attribute {attribute:?} into {type_name}.{field}: {source}")]
    Conversion {
        type_name: &'static str,
        field: &'static str,
        attribute: String,
        #[source]
        source: ConversionError,
    },

    #[error("Key type {type_name} marshals to {attributes} attributes; expected 1 or 2")]
    InvalidKey {
        type_name: &'static str,
        attributes: usize,
    },
}

pub type Result<T> = std::result::Result<T, MarshalError>;
