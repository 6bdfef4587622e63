//! Per-type field and tag metadata used for marshaling.

mod cache;
mod error;
mod record;
mod tags;
mod types;

pub use cache::SchemaCache;
pub use error::{ConversionError, SchemaError};
pub use record::{AttributeField, Record};
pub use tags::{parse_tag, TagParseError, TagSpec, OMIT_EMPTY, SKIP_NAME};
pub use types::{FieldDecl, FieldKind, FieldMetadata, TypeSchema};
