use std::collections::HashMap;

use serde::Serialize;

use super::tags::{parse_tag, TagSpec};
use super::SchemaError;

/// The storage-relevant kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Bool,
    Binary,
    StringList,
}

/// Compile-time declaration of one field: name, kind and raw tag text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: &'static str,
    pub kind: FieldKind,
    pub tag: &'static str,
}

impl FieldDecl {
    pub const fn new(name: &'static str, kind: FieldKind, tag: &'static str) -> Self {
        Self { name, kind, tag }
    }
}

/// Parsed metadata for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMetadata {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Tag specs keyed by namespace.
    pub tags: HashMap<String, TagSpec>,
}

impl FieldMetadata {
    pub fn tag(&self, namespace: &str) -> Option<&TagSpec> {
        self.tags.get(namespace)
    }

    /// Attribute name under `namespace`.
    ///
    /// Falls back to the field name when the namespace is absent or names
    /// nothing; `None` means the field is skipped (`"-"`).
    pub fn attribute_name(&self, namespace: &str) -> Option<&str> {
        match self.tag(namespace) {
            Some(spec) if spec.is_skipped() => None,
            Some(spec) if !spec.name.is_empty() => Some(spec.name.as_str()),
            _ => Some(self.name),
        }
    }
}

/// Field metadata for one record type, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSchema {
    pub type_name: &'static str,
    pub fields: Vec<FieldMetadata>,
}

impl TypeSchema {
    /// Parses every field declaration; the first malformed tag aborts.
    pub fn from_decls(type_name: &'static str, decls: &[FieldDecl]) -> Result<Self, SchemaError> {
        let fields = decls
            .iter()
            .map(|decl| {
                let tags = parse_tag(decl.tag).map_err(|e| SchemaError::MalformedTag {
                    type_name,
                    field: decl.name,
                    group: e.group,
                    reason: e.reason,
                })?;
                Ok(FieldMetadata {
                    name: decl.name,
                    kind: decl.kind,
                    tags,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        Ok(Self { type_name, fields })
    }

    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Finds the field whose attribute name under `namespace` is `attribute`.
    pub fn field_for_attribute(&self, namespace: &str, attribute: &str) -> Option<&FieldMetadata> {
        self.fields
            .iter()
            .find(|f| f.attribute_name(namespace) == Some(attribute))
    }
}
