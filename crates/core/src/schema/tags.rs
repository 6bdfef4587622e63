//! Field tag parsing.
//!
//! A raw tag is a whitespace-separated list of groups of the form
//! `namespace:"name,modifier,modifier"`, e.g. `json:"id" store:"pk,omitempty"`.

use std::collections::HashMap;

use serde::Serialize;

/// Modifier that drops a field from marshaled output when its value is empty.
pub const OMIT_EMPTY: &str = "omitempty";

/// Logical name that excludes a field from a namespace entirely.
pub const SKIP_NAME: &str = "-";

/// Metadata for one tag namespace on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSpec {
    /// The unquoted value, e.g. `name,omitempty`.
    pub raw: String,
    /// The logical name, the first comma-separated element.
    pub name: String,
    /// Remaining comma-separated elements, in order.
    pub modifiers: Vec<String>,
}

impl TagSpec {
    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    pub fn is_skipped(&self) -> bool {
        self.name == SKIP_NAME
    }
}

/// A tag group that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagParseError {
    pub group: String,
    pub reason: &'static str,
}

/// Parses a raw tag string into its namespace groups.
///
/// An empty or blank tag yields no groups. A repeated namespace keeps the
/// last occurrence.
pub fn parse_tag(raw: &str) -> Result<HashMap<String, TagSpec>, TagParseError> {
    let mut tags = HashMap::new();
    for group in raw.split_whitespace() {
        let (namespace, spec) = parse_group(group)?;
        tags.insert(namespace, spec);
    }
    Ok(tags)
}

fn parse_group(group: &str) -> Result<(String, TagSpec), TagParseError> {
    let malformed = |reason| TagParseError {
        group: group.to_string(),
        reason,
    };

    let (namespace, quoted) = group
        .split_once(':')
        .ok_or_else(|| malformed("missing ':' separator"))?;
    if namespace.is_empty() {
        return Err(malformed("empty namespace"));
    }

    let value = quoted
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| malformed("value is not quoted"))?;
    if value.contains('"') {
        return Err(malformed("unbalanced quotes"));
    }

    let mut parts = value.split(',');
    let name = parts.next().unwrap_or_default().to_string();
    let modifiers = parts.map(str::to_string).collect();

    Ok((
        namespace.to_string(),
        TagSpec {
            raw: value.to_string(),
            name,
            modifiers,
        },
    ))
}
