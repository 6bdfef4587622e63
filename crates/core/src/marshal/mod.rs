//! Pure conversion between [`Record`] values and store [`Item`]s.
//!
//! Attribute names come from the field tags of one namespace (for example
//! `json`), resolved through a shared [`SchemaCache`].

mod error;

pub use error::{MarshalError, Result};

use crate::schema::{Record, SchemaCache, OMIT_EMPTY};
use crate::store::Item;

/// Converts `value` into an item.
///
/// Skipped fields (`"-"`), `None` options and, with `omitempty`, empty
/// values are not written.
pub fn marshal<T: Record>(cache: &SchemaCache, namespace: &str, value: &T) -> Result<Item> {
    let schema = cache.schema::<T>()?;
    let mut item = Item::with_capacity(schema.fields.len());

    for field in &schema.fields {
        let Some(attribute) = field.attribute_name(namespace) else {
            continue;
        };
        let omit_empty = field
            .tag(namespace)
            .is_some_and(|spec| spec.has_modifier(OMIT_EMPTY));
        if omit_empty && value.field_is_empty(field.name) {
            continue;
        }
        if let Some(attr) = value.field_value(field.name) {
            item.insert(attribute.to_string(), attr);
        }
    }

    Ok(item)
}

/// Converts a key record into a partition key, or partition and sort key, item.
pub fn marshal_key<K: Record>(cache: &SchemaCache, namespace: &str, key: &K) -> Result<Item> {
    let item = marshal(cache, namespace, key)?;
    if item.is_empty() || item.len() > 2 {
        return Err(MarshalError::InvalidKey {
            type_name: std::any::type_name::<K>(),
            attributes: item.len(),
        });
    }
    Ok(item)
}

/// Copies matching attributes from `item` into `out`.
///
/// Fields with no matching attribute keep their current value.
pub fn unmarshal_into<T: Record>(
    cache: &SchemaCache,
    namespace: &str,
    item: &Item,
    out: &mut T,
) -> Result<()> {
    let schema = cache.schema::<T>()?;

    for field in &schema.fields {
        let Some(attribute) = field.attribute_name(namespace) else {
            continue;
        };
        let Some(value) = item.get(attribute) else {
            continue;
        };
        out.set_field(field.name, value)
            .map_err(|source| MarshalError::Conversion {
                type_name: schema.type_name,
                field: field.name,
                attribute: attribute.to_string(),
                source,
            })?;
    }

    Ok(())
}

/// Builds a fresh `T` from `item`.
pub fn unmarshal<T: Record + Default>(cache: &SchemaCache, namespace: &str, item: &Item) -> Result<T> {
    let mut out = T::default();
    unmarshal_into(cache, namespace, item, &mut out)?;
    Ok(out)
}
