//! Conversion between store attribute values and SDK attribute values.
//!
//! Pure functions, testable without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue as SdkValue;
use dynakit_core::store::{AttributeValue, Item};

/// SDK representation of an item.
pub type SdkItem = HashMap<String, SdkValue>;

pub fn to_sdk_value(value: &AttributeValue) -> SdkValue {
    match value {
        AttributeValue::S(s) => SdkValue::S(s.clone()),
        AttributeValue::N(n) => SdkValue::N(n.clone()),
        AttributeValue::B(bytes) => SdkValue::B(Blob::new(bytes.clone())),
        AttributeValue::Bool(b) => SdkValue::Bool(*b),
        AttributeValue::Null(b) => SdkValue::Null(*b),
        AttributeValue::Ss(values) => SdkValue::Ss(values.clone()),
        AttributeValue::Ns(values) => SdkValue::Ns(values.clone()),
        AttributeValue::L(values) => SdkValue::L(values.iter().map(to_sdk_value).collect()),
        AttributeValue::M(map) => SdkValue::M(to_sdk_item(map)),
    }
}

/// Converts an SDK value; binary sets and unknown variants are rejected.
pub fn from_sdk_value(value: &SdkValue) -> Result<AttributeValue, String> {
    Ok(match value {
        SdkValue::S(s) => AttributeValue::S(s.clone()),
        SdkValue::N(n) => AttributeValue::N(n.clone()),
        SdkValue::B(blob) => AttributeValue::B(blob.as_ref().to_vec()),
        SdkValue::Bool(b) => AttributeValue::Bool(*b),
        SdkValue::Null(b) => AttributeValue::Null(*b),
        SdkValue::Ss(values) => AttributeValue::Ss(values.clone()),
        SdkValue::Ns(values) => AttributeValue::Ns(values.clone()),
        SdkValue::L(values) => {
            AttributeValue::L(values.iter().map(from_sdk_value).collect::<Result<_, _>>()?)
        }
        SdkValue::M(map) => AttributeValue::M(from_sdk_item(map)?),
        SdkValue::Bs(_) => return Err("binary sets are not supported".to_string()),
        other => return Err(format!("unsupported attribute value: {other:?}")),
    })
}

pub fn to_sdk_item(item: &Item) -> SdkItem {
    item.iter()
        .map(|(name, value)| (name.clone(), to_sdk_value(value)))
        .collect()
}

pub fn from_sdk_item(item: &SdkItem) -> Result<Item, String> {
    item.iter()
        .map(|(name, value)| Ok((name.clone(), from_sdk_value(value)?)))
        .collect()
}
