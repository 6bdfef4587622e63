//! Wire-level data exchanged with the abstract store.
//!
//! These types mirror the attribute model of partition/sort-key stores without
//! depending on any vendor SDK. Backends translate them at their boundary.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single typed attribute value.
///
/// Numbers travel as decimal strings, exactly like the store's own wire
/// representation, so no precision is lost between marshaling and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    N(String),
    B(Vec<u8>),
    Bool(bool),
    Null(bool),
    Ss(Vec<String>),
    Ns(Vec<String>),
    L(Vec<AttributeValue>),
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Short type descriptor used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null(_) => "NULL",
            AttributeValue::Ss(_) => "SS",
            AttributeValue::Ns(_) => "NS",
            AttributeValue::L(_) => "L",
            AttributeValue::M(_) => "M",
        }
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttributeValue::N(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the scalar type of this value, if it can be used as a key.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            AttributeValue::S(_) => Some(ScalarType::String),
            AttributeValue::N(_) => Some(ScalarType::Number),
            AttributeValue::B(_) => Some(ScalarType::Binary),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::N(value.to_string())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::N(value.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Mapping from attribute name to value: one stored item.
pub type Item = HashMap<String, AttributeValue>;

/// The operations of the abstract store API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    CreateTable,
    DescribeTable,
    DeleteTable,
    GetItem,
    PutItem,
    UpdateItem,
    Scan,
    BatchDelete,
}

impl StoreOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::CreateTable => "CreateTable",
            StoreOperation::DescribeTable => "DescribeTable",
            StoreOperation::DeleteTable => "DeleteTable",
            StoreOperation::GetItem => "GetItem",
            StoreOperation::PutItem => "PutItem",
            StoreOperation::UpdateItem => "UpdateItem",
            StoreOperation::Scan => "Scan",
            StoreOperation::BatchDelete => "BatchDelete",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed table status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableStatus {
    Absent,
    Creating,
    Active,
    Updating,
    Deleting,
    Failed,
}

/// Key attribute scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    String,
    Number,
    Binary,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: ScalarType,
}

impl KeyAttribute {
    pub fn new(name: impl Into<String>, attribute_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Number)
    }
}

/// Billing mode for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingMode {
    PayPerRequest,
    Provisioned {
        read_capacity_units: i64,
        write_capacity_units: i64,
    },
}

/// Storage class for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableClass {
    #[default]
    Standard,
    StandardInfrequentAccess,
}

/// Request specification for a table.
///
/// Lifecycle operations treat this as the desired shape, never as the
/// authoritative state of the remote table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub table_name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub billing_mode: BillingMode,
    pub table_class: TableClass,
}

impl TableDescriptor {
    /// Creates an on-demand table descriptor with only a partition key.
    pub fn new(table_name: impl Into<String>, partition_key: KeyAttribute) -> Self {
        Self {
            table_name: table_name.into(),
            partition_key,
            sort_key: None,
            billing_mode: BillingMode::PayPerRequest,
            table_class: TableClass::Standard,
        }
    }

    pub fn with_sort_key(mut self, sort_key: KeyAttribute) -> Self {
        self.sort_key = Some(sort_key);
        self
    }

    pub fn with_provisioned_throughput(mut self, read: i64, write: i64) -> Self {
        self.billing_mode = BillingMode::Provisioned {
            read_capacity_units: read,
            write_capacity_units: write,
        };
        self
    }

    pub fn with_table_class(mut self, table_class: TableClass) -> Self {
        self.table_class = table_class;
        self
    }

    /// Names of the key attributes, partition key first.
    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.name.as_str())
            .chain(self.sort_key.as_ref().map(|k| k.name.as_str()))
    }

    /// Projects an item down to its key attributes.
    ///
    /// Returns `None` when any key attribute is missing.
    pub fn key_of(&self, item: &Item) -> Option<Item> {
        self.key_names()
            .map(|name| item.get(name).map(|v| (name.to_string(), v.clone())))
            .collect()
    }
}

/// One page of a table scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Exclusive start key for the next page; `None` when the scan is done.
    pub next_cursor: Option<Item>,
}

/// A condition evaluated against the current item before a write.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    AttributeExists(String),
    AttributeNotExists(String),
    Equals(String, AttributeValue),
    And(Vec<Condition>),
}

impl Condition {
    /// Evaluates the condition against the item currently stored, if any.
    pub fn evaluate(&self, current: Option<&Item>) -> bool {
        match self {
            Condition::AttributeExists(name) => current.is_some_and(|i| i.contains_key(name)),
            Condition::AttributeNotExists(name) => !current.is_some_and(|i| i.contains_key(name)),
            Condition::Equals(name, value) => {
                current.and_then(|i| i.get(name)).is_some_and(|v| v == value)
            }
            Condition::And(all) => all.iter().all(|c| c.evaluate(current)),
        }
    }
}

/// Which attributes an update returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnValues {
    #[default]
    None,
    AllOld,
    AllNew,
    UpdatedOld,
    UpdatedNew,
}

/// One clause of a partial update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// Assign a value to an attribute.
    Set(String, AttributeValue),
    /// Delete an attribute.
    Remove(String),
    /// Add a number to a numeric attribute (missing counts as zero).
    Add(String, AttributeValue),
}

impl UpdateAction {
    pub fn attribute(&self) -> &str {
        match self {
            UpdateAction::Set(name, _) | UpdateAction::Remove(name) | UpdateAction::Add(name, _) => {
                name
            }
        }
    }
}

/// A structured partial update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateSpec {
    pub actions: Vec<UpdateAction>,
    pub condition: Option<Condition>,
    pub return_values: ReturnValues,
}

impl UpdateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.actions
            .push(UpdateAction::Set(attribute.into(), value.into()));
        self
    }

    pub fn remove(mut self, attribute: impl Into<String>) -> Self {
        self.actions.push(UpdateAction::Remove(attribute.into()));
        self
    }

    pub fn add(mut self, attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.actions
            .push(UpdateAction::Add(attribute.into(), value.into()));
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn return_values(mut self, return_values: ReturnValues) -> Self {
        self.return_values = return_values;
        self
    }

    /// Applies the actions to `item` in order.
    ///
    /// Fails with a human-readable message when an `Add` targets a
    /// non-numeric value.
    pub fn apply_to(&self, item: &mut Item) -> Result<(), String> {
        for action in &self.actions {
            match action {
                UpdateAction::Set(name, value) => {
                    item.insert(name.clone(), value.clone());
                }
                UpdateAction::Remove(name) => {
                    item.remove(name);
                }
                UpdateAction::Add(name, delta) => {
                    let delta = delta
                        .as_n()
                        .ok_or_else(|| format!("ADD operand for '{name}' must be a number"))?;
                    let current = match item.get(name) {
                        None => "0",
                        Some(AttributeValue::N(n)) => n.as_str(),
                        Some(other) => {
                            return Err(format!(
                                "ADD target '{name}' is {} instead of N",
                                other.type_name()
                            ))
                        }
                    };
                    let sum = add_numbers(current, delta)
                        .ok_or_else(|| format!("ADD on '{name}' has a malformed number"))?;
                    item.insert(name.clone(), AttributeValue::N(sum));
                }
            }
        }
        Ok(())
    }
}

fn add_numbers(a: &str, b: &str) -> Option<String> {
    if let (Ok(x), Ok(y)) = (a.parse::<i128>(), b.parse::<i128>()) {
        if let Some(sum) = x.checked_add(y) {
            return Some(sum.to_string());
        }
    }
    let x = a.parse::<f64>().ok()?;
    let y = b.parse::<f64>().ok()?;
    Some((x + y).to_string())
}
