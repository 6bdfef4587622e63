//! In-memory store implementation.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use dynakit_core::store::{
    Condition, ErrorCode, Item, ReturnValues, ScanPage, Store, StoreError, StoreOperation,
    StoreResult, TableDescriptor, TableStatus, UpdateSpec, MAX_BATCH_DELETE_ITEMS,
};

/// Number of describe calls a new table reports `Creating` before turning active.
pub const DEFAULT_ACTIVATION_POLLS: usize = 1;

#[derive(Debug)]
struct Table {
    descriptor: TableDescriptor,
    status: TableStatus,
    pending_polls: usize,
    items: BTreeMap<String, Item>,
}

#[derive(Debug)]
struct ScheduledFault {
    operation: StoreOperation,
    call: usize,
    error: StoreError,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    next_faults: HashMap<StoreOperation, VecDeque<StoreError>>,
    scheduled_faults: Vec<ScheduledFault>,
    calls: HashMap<StoreOperation, usize>,
}

impl State {
    /// Counts the call and returns an injected failure, if one is due.
    fn record_call(&mut self, operation: StoreOperation) -> StoreResult<()> {
        let count = self.calls.entry(operation).or_insert(0);
        *count += 1;
        let call = *count;

        if let Some(index) = self
            .scheduled_faults
            .iter()
            .position(|f| f.operation == operation && f.call == call)
        {
            return Err(self.scheduled_faults.remove(index).error);
        }
        if let Some(error) = self
            .next_faults
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        Ok(())
    }

    fn active_table(&self, operation: StoreOperation, name: &str) -> StoreResult<&Table> {
        match self.tables.get(name) {
            Some(table) if table.status == TableStatus::Active => Ok(table),
            Some(table) => Err(StoreError::new(
                operation,
                ErrorCode::ResourceNotFound,
                format!("Table '{name}' is not active ({:?})", table.status),
            )),
            None => Err(missing_table(operation, name)),
        }
    }

    fn active_table_mut(
        &mut self,
        operation: StoreOperation,
        name: &str,
    ) -> StoreResult<&mut Table> {
        self.active_table(operation, name)?;
        self.tables
            .get_mut(name)
            .ok_or_else(|| missing_table(operation, name))
    }
}

fn missing_table(operation: StoreOperation, name: &str) -> StoreError {
    StoreError::new(
        operation,
        ErrorCode::ResourceNotFound,
        format!("Table '{name}' not found"),
    )
}

/// Encodes the key attributes of `item` into an ordered map key.
///
/// Fails when a key attribute is missing or has the wrong scalar type.
fn encode_key(
    operation: StoreOperation,
    descriptor: &TableDescriptor,
    item: &Item,
) -> StoreResult<String> {
    let key_attributes =
        std::iter::once(&descriptor.partition_key).chain(descriptor.sort_key.as_ref());

    let mut parts = Vec::with_capacity(2);
    for attribute in key_attributes {
        let value = item.get(&attribute.name).ok_or_else(|| {
            StoreError::new(
                operation,
                ErrorCode::Validation,
                format!("Missing key attribute '{}'", attribute.name),
            )
        })?;
        if value.scalar_type() != Some(attribute.attribute_type) {
            return Err(StoreError::new(
                operation,
                ErrorCode::Validation,
                format!(
                    "Key attribute '{}' has type {}, expected {:?}",
                    attribute.name,
                    value.type_name(),
                    attribute.attribute_type
                ),
            ));
        }
        parts.push(value);
    }

    serde_json::to_string(&parts)
        .map_err(|e| StoreError::new(operation, ErrorCode::Validation, e.to_string()))
}

/// Checks that `key` carries exactly the key attributes of the table.
fn validate_key(
    operation: StoreOperation,
    descriptor: &TableDescriptor,
    key: &Item,
) -> StoreResult<String> {
    let expected = descriptor.key_names().count();
    if key.len() != expected {
        return Err(StoreError::new(
            operation,
            ErrorCode::Validation,
            format!(
                "Key has {} attributes, table '{}' expects {expected}",
                key.len(),
                descriptor.table_name
            ),
        ));
    }
    encode_key(operation, descriptor, key)
}

fn check_condition(
    operation: StoreOperation,
    condition: Option<&Condition>,
    current: Option<&Item>,
) -> StoreResult<()> {
    match condition {
        Some(condition) if !condition.evaluate(current) => Err(StoreError::new(
            operation,
            ErrorCode::ConditionalCheckFailed,
            "The conditional request failed",
        )),
        _ => Ok(()),
    }
}

fn project(item: &Item, attributes: &[&str]) -> Item {
    item.iter()
        .filter(|(name, _)| attributes.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// In-memory store for tests and local development.
///
/// Tables live in an `Arc<RwLock<_>>`, so clones share state. Items are kept
/// ordered by key, which makes scan pages and cursors deterministic. Failures
/// can be scripted per operation with [`fail_next`](Self::fail_next) and
/// [`fail_on_call`](Self::fail_on_call).
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    activation_polls: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            activation_polls: DEFAULT_ACTIVATION_POLLS,
        }
    }

    /// Sets how many describe calls report `Creating` after a create.
    pub fn with_activation_polls(mut self, polls: usize) -> Self {
        self.activation_polls = polls;
        self
    }

    /// Creates a table that is immediately active, bypassing call counters.
    pub async fn seed_table(&self, descriptor: TableDescriptor) {
        let mut state = self.state.write().await;
        state.tables.insert(
            descriptor.table_name.clone(),
            Table {
                descriptor,
                status: TableStatus::Active,
                pending_polls: 0,
                items: BTreeMap::new(),
            },
        );
    }

    /// Forces the status of an existing table.
    pub async fn set_status(&self, table: &str, status: TableStatus) {
        let mut state = self.state.write().await;
        if let Some(table) = state.tables.get_mut(table) {
            table.status = status;
            table.pending_polls = 0;
        }
    }

    /// Fails the next call of `operation` with `error`. Queued errors are
    /// returned in order.
    pub async fn fail_next(&self, operation: StoreOperation, error: StoreError) {
        let mut state = self.state.write().await;
        state
            .next_faults
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Fails the `call`-th call (1-based, counted since creation) of `operation`.
    pub async fn fail_on_call(&self, operation: StoreOperation, call: usize, error: StoreError) {
        let mut state = self.state.write().await;
        state.scheduled_faults.push(ScheduledFault {
            operation,
            call,
            error,
        });
    }

    /// Number of calls made to `operation`, including failed ones.
    pub async fn calls(&self, operation: StoreOperation) -> usize {
        let state = self.state.read().await;
        state.calls.get(&operation).copied().unwrap_or(0)
    }

    /// Number of items in `table`; zero when the table does not exist.
    pub async fn item_count(&self, table: &str) -> usize {
        let state = self.state.read().await;
        state.tables.get(table).map_or(0, |t| t.items.len())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_table(&self, descriptor: &TableDescriptor) -> StoreResult<()> {
        let op = StoreOperation::CreateTable;
        let mut state = self.state.write().await;
        state.record_call(op)?;

        if descriptor.table_name.is_empty() {
            return Err(StoreError::new(op, ErrorCode::Validation, "Table name is empty"));
        }
        if state.tables.contains_key(&descriptor.table_name) {
            return Err(StoreError::new(
                op,
                ErrorCode::Conflict,
                format!("Table '{}' already exists", descriptor.table_name),
            ));
        }

        let (status, pending_polls) = if self.activation_polls == 0 {
            (TableStatus::Active, 0)
        } else {
            (TableStatus::Creating, self.activation_polls)
        };
        state.tables.insert(
            descriptor.table_name.clone(),
            Table {
                descriptor: descriptor.clone(),
                status,
                pending_polls,
                items: BTreeMap::new(),
            },
        );
        tracing::debug!(table = %descriptor.table_name, "Created in-memory table");
        Ok(())
    }

    async fn describe_table(&self, table: &str) -> StoreResult<TableStatus> {
        let mut state = self.state.write().await;
        state.record_call(StoreOperation::DescribeTable)?;

        let Some(entry) = state.tables.get_mut(table) else {
            return Ok(TableStatus::Absent);
        };
        if entry.status == TableStatus::Creating {
            if entry.pending_polls == 0 {
                entry.status = TableStatus::Active;
            } else {
                entry.pending_polls -= 1;
            }
        }
        Ok(entry.status)
    }

    async fn delete_table(&self, table: &str) -> StoreResult<()> {
        let op = StoreOperation::DeleteTable;
        let mut state = self.state.write().await;
        state.record_call(op)?;

        match state.tables.remove(table) {
            Some(_) => Ok(()),
            None => Err(missing_table(op, table)),
        }
    }

    async fn get_item(&self, table: &str, key: &Item) -> StoreResult<Option<Item>> {
        let op = StoreOperation::GetItem;
        let mut state = self.state.write().await;
        state.record_call(op)?;

        let table = state.active_table(op, table)?;
        let encoded = validate_key(op, &table.descriptor, key)?;
        Ok(table.items.get(&encoded).cloned())
    }

    async fn put_item(
        &self,
        table: &str,
        item: &Item,
        condition: Option<&Condition>,
    ) -> StoreResult<()> {
        let op = StoreOperation::PutItem;
        let mut state = self.state.write().await;
        state.record_call(op)?;

        let table = state.active_table_mut(op, table)?;
        let encoded = encode_key(op, &table.descriptor, item)?;
        check_condition(op, condition, table.items.get(&encoded))?;
        table.items.insert(encoded, item.clone());
        Ok(())
    }

    async fn update_item(
        &self,
        table: &str,
        key: &Item,
        update: &UpdateSpec,
    ) -> StoreResult<Option<Item>> {
        let op = StoreOperation::UpdateItem;
        let mut state = self.state.write().await;
        state.record_call(op)?;

        let table = state.active_table_mut(op, table)?;
        let encoded = validate_key(op, &table.descriptor, key)?;

        if let Some(action) = update
            .actions
            .iter()
            .find(|a| table.descriptor.key_names().any(|k| k == a.attribute()))
        {
            return Err(StoreError::new(
                op,
                ErrorCode::Validation,
                format!("Cannot update key attribute '{}'", action.attribute()),
            ));
        }

        let current = table.items.get(&encoded).cloned();
        check_condition(op, update.condition.as_ref(), current.as_ref())?;

        let mut updated = current.clone().unwrap_or_else(|| key.clone());
        update
            .apply_to(&mut updated)
            .map_err(|message| StoreError::new(op, ErrorCode::Validation, message))?;
        table.items.insert(encoded, updated.clone());

        let touched: Vec<&str> = update.actions.iter().map(|a| a.attribute()).collect();
        Ok(match update.return_values {
            ReturnValues::None => None,
            ReturnValues::AllOld => current,
            ReturnValues::AllNew => Some(updated),
            ReturnValues::UpdatedOld => current.map(|old| project(&old, &touched)),
            ReturnValues::UpdatedNew => Some(project(&updated, &touched)),
        })
    }

    async fn scan(
        &self,
        table: &str,
        page_size: usize,
        cursor: Option<&Item>,
    ) -> StoreResult<ScanPage> {
        let op = StoreOperation::Scan;
        let mut state = self.state.write().await;
        state.record_call(op)?;

        if page_size == 0 {
            return Err(StoreError::new(op, ErrorCode::Validation, "Scan limit must be positive"));
        }
        let table = state.active_table(op, table)?;
        let start = match cursor {
            Some(cursor) => Bound::Excluded(validate_key(op, &table.descriptor, cursor)?),
            None => Bound::Unbounded,
        };

        let mut remaining = table.items.range((start, Bound::Unbounded));
        let items: Vec<Item> = remaining
            .by_ref()
            .take(page_size)
            .map(|(_, item)| item.clone())
            .collect();
        let next_cursor = match (remaining.next(), items.last()) {
            (Some(_), Some(last)) => table.descriptor.key_of(last),
            _ => None,
        };

        Ok(ScanPage { items, next_cursor })
    }

    async fn batch_delete(&self, table: &str, keys: &[Item]) -> StoreResult<()> {
        let op = StoreOperation::BatchDelete;
        let mut state = self.state.write().await;
        state.record_call(op)?;

        if keys.is_empty() || keys.len() > MAX_BATCH_DELETE_ITEMS {
            return Err(StoreError::new(
                op,
                ErrorCode::Validation,
                format!(
                    "Batch must contain between 1 and {MAX_BATCH_DELETE_ITEMS} keys, got {}",
                    keys.len()
                ),
            ));
        }
        let table = state.active_table_mut(op, table)?;
        let encoded = keys
            .iter()
            .map(|key| validate_key(op, &table.descriptor, key))
            .collect::<StoreResult<Vec<_>>>()?;
        for key in encoded {
            table.items.remove(&key);
        }
        Ok(())
    }
}
