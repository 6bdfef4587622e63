//! Table lifecycle operations (Imperative Shell).
//!
//! Decisions come from the pure planner in `dynakit_core::lifecycle`; this
//! module performs the store calls, the polling and the batching.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use dynakit_core::backoff::BackoffConfig;
use dynakit_core::lifecycle::{
    delete_batches, plan_ensure, EmptyReport, EnsurePlan, LifecycleConfig, LifecycleError,
    PartialEmptyError,
};
use dynakit_core::store::{
    ErrorCode, Item, Store, StoreError, StoreOperation, TableDescriptor, TableStatus,
};
use tokio::time::Instant;

use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::retry::RetryExecutor;

/// Idempotent create-and-wait, empty and drop of tables.
///
/// Concurrent `ensure_exists` calls for the same table through one manager
/// are serialized, so at most one create is issued. `empty` must not run
/// concurrently with writers to the same table.
pub struct TableManager {
    store: Arc<dyn Store>,
    config: LifecycleConfig,
    executor: RetryExecutor,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Holds a table's ensure lock; the map entry is dropped with the last holder.
struct TableLease<'a> {
    in_flight: &'a Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    table: &'a str,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for TableLease<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map plus this lease.
        if Arc::strong_count(&self.lock) == 2 {
            in_flight.remove(self.table);
        }
    }
}

impl fmt::Debug for TableManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableManager")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl TableManager {
    pub fn new(store: Arc<dyn Store>, config: LifecycleConfig) -> Self {
        Self {
            store,
            config,
            executor: RetryExecutor::default(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Retries individual store calls with `backoff` instead of the default.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.executor = RetryExecutor::new(backoff);
        self
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Creates the table if it is absent and waits until it is active.
    ///
    /// A table that is already being created is only waited on. A table in
    /// the `Failed` state yields [`LifecycleError::Failed`]; exceeding the
    /// configured timeout yields [`LifecycleError::Timeout`].
    pub async fn ensure_exists(&self, descriptor: &TableDescriptor, deadline: &Deadline) -> Result<()> {
        let table = descriptor.table_name.as_str();
        let lease = self.table_lock(table);
        let _guard = deadline
            .run(lease.lock.lock())
            .await
            .map_err(|_| Error::DeadlineExceeded {
                operation: StoreOperation::DescribeTable,
            })?;

        let started = Instant::now();
        let mut create_issued = false;
        let mut last_status = TableStatus::Absent;

        loop {
            match self.describe(table, deadline).await? {
                Ok(status) => {
                    last_status = status;
                    match plan_ensure(status, create_issued) {
                        EnsurePlan::Ready => {
                            tracing::debug!(table, "Table is active");
                            return Ok(());
                        }
                        EnsurePlan::Failed => {
                            tracing::error!(table, "Table entered the FAILED state");
                            return Err(LifecycleError::Failed {
                                table: table.to_string(),
                            }
                            .into());
                        }
                        EnsurePlan::Create => {
                            self.create(descriptor, deadline).await?;
                            create_issued = true;
                            continue;
                        }
                        EnsurePlan::AwaitActive | EnsurePlan::AwaitDeletion => {
                            tracing::debug!(table, status = ?status, "Waiting for table");
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(table, error = %err, "Transient error polling table status");
                }
            }

            let waited = started.elapsed();
            if waited >= self.config.timeout() {
                tracing::error!(table, waited_ms = waited.as_millis() as u64, "Timed out waiting for table");
                return Err(LifecycleError::Timeout {
                    table: table.to_string(),
                    waited,
                    last_status,
                }
                .into());
            }
            deadline
                .sleep(self.config.poll_interval())
                .await
                .map_err(|_| Error::DeadlineExceeded {
                    operation: StoreOperation::DescribeTable,
                })?;
        }
    }

    /// Deletes every item in the table.
    ///
    /// On a failed scan or batch delete the returned
    /// [`PartialEmptyError`] carries the cursor to pass to
    /// [`resume_empty`](Self::resume_empty).
    pub async fn empty(&self, descriptor: &TableDescriptor, deadline: &Deadline) -> Result<EmptyReport> {
        self.resume_empty(descriptor, None, deadline).await
    }

    /// Deletes every item after `cursor`; `None` starts from the beginning.
    pub async fn resume_empty(
        &self,
        descriptor: &TableDescriptor,
        cursor: Option<Item>,
        deadline: &Deadline,
    ) -> Result<EmptyReport> {
        let table = descriptor.table_name.as_str();
        let store = self.store.as_ref();
        let page_size = self.config.scan_page_size();
        let mut report = EmptyReport::default();
        let mut cursor = cursor;

        loop {
            let start = cursor.as_ref();
            let scanned = self
                .executor
                .execute(StoreOperation::Scan, deadline, move || {
                    store.scan(table, page_size, start)
                })
                .await;
            let page = match scanned {
                Ok(page) => page,
                Err(err) => return Err(partial_empty(table, report.deleted, 0, cursor, err)),
            };
            report.pages += 1;

            let keys = match page
                .items
                .iter()
                .map(|item| {
                    descriptor.key_of(item).ok_or_else(|| {
                        StoreError::new(
                            StoreOperation::Scan,
                            ErrorCode::Validation,
                            format!("Scanned item in '{table}' lacks key attributes"),
                        )
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()
            {
                Ok(keys) => keys,
                Err(err) => {
                    let undeleted = page.items.len();
                    return Err(partial_empty(table, report.deleted, undeleted, cursor, err.into()));
                }
            };

            let mut confirmed = 0;
            for batch in delete_batches(&keys, self.config.delete_batch_limit()) {
                let deleted = self
                    .executor
                    .execute(StoreOperation::BatchDelete, deadline, move || {
                        store.batch_delete(table, batch)
                    })
                    .await;
                if let Err(err) = deleted {
                    let undeleted = keys.len() - confirmed;
                    tracing::warn!(table, deleted = report.deleted + confirmed, undeleted, "Empty stopped partway through");
                    return Err(partial_empty(
                        table,
                        report.deleted + confirmed,
                        undeleted,
                        cursor,
                        err,
                    ));
                }
                confirmed += batch.len();
            }
            report.deleted += confirmed;
            tracing::debug!(table, page = report.pages, deleted = confirmed, "Emptied scan page");

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::info!(table, deleted = report.deleted, pages = report.pages, "Table emptied");
        Ok(report)
    }

    /// Drops the table and waits until it is gone.
    ///
    /// Returns `false` when there was nothing to drop.
    pub async fn delete_if_exists(&self, table: &str, deadline: &Deadline) -> Result<bool> {
        let store = self.store.as_ref();
        let dropped = self
            .executor
            .execute(StoreOperation::DeleteTable, deadline, move || {
                store.delete_table(table)
            })
            .await;
        match dropped {
            Ok(()) => {}
            Err(err) if err.store_code() == Some(ErrorCode::ResourceNotFound) => {
                tracing::debug!(table, "Table already absent");
                return Ok(false);
            }
            Err(err) => return Err(err),
        }

        let started = Instant::now();
        loop {
            let status = match self.describe(table, deadline).await? {
                Ok(TableStatus::Absent) => {
                    tracing::info!(table, "Table deleted");
                    return Ok(true);
                }
                Ok(status) => status,
                Err(err) => {
                    tracing::warn!(table, error = %err, "Transient error polling table status");
                    TableStatus::Deleting
                }
            };

            let waited = started.elapsed();
            if waited >= self.config.timeout() {
                return Err(LifecycleError::Timeout {
                    table: table.to_string(),
                    waited,
                    last_status: status,
                }
                .into());
            }
            deadline
                .sleep(self.config.poll_interval())
                .await
                .map_err(|_| Error::DeadlineExceeded {
                    operation: StoreOperation::DescribeTable,
                })?;
        }
    }

    /// One describe call under the deadline.
    ///
    /// The outer result carries fatal errors; the inner one a transient error
    /// the caller may poll through.
    async fn describe(
        &self,
        table: &str,
        deadline: &Deadline,
    ) -> Result<std::result::Result<TableStatus, StoreError>> {
        let described = deadline
            .run(self.store.describe_table(table))
            .await
            .map_err(|_| Error::DeadlineExceeded {
                operation: StoreOperation::DescribeTable,
            })?;
        match described {
            Ok(status) => Ok(Ok(status)),
            Err(err) if err.is_transient() => Ok(Err(err)),
            Err(err) => Err(Error::Store(err)),
        }
    }

    async fn create(&self, descriptor: &TableDescriptor, deadline: &Deadline) -> Result<()> {
        let store = self.store.as_ref();
        let created = self
            .executor
            .execute(StoreOperation::CreateTable, deadline, move || {
                store.create_table(descriptor)
            })
            .await;
        match created {
            Ok(()) => {
                tracing::info!(table = %descriptor.table_name, "Created table");
                Ok(())
            }
            Err(err) if err.store_code() == Some(ErrorCode::Conflict) => {
                tracing::debug!(table = %descriptor.table_name, "Table created concurrently");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn table_lock<'a>(&'a self, table: &'a str) -> TableLease<'a> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let lock = Arc::clone(in_flight.entry(table.to_string()).or_default());
        TableLease {
            in_flight: &self.in_flight,
            table,
            lock,
        }
    }
}

/// Wraps a store failure during an empty into a resumable error.
fn partial_empty(
    table: &str,
    deleted: usize,
    undeleted: usize,
    cursor: Option<Item>,
    err: Error,
) -> Error {
    match err {
        Error::Store(source) | Error::RetryBudgetExhausted { last: source, .. } => {
            PartialEmptyError {
                table: table.to_string(),
                deleted,
                undeleted,
                cursor,
                source,
            }
            .into()
        }
        other => other,
    }
}
