//! Typed, retrying access to store items.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use dynakit_core::backoff::BackoffConfig;
use dynakit_core::diagnostics::Diagnostics;
use dynakit_core::marshal::{marshal, marshal_key, unmarshal_into};
use dynakit_core::schema::{Record, SchemaCache};
use dynakit_core::store::{Condition, Item, Store, StoreOperation, UpdateSpec};

use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::retry::RetryExecutor;

/// Tag namespace used to name attributes unless overridden.
pub const DEFAULT_TAG_NAMESPACE: &str = "json";

/// Outcome of a lookup that found nothing is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found,
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found)
    }
}

/// Options for a conditional put.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutOptions {
    pub condition: Option<Condition>,
}

impl PutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Only write when no item with the same key exists yet.
    pub fn if_not_exists(attribute: impl Into<String>) -> Self {
        Self::new().condition(Condition::AttributeNotExists(attribute.into()))
    }
}

/// Get, put and update of [`Record`] values against a [`Store`].
///
/// Values are marshaled through a shared [`SchemaCache`] and every store call
/// runs under a [`RetryExecutor`]. Failures are reported to the diagnostics
/// sink and then returned unchanged.
#[derive(Clone)]
pub struct ResilientClient {
    store: Arc<dyn Store>,
    cache: Arc<SchemaCache>,
    executor: RetryExecutor,
    diagnostics: Arc<dyn Diagnostics>,
    namespace: String,
}

impl fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClient")
            .field("executor", &self.executor)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ResilientClient {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<SchemaCache>,
        backoff: BackoffConfig,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            store,
            cache,
            executor: RetryExecutor::new(backoff),
            diagnostics,
            namespace: DEFAULT_TAG_NAMESPACE.to_string(),
        }
    }

    /// Names attributes from tags of `namespace` instead of `json`.
    pub fn with_tag_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn schema_cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    pub fn tag_namespace(&self) -> &str {
        &self.namespace
    }

    /// Reads the item addressed by `key`, or `None` when it does not exist.
    pub async fn get_item<K, T>(&self, table: &str, key: &K, deadline: &Deadline) -> Result<Option<T>>
    where
        K: Record,
        T: Record + Default,
    {
        let mut value = T::default();
        match self.get_item_into(table, key, &mut value, deadline).await? {
            Lookup::Found => Ok(Some(value)),
            Lookup::NotFound => Ok(None),
        }
    }

    /// Reads the item addressed by `key` into `out`.
    ///
    /// `out` is left untouched when the item does not exist. Attributes with
    /// no matching field are ignored.
    pub async fn get_item_into<K, T>(
        &self,
        table: &str,
        key: &K,
        out: &mut T,
        deadline: &Deadline,
    ) -> Result<Lookup>
    where
        K: Record,
        T: Record,
    {
        let key_item = marshal_key(&self.cache, &self.namespace, key)
            .map_err(|e| self.report(e.into(), "Failed to marshal key for GetItem"))?;

        let store = self.store.as_ref();
        let key_ref = &key_item;
        let fetched = self
            .executor
            .execute(StoreOperation::GetItem, deadline, move || {
                store.get_item(table, key_ref)
            })
            .await
            .map_err(|e| self.report(e, "GetItem failed"))?;

        let Some(item) = fetched else {
            self.diagnostics
                .log(&format!("GetItem on {table}: no item for the requested key"));
            return Ok(Lookup::NotFound);
        };

        unmarshal_into(&self.cache, &self.namespace, &item, out)
            .map_err(|e| self.report(e.into(), "Failed to unmarshal GetItem result"))?;
        Ok(Lookup::Found)
    }

    /// Writes `value`, replacing any item with the same key.
    pub async fn put_item<T: Record>(&self, table: &str, value: &T, deadline: &Deadline) -> Result<()> {
        self.put_item_with(table, value, PutOptions::default(), deadline)
            .await
    }

    /// Writes `value` if the options' condition holds for the stored item.
    pub async fn put_item_with<T: Record>(
        &self,
        table: &str,
        value: &T,
        options: PutOptions,
        deadline: &Deadline,
    ) -> Result<()> {
        let item = marshal(&self.cache, &self.namespace, value)
            .map_err(|e| self.report(e.into(), "Failed to marshal item for PutItem"))?;

        let store = self.store.as_ref();
        let item_ref = &item;
        let condition = options.condition.as_ref();
        self.executor
            .execute(StoreOperation::PutItem, deadline, move || {
                store.put_item(table, item_ref, condition)
            })
            .await
            .map_err(|e| self.report(e, "PutItem failed"))
    }

    /// Applies `update` to the item addressed by `key`.
    ///
    /// Returns the attributes selected by `update.return_values`, unmarshaled
    /// into a default `T`, or `None` when nothing was requested.
    pub async fn update_item<K, T>(
        &self,
        table: &str,
        key: &K,
        update: UpdateSpec,
        deadline: &Deadline,
    ) -> Result<Option<T>>
    where
        K: Record,
        T: Record + Default,
    {
        let key_item = marshal_key(&self.cache, &self.namespace, key)
            .map_err(|e| self.report(e.into(), "Failed to marshal key for UpdateItem"))?;

        let store = self.store.as_ref();
        let key_ref = &key_item;
        let update_ref = &update;
        let returned: Option<Item> = self
            .executor
            .execute(StoreOperation::UpdateItem, deadline, move || {
                store.update_item(table, key_ref, update_ref)
            })
            .await
            .map_err(|e| self.report(e, "UpdateItem failed"))?;

        match returned {
            Some(item) => {
                let mut value = T::default();
                unmarshal_into(&self.cache, &self.namespace, &item, &mut value)
                    .map_err(|e| self.report(e.into(), "Failed to unmarshal UpdateItem result"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    #[track_caller]
    fn report(&self, err: Error, message: &str) -> Error {
        self.diagnostics
            .report_error(&err, message, Location::caller());
        err
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use dynakit_core::diagnostics::{ErrorReport, NoopDiagnostics};
    use dynakit_core::record;
    use dynakit_core::store::{ErrorCode, KeyAttribute, ReturnValues, StoreError, TableDescriptor};

    use super::*;
    use crate::storage::InMemoryStore;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Widget {
        id: String,
        sort_key: String,
        label: String,
        count: i64,
    }

    record!(Widget {
        id: String => r#"json:"id""#,
        sort_key: String => r#"json:"sort_key""#,
        label: String => r#"json:"label,omitempty""#,
        count: i64 => r#"json:"count""#,
    });

    #[derive(Debug, Default)]
    struct WidgetKey {
        id: String,
        sort_key: String,
    }

    record!(WidgetKey {
        id: String => r#"json:"id""#,
        sort_key: String => r#"json:"sort_key""#,
    });

    #[derive(Default)]
    struct RecordingDiagnostics {
        reports: Mutex<Vec<ErrorReport>>,
        messages: Mutex<Vec<String>>,
    }

    impl Diagnostics for RecordingDiagnostics {
        fn log(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }

        fn report_error(
            &self,
            inner: &(dyn std::error::Error + 'static),
            message: &str,
            location: &'static Location<'static>,
        ) -> ErrorReport {
            let report = ErrorReport::new("test", "client", location, message, inner);
            self.reports.lock().unwrap().push(report.clone());
            report
        }
    }

    fn backoff() -> BackoffConfig {
        BackoffConfig::new(
            Duration::from_millis(1),
            Duration::from_millis(5),
            Duration::from_millis(10),
        )
        .unwrap()
    }

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .seed_table(
                TableDescriptor::new("widgets", KeyAttribute::string("id"))
                    .with_sort_key(KeyAttribute::string("sort_key")),
            )
            .await;
        store
    }

    fn key() -> WidgetKey {
        WidgetKey {
            id: "w1".to_string(),
            sort_key: "a".to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = seeded_store().await;
        let client = ResilientClient::new(
            Arc::new(store),
            Arc::new(SchemaCache::new()),
            backoff(),
            Arc::new(NoopDiagnostics),
        );
        let widget = Widget {
            id: "w1".to_string(),
            sort_key: "a".to_string(),
            label: "gear".to_string(),
            count: 3,
        };

        client
            .put_item("widgets", &widget, &Deadline::none())
            .await
            .unwrap();
        let loaded: Option<Widget> = client
            .get_item("widgets", &key(), &Deadline::none())
            .await
            .unwrap();

        assert_eq!(loaded, Some(widget));
        assert_eq!(client.schema_cache().len(), 2);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = seeded_store().await;
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let client = ResilientClient::new(
            Arc::new(store),
            Arc::new(SchemaCache::new()),
            backoff(),
            diagnostics.clone(),
        );

        let mut out = Widget {
            label: "unchanged".to_string(),
            ..Default::default()
        };
        let lookup = client
            .get_item_into("widgets", &key(), &mut out, &Deadline::none())
            .await
            .unwrap();

        assert_eq!(lookup, Lookup::NotFound);
        assert!(!lookup.is_found());
        assert_eq!(out.label, "unchanged");
        assert!(diagnostics.reports.lock().unwrap().is_empty());
        assert_eq!(diagnostics.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_failure_reported_and_returned() {
        let store = seeded_store().await;
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let client = ResilientClient::new(
            Arc::new(store),
            Arc::new(SchemaCache::new()),
            backoff(),
            diagnostics.clone(),
        );

        let err = client
            .put_item("missing", &Widget::default(), &Deadline::none())
            .await
            .unwrap_err();

        assert_eq!(err.store_code(), Some(ErrorCode::ResourceNotFound));
        let reports = diagnostics.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].message, "PutItem failed");
        assert!(reports[0].file.ends_with("client.rs"));
    }

    #[tokio::test]
    async fn test_put_condition_passes_through() {
        let store = seeded_store().await;
        let client = ResilientClient::new(
            Arc::new(store),
            Arc::new(SchemaCache::new()),
            backoff(),
            Arc::new(NoopDiagnostics),
        );
        let widget = Widget {
            id: "w1".to_string(),
            sort_key: "a".to_string(),
            ..Default::default()
        };

        let options = PutOptions::if_not_exists("id");
        client
            .put_item_with("widgets", &widget, options.clone(), &Deadline::none())
            .await
            .unwrap();
        let err = client
            .put_item_with("widgets", &widget, options, &Deadline::none())
            .await
            .unwrap_err();

        assert_eq!(err.store_code(), Some(ErrorCode::ConditionalCheckFailed));
    }

    #[tokio::test]
    async fn test_update_returns_new_values() {
        let store = seeded_store().await;
        let client = ResilientClient::new(
            Arc::new(store),
            Arc::new(SchemaCache::new()),
            backoff(),
            Arc::new(NoopDiagnostics),
        );

        let updated: Option<Widget> = client
            .update_item(
                "widgets",
                &key(),
                UpdateSpec::new()
                    .set("label", "bolt")
                    .add("count", 5_i64)
                    .return_values(ReturnValues::AllNew),
                &Deadline::none(),
            )
            .await
            .unwrap();

        let updated = updated.unwrap();
        assert_eq!(updated.id, "w1");
        assert_eq!(updated.label, "bolt");
        assert_eq!(updated.count, 5);

        let nothing: Option<Widget> = client
            .update_item(
                "widgets",
                &key(),
                UpdateSpec::new().add("count", 1_i64),
                &Deadline::none(),
            )
            .await
            .unwrap();
        assert_eq!(nothing, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried() {
        let store = seeded_store().await;
        store
            .fail_next(
                StoreOperation::GetItem,
                StoreError::new(StoreOperation::GetItem, ErrorCode::Throttled, "slow"),
            )
            .await;
        let client = ResilientClient::new(
            Arc::new(store.clone()),
            Arc::new(SchemaCache::new()),
            backoff(),
            Arc::new(NoopDiagnostics),
        );

        let loaded: Option<Widget> = client
            .get_item("widgets", &key(), &Deadline::none())
            .await
            .unwrap();

        assert_eq!(loaded, None);
        assert_eq!(store.calls(StoreOperation::GetItem).await, 2);
    }

    #[tokio::test]
    async fn test_custom_tag_namespace() {
        #[derive(Debug, Default)]
        struct Aliased {
            id: String,
            sort_key: String,
        }

        record!(Aliased {
            id: String => r#"json:"ignored" store:"id""#,
            sort_key: String => r#"json:"ignored_too" store:"sort_key""#,
        });

        let store = seeded_store().await;
        let client = ResilientClient::new(
            Arc::new(store.clone()),
            Arc::new(SchemaCache::new()),
            backoff(),
            Arc::new(NoopDiagnostics),
        )
        .with_tag_namespace("store");
        let value = Aliased {
            id: "x".to_string(),
            sort_key: "y".to_string(),
        };

        client
            .put_item("widgets", &value, &Deadline::none())
            .await
            .unwrap();
        assert_eq!(client.tag_namespace(), "store");
        assert_eq!(store.item_count("widgets").await, 1);
    }
}
