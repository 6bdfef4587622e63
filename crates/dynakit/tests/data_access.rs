//! End-to-end behaviour of the client and table manager against the
//! in-memory store.

use std::sync::Arc;
use std::time::Duration;

use dynakit::dynakit_core::backoff::BackoffConfig;
use dynakit::dynakit_core::diagnostics::NoopDiagnostics;
use dynakit::dynakit_core::lifecycle::LifecycleConfig;
use dynakit::dynakit_core::schema::SchemaCache;
use dynakit::dynakit_core::store::{
    AttributeValue, ErrorCode, Item, KeyAttribute, ReturnValues, Store, StoreError,
    StoreOperation, TableDescriptor, TableStatus, UpdateSpec,
};
use dynakit::storage::InMemoryStore;
use dynakit::{record, Deadline, Error, Lookup, ResilientClient, TableManager, TracingDiagnostics};

#[derive(Debug, Default, Clone, PartialEq)]
struct TestObject {
    id: String,
    sort_key: String,
    data: String,
    count: i64,
    price: f64,
}

record!(TestObject {
    id: String => r#"json:"id""#,
    sort_key: String => r#"json:"sort_key""#,
    data: String => r#"json:"data""#,
    count: i64 => r#"json:"count""#,
    price: f64 => r#"json:"price""#,
});

#[derive(Debug, Default)]
struct TestKey {
    id: String,
    sort_key: String,
}

record!(TestKey {
    id: String => r#"json:"id""#,
    sort_key: String => r#"json:"sort_key""#,
});

#[derive(Debug, Default)]
struct BadlyTagged {
    id: String,
}

record!(BadlyTagged {
    id: String => "json:id",
});

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn table_name() -> String {
    format!("TEST_TABLE_{}", uuid::Uuid::new_v4().simple())
}

fn descriptor(name: &str) -> TableDescriptor {
    TableDescriptor::new(name, KeyAttribute::string("id"))
        .with_sort_key(KeyAttribute::string("sort_key"))
        .with_provisioned_throughput(1, 1)
}

fn backoff() -> BackoffConfig {
    BackoffConfig::new(
        Duration::from_millis(1),
        Duration::from_millis(5),
        Duration::from_millis(10),
    )
    .unwrap()
}

fn lifecycle_config() -> LifecycleConfig {
    LifecycleConfig::new(Duration::from_secs(1), Duration::from_secs(30)).unwrap()
}

fn client(store: &InMemoryStore, cache: Arc<SchemaCache>) -> ResilientClient {
    ResilientClient::new(
        Arc::new(store.clone()),
        cache,
        backoff(),
        Arc::new(TracingDiagnostics::new("test", "data_access")),
    )
}

fn key_item(i: usize) -> Item {
    Item::from([
        ("id".to_string(), AttributeValue::from(format!("id-{i:02}"))),
        ("sort_key".to_string(), AttributeValue::from("s")),
    ])
}

async fn seed_items(store: &InMemoryStore, table: &str, n: usize) {
    for i in 0..n {
        let mut item = key_item(i);
        item.insert("data".to_string(), AttributeValue::from("payload"));
        store.put_item(table, &item, None).await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_put_then_get_round_trips_scalar_fields() {
    init_tracing();
    let store = InMemoryStore::new();
    let table = table_name();
    TableManager::new(Arc::new(store.clone()), lifecycle_config())
        .ensure_exists(&descriptor(&table), &Deadline::none())
        .await
        .unwrap();

    let cache = Arc::new(SchemaCache::new());
    let client = client(&store, Arc::clone(&cache));
    let written = TestObject {
        id: "test_id".to_string(),
        sort_key: "test|sort|key".to_string(),
        data: "test".to_string(),
        count: -42,
        price: 19.75,
    };
    let key = TestKey {
        id: "test_id".to_string(),
        sort_key: "test|sort|key".to_string(),
    };

    client
        .put_item(&table, &written, &Deadline::none())
        .await
        .unwrap();
    let mut read = TestObject::default();
    let lookup = client
        .get_item_into(&table, &key, &mut read, &Deadline::none())
        .await
        .unwrap();

    assert_eq!(lookup, Lookup::Found);
    assert_eq!(read, written);

    // A second round trip reuses the cached schemas.
    let again: Option<TestObject> = client
        .get_item(&table, &key, &Deadline::none())
        .await
        .unwrap();
    assert_eq!(again, Some(written));
    assert_eq!(cache.computations(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_update_returns_all_new() {
    let store = InMemoryStore::new();
    let table = table_name();
    store.seed_table(descriptor(&table)).await;
    let client = client(&store, Arc::new(SchemaCache::new()));
    client
        .put_item(
            &table,
            &TestObject {
                id: "test_id".to_string(),
                sort_key: "test|sort|key".to_string(),
                data: "test".to_string(),
                ..Default::default()
            },
            &Deadline::none(),
        )
        .await
        .unwrap();

    let updated: Option<TestObject> = client
        .update_item(
            &table,
            &TestKey {
                id: "test_id".to_string(),
                sort_key: "test|sort|key".to_string(),
            },
            UpdateSpec::new()
                .set("data", "test2")
                .return_values(ReturnValues::AllNew),
            &Deadline::none(),
        )
        .await
        .unwrap();

    let updated = updated.unwrap();
    assert_eq!(updated.id, "test_id");
    assert_eq!(updated.sort_key, "test|sort|key");
    assert_eq!(updated.data, "test2");
}

#[tokio::test(start_paused = true)]
async fn test_put_to_missing_table_fails_once() {
    let store = InMemoryStore::new();
    let client = client(&store, Arc::new(SchemaCache::new()));

    let err = client
        .put_item("FAKE_TABLE", &TestObject::default(), &Deadline::none())
        .await
        .unwrap_err();

    assert_eq!(err.store_code(), Some(ErrorCode::ResourceNotFound));
    assert_eq!(store.calls(StoreOperation::PutItem).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_throttling_exhausts_budget() {
    let store = InMemoryStore::new();
    let table = table_name();
    store.seed_table(descriptor(&table)).await;
    for _ in 0..100 {
        store
            .fail_next(
                StoreOperation::GetItem,
                StoreError::new(StoreOperation::GetItem, ErrorCode::Throttled, "slow down"),
            )
            .await;
    }
    let client = client(&store, Arc::new(SchemaCache::new()));

    let err = client
        .get_item::<_, TestObject>(&table, &TestKey::default(), &Deadline::none())
        .await
        .unwrap_err();

    match err {
        Error::RetryBudgetExhausted { attempts, last, .. } => {
            assert!(attempts > 1);
            assert_eq!(last.code, ErrorCode::Throttled);
        }
        other => panic!("expected RetryBudgetExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_tag_fails_before_store_call() {
    let store = InMemoryStore::new();
    let table = table_name();
    store.seed_table(descriptor(&table)).await;
    let cache = Arc::new(SchemaCache::new());
    let client = ResilientClient::new(
        Arc::new(store.clone()),
        Arc::clone(&cache),
        backoff(),
        Arc::new(NoopDiagnostics),
    );

    let err = client
        .put_item(&table, &BadlyTagged::default(), &Deadline::none())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedSchemaTag(_)));
    assert_eq!(store.calls(StoreOperation::PutItem).await, 0);
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_ensure_exists_creates_once() {
    init_tracing();
    let store = InMemoryStore::new().with_activation_polls(2);
    let manager = TableManager::new(Arc::new(store.clone()), lifecycle_config());
    let table = table_name();
    let descriptor = descriptor(&table);

    let deadline = Deadline::none();
    let (first, second) = tokio::join!(
        manager.ensure_exists(&descriptor, &deadline),
        manager.ensure_exists(&descriptor, &deadline),
    );

    first.unwrap();
    second.unwrap();
    assert_eq!(store.calls(StoreOperation::CreateTable).await, 1);
    assert_eq!(store.describe_table(&table).await.unwrap(), TableStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_ensure_exists_from_spawned_tasks() {
    let store = InMemoryStore::new().with_activation_polls(3);
    let manager = Arc::new(TableManager::new(Arc::new(store.clone()), lifecycle_config()));
    let table = table_name();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let descriptor = descriptor(&table);
            tokio::spawn(async move { manager.ensure_exists(&descriptor, &Deadline::none()).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.calls(StoreOperation::CreateTable).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_removes_every_item() {
    let store = InMemoryStore::new();
    let table = table_name();
    store.seed_table(descriptor(&table)).await;
    seed_items(&store, &table, 60).await;
    let manager = TableManager::new(
        Arc::new(store.clone()),
        lifecycle_config().with_scan_page_size(40).unwrap(),
    );

    let report = manager
        .empty(&descriptor(&table), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(report.deleted, 60);
    assert_eq!(report.pages, 2);
    assert_eq!(store.item_count(&table).await, 0);
    // 40 keys split into 25 + 15, then 20.
    assert_eq!(store.calls(StoreOperation::BatchDelete).await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_empty_failure_on_third_page_is_resumable() {
    init_tracing();
    let store = InMemoryStore::new();
    let table = table_name();
    store.seed_table(descriptor(&table)).await;
    seed_items(&store, &table, 10).await;
    store
        .fail_on_call(
            StoreOperation::BatchDelete,
            3,
            StoreError::new(StoreOperation::BatchDelete, ErrorCode::AccessDenied, "denied"),
        )
        .await;
    let manager = TableManager::new(
        Arc::new(store.clone()),
        lifecycle_config().with_scan_page_size(3).unwrap(),
    );

    let err = manager
        .empty(&descriptor(&table), &Deadline::none())
        .await
        .unwrap_err();

    let partial = match err {
        Error::PartialEmpty(partial) => partial,
        other => panic!("expected PartialEmpty, got {other:?}"),
    };
    assert_eq!(partial.deleted, 6);
    assert_eq!(partial.undeleted, 3);
    assert_eq!(partial.source.code, ErrorCode::AccessDenied);
    assert_eq!(partial.cursor, Some(key_item(5)));
    assert_eq!(store.item_count(&table).await, 4);

    let resumed = manager
        .resume_empty(&descriptor(&table), partial.cursor.clone(), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(resumed.deleted, 4);
    assert_eq!(store.item_count(&table).await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_retries_transient_batch_failures() {
    let store = InMemoryStore::new();
    let table = table_name();
    store.seed_table(descriptor(&table)).await;
    seed_items(&store, &table, 10).await;
    store
        .fail_on_call(
            StoreOperation::BatchDelete,
            2,
            StoreError::new(StoreOperation::BatchDelete, ErrorCode::Throttled, "slow"),
        )
        .await;
    let manager = TableManager::new(
        Arc::new(store.clone()),
        lifecycle_config().with_scan_page_size(3).unwrap(),
    )
    .with_backoff(backoff());

    let report = manager
        .empty(&descriptor(&table), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(report.deleted, 10);
    assert_eq!(report.pages, 4);
    assert_eq!(store.item_count(&table).await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_drop_then_recreate() {
    let store = InMemoryStore::new().with_activation_polls(0);
    let manager = TableManager::new(Arc::new(store.clone()), lifecycle_config());
    let table = table_name();

    manager
        .ensure_exists(&descriptor(&table), &Deadline::none())
        .await
        .unwrap();
    assert!(manager
        .delete_if_exists(&table, &Deadline::none())
        .await
        .unwrap());
    manager
        .ensure_exists(&descriptor(&table), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(store.calls(StoreOperation::CreateTable).await, 2);
    assert_eq!(store.describe_table(&table).await.unwrap(), TableStatus::Active);
}
