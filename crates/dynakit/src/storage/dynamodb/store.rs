//! DynamoDB store implementation.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode as SdkBillingMode, DeleteRequest, KeySchemaElement, KeyType,
    ProvisionedThroughput, ReturnValue, ScalarAttributeType, TableClass as SdkTableClass,
    TableStatus as SdkTableStatus, WriteRequest,
};
use aws_sdk_dynamodb::Client;

use dynakit_core::store::{
    BillingMode, Condition, ErrorCode, Item, KeyAttribute, ReturnValues, ScalarType, ScanPage,
    Store, StoreError, StoreOperation, StoreResult, TableClass, TableDescriptor, TableStatus,
    UpdateSpec,
};

use super::conversions::{from_sdk_item, to_sdk_item, SdkItem};
use super::error::{build_error, classify};
use super::expressions::ExpressionBuilder;

/// AWS client configuration.
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// Custom endpoint URL (for local DynamoDB).
    pub endpoint_url: Option<String>,
    /// AWS region.
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        }
    }
}

impl AwsConfig {
    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({})", url),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }

    /// Builds an SDK client for this configuration.
    pub async fn connect(&self) -> Client {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(self.region.clone()));
        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        Client::new(&loader.load().await)
    }
}

/// [`Store`] backed by Amazon DynamoDB.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
}

impl DynamoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects using `AWS_ENDPOINT_URL` and `AWS_REGION` plus the default
    /// credential chain.
    pub async fn from_env() -> Self {
        let config = AwsConfig::default();
        tracing::debug!(target_env = %config.target_display(), "Connecting to DynamoDB");
        Self::new(config.connect().await)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn scalar_type(attribute_type: ScalarType) -> ScalarAttributeType {
    match attribute_type {
        ScalarType::String => ScalarAttributeType::S,
        ScalarType::Number => ScalarAttributeType::N,
        ScalarType::Binary => ScalarAttributeType::B,
    }
}

fn key_element(attribute: &KeyAttribute, key_type: KeyType) -> StoreResult<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(&attribute.name)
        .key_type(key_type)
        .build()
        .map_err(|e| build_error(StoreOperation::CreateTable, e))
}

fn attribute_definition(attribute: &KeyAttribute) -> StoreResult<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(&attribute.name)
        .attribute_type(scalar_type(attribute.attribute_type))
        .build()
        .map_err(|e| build_error(StoreOperation::CreateTable, e))
}

fn table_status(status: Option<&SdkTableStatus>) -> TableStatus {
    match status {
        Some(SdkTableStatus::Active) => TableStatus::Active,
        Some(SdkTableStatus::Creating) => TableStatus::Creating,
        Some(SdkTableStatus::Updating) => TableStatus::Updating,
        Some(SdkTableStatus::Deleting) => TableStatus::Deleting,
        Some(SdkTableStatus::InaccessibleEncryptionCredentials)
        | Some(SdkTableStatus::Archiving)
        | Some(SdkTableStatus::Archived) => TableStatus::Failed,
        Some(_) | None => TableStatus::Creating,
    }
}

fn return_value(return_values: ReturnValues) -> ReturnValue {
    match return_values {
        ReturnValues::None => ReturnValue::None,
        ReturnValues::AllOld => ReturnValue::AllOld,
        ReturnValues::AllNew => ReturnValue::AllNew,
        ReturnValues::UpdatedOld => ReturnValue::UpdatedOld,
        ReturnValues::UpdatedNew => ReturnValue::UpdatedNew,
    }
}

fn decode(operation: StoreOperation, item: &SdkItem) -> StoreResult<Item> {
    from_sdk_item(item).map_err(|message| StoreError::new(operation, ErrorCode::Validation, message))
}

#[async_trait]
impl Store for DynamoDbStore {
    async fn create_table(&self, descriptor: &TableDescriptor) -> StoreResult<()> {
        let mut key_schema = vec![key_element(&descriptor.partition_key, KeyType::Hash)?];
        let mut attribute_definitions = vec![attribute_definition(&descriptor.partition_key)?];
        if let Some(sort_key) = &descriptor.sort_key {
            key_schema.push(key_element(sort_key, KeyType::Range)?);
            attribute_definitions.push(attribute_definition(sort_key)?);
        }

        let mut request = self
            .client
            .create_table()
            .table_name(&descriptor.table_name)
            .set_key_schema(Some(key_schema))
            .set_attribute_definitions(Some(attribute_definitions))
            .table_class(match descriptor.table_class {
                TableClass::Standard => SdkTableClass::Standard,
                TableClass::StandardInfrequentAccess => SdkTableClass::StandardInfrequentAccess,
            });

        request = match descriptor.billing_mode {
            BillingMode::PayPerRequest => request.billing_mode(SdkBillingMode::PayPerRequest),
            BillingMode::Provisioned {
                read_capacity_units,
                write_capacity_units,
            } => request
                .billing_mode(SdkBillingMode::Provisioned)
                .provisioned_throughput(
                    ProvisionedThroughput::builder()
                        .read_capacity_units(read_capacity_units)
                        .write_capacity_units(write_capacity_units)
                        .build()
                        .map_err(|e| build_error(StoreOperation::CreateTable, e))?,
                ),
        };

        request
            .send()
            .await
            .map_err(|e| classify(StoreOperation::CreateTable, e))?;
        Ok(())
    }

    async fn describe_table(&self, table: &str) -> StoreResult<TableStatus> {
        match self.client.describe_table().table_name(table).send().await {
            Ok(output) => Ok(table_status(
                output.table().and_then(|t| t.table_status()),
            )),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(TableStatus::Absent)
            }
            Err(err) => Err(classify(StoreOperation::DescribeTable, err)),
        }
    }

    async fn delete_table(&self, table: &str) -> StoreResult<()> {
        self.client
            .delete_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| classify(StoreOperation::DeleteTable, e))?;
        Ok(())
    }

    async fn get_item(&self, table: &str, key: &Item) -> StoreResult<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(to_sdk_item(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| classify(StoreOperation::GetItem, e))?;

        output
            .item
            .as_ref()
            .map(|item| decode(StoreOperation::GetItem, item))
            .transpose()
    }

    async fn put_item(
        &self,
        table: &str,
        item: &Item,
        condition: Option<&Condition>,
    ) -> StoreResult<()> {
        let mut builder = ExpressionBuilder::new();
        let condition_expression = condition.and_then(|c| builder.condition(c));
        let (names, values) = builder.into_parts();

        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_sdk_item(item)))
            .set_condition_expression(condition_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values.map(|v| to_sdk_item(&v)))
            .send()
            .await
            .map_err(|e| classify(StoreOperation::PutItem, e))?;
        Ok(())
    }

    async fn update_item(
        &self,
        table: &str,
        key: &Item,
        update: &UpdateSpec,
    ) -> StoreResult<Option<Item>> {
        let mut builder = ExpressionBuilder::new();
        let update_expression = builder.update(update);
        let condition_expression = update.condition.as_ref().and_then(|c| builder.condition(c));
        let (names, values) = builder.into_parts();

        let output = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(to_sdk_item(key)))
            .set_update_expression(update_expression)
            .set_condition_expression(condition_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values.map(|v| to_sdk_item(&v)))
            .return_values(return_value(update.return_values))
            .send()
            .await
            .map_err(|e| classify(StoreOperation::UpdateItem, e))?;

        if update.return_values == ReturnValues::None {
            return Ok(None);
        }
        output
            .attributes
            .as_ref()
            .map(|item| decode(StoreOperation::UpdateItem, item))
            .transpose()
    }

    async fn scan(
        &self,
        table: &str,
        page_size: usize,
        cursor: Option<&Item>,
    ) -> StoreResult<ScanPage> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .limit(i32::try_from(page_size).unwrap_or(i32::MAX))
            .set_exclusive_start_key(cursor.map(to_sdk_item))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| classify(StoreOperation::Scan, e))?;

        let items = output
            .items
            .unwrap_or_default()
            .iter()
            .map(|item| decode(StoreOperation::Scan, item))
            .collect::<StoreResult<Vec<_>>>()?;
        let next_cursor = output
            .last_evaluated_key
            .filter(|key| !key.is_empty())
            .map(|key| decode(StoreOperation::Scan, &key))
            .transpose()?;

        Ok(ScanPage { items, next_cursor })
    }

    async fn batch_delete(&self, table: &str, keys: &[Item]) -> StoreResult<()> {
        let requests = keys
            .iter()
            .map(|key| {
                let delete = DeleteRequest::builder()
                    .set_key(Some(to_sdk_item(key)))
                    .build()
                    .map_err(|e| build_error(StoreOperation::BatchDelete, e))?;
                Ok(WriteRequest::builder().delete_request(delete).build())
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await
            .map_err(|e| classify(StoreOperation::BatchDelete, e))?;

        let unprocessed = output
            .unprocessed_items
            .as_ref()
            .and_then(|items| items.get(table))
            .map_or(0, Vec::len);
        if unprocessed > 0 {
            // Deletes are idempotent, so the whole batch can be retried.
            return Err(StoreError::new(
                StoreOperation::BatchDelete,
                ErrorCode::Throttled,
                format!("{unprocessed} of {} keys were not processed", keys.len()),
            ));
        }
        Ok(())
    }
}
