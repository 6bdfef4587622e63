//! DynamoDB storage backend.
//!
//! Implements [`Store`](dynakit_core::store::Store) on top of
//! `aws-sdk-dynamodb`. SDK errors are classified into store error codes here,
//! so nothing above this module sees SDK types.

mod conversions;
mod error;
mod expressions;
mod store;

pub use error::{classify, code_for};
pub use store::{AwsConfig, DynamoDbStore};
