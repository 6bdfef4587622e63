//! Store backend implementations.
//!
//! This module provides concrete implementations of the
//! [`Store`](dynakit_core::store::Store) trait, selected at compile time via
//! feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): ordered in-memory tables with fault injection
//! - `dynamodb`: AWS DynamoDB backend using `aws-sdk-dynamodb`
//!
//! Unlike application binaries, a library may enable both backends at once.
//!
//! Build with DynamoDB:
//! ```bash
//! cargo build -p dynakit --features dynamodb
//! ```

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryStore;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbStore;
