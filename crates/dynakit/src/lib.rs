//! Resilient, typed access to partition/sort-key tables.
//!
//! This crate is the imperative shell around `dynakit_core`: it performs the
//! store calls, retries and polling that the core only describes.
//!
//! - [`ResilientClient`]: typed get/put/update under a retry budget
//! - [`TableManager`]: create-and-wait, empty and drop of tables
//! - [`RetryExecutor`]: backoff-governed retry of single store calls
//! - [`storage`]: in-memory and DynamoDB store backends

pub mod client;
pub mod deadline;
pub mod diagnostics;
pub mod error;
pub mod lifecycle;
pub mod retry;
pub mod storage;

pub use client::{Lookup, PutOptions, ResilientClient, DEFAULT_TAG_NAMESPACE};
pub use deadline::{Deadline, Expired};
pub use diagnostics::TracingDiagnostics;
pub use error::{Error, Result};
pub use lifecycle::TableManager;
pub use retry::RetryExecutor;

pub use dynakit_core;
pub use dynakit_core::record;
