use std::time::Duration;

use thiserror::Error;

use crate::store::{Item, StoreError, TableStatus};

/// The table did not reach a usable state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Table '{table}' entered the FAILED state")]
    Failed { table: String },

    #[error("Timed out after {waited:?} waiting for table '{table}' to become active (last status: {last_status:?})")]
    Timeout {
        table: String,
        waited: Duration,
        last_status: TableStatus,
    },
}

/// Emptying a table stopped partway through.
///
/// `cursor` is the scan position at the start of the failing page; pass it to
/// a resumed empty to continue without rescanning deleted pages.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Emptying table '{table}' stopped after {deleted} deletions; {undeleted} scanned items not yet deleted")]
pub struct PartialEmptyError {
    pub table: String,
    pub deleted: usize,
    pub undeleted: usize,
    pub cursor: Option<Item>,
    #[source]
    pub source: StoreError,
}
