//! Functional core of the dynakit data-access layer.
//!
//! Everything in this crate is pure: schema extraction and caching, typed
//! marshaling, backoff arithmetic, lifecycle planning and the abstract store
//! contract. The imperative shell (retries, sleeping, polling, SDK calls)
//! lives in the `dynakit` crate.

pub mod backoff;
pub mod config;
pub mod diagnostics;
pub mod lifecycle;
pub mod marshal;
pub mod schema;
pub mod store;
