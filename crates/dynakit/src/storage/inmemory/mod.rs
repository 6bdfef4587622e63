//! In-memory storage backend.
//!
//! Keeps every table in a `BTreeMap` behind `Arc<RwLock<_>>`. Useful for
//! tests and local development where persistence is not required.
//!
//! # Example
//!
//! ```rust,ignore
//! use dynakit::storage::inmemory::InMemoryStore;
//!
//! let store = InMemoryStore::new().with_activation_polls(0);
//! ```

mod store;

pub use store::{InMemoryStore, DEFAULT_ACTIVATION_POLLS};
