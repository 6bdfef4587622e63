mod error;
mod traits;
mod types;

pub use error::{ErrorClass, ErrorCode, StoreError, StoreResult};
pub use traits::Store;
pub use types::{
    AttributeValue, BillingMode, Condition, Item, KeyAttribute, ReturnValues, ScalarType,
    ScanPage, StoreOperation, TableClass, TableDescriptor, TableStatus, UpdateAction, UpdateSpec,
};

/// Maximum number of keys a single batch delete may carry.
pub const MAX_BATCH_DELETE_ITEMS: usize = 25;
