//! Pure functions for deciding lifecycle steps (Functional Core).

use crate::store::{Item, TableStatus};

/// Next step for an ensure-exists call, given the observed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsurePlan {
    /// Table is absent and this caller has not created it yet.
    Create,
    /// Table is being created; keep polling.
    AwaitActive,
    /// Table is being deleted; wait until it is gone, then create it.
    AwaitDeletion,
    /// Table is usable.
    Ready,
    /// Table can never become usable.
    Failed,
}

/// Pure function: decide the next ensure-exists step.
///
/// `create_issued` suppresses a second create when a freshly created table is
/// still reported absent by an eventually consistent describe.
pub fn plan_ensure(status: TableStatus, create_issued: bool) -> EnsurePlan {
    match status {
        TableStatus::Absent if create_issued => EnsurePlan::AwaitActive,
        TableStatus::Absent => EnsurePlan::Create,
        TableStatus::Creating => EnsurePlan::AwaitActive,
        TableStatus::Active | TableStatus::Updating => EnsurePlan::Ready,
        TableStatus::Deleting => EnsurePlan::AwaitDeletion,
        TableStatus::Failed => EnsurePlan::Failed,
    }
}

/// Pure function: split keys into batches of at most `limit` keys.
pub fn delete_batches(keys: &[Item], limit: usize) -> Vec<&[Item]> {
    keys.chunks(limit.max(1)).collect()
}
