use std::collections::TryReserveError;

/// Failure of a queue operation. A failed call leaves the queue exactly as
/// it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// `front`, `back` or `pop` on a queue with no entries.
    #[error("queue is empty")]
    EmptyQueue,
    /// A key-scoped operation named a key with no entries.
    #[error("key not found in queue")]
    KeyNotFound,
    /// Growing the queue's storage failed.
    #[error("allocation failed: {0}")]
    AllocationFailure(#[from] TryReserveError),
}
