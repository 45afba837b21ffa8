use thiserror::Error;

pub type MemoryResult<T> = Result<T, MemoryStoreError>;

/// Failures of the in-memory store.
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// The store was switched offline, used to exercise degraded paths.
    #[error("in-memory store is offline")]
    Offline,
}
