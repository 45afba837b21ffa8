mod error;
pub mod store;

pub use error::MemoryStoreError;
pub use store::MemoryQuizStore;

use crate::dao::storage::StorageError;

impl From<MemoryStoreError> for StorageError {
    fn from(err: MemoryStoreError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
