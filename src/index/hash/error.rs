use thiserror::Error;

use crate::storage::buffer::BufferPoolError;

#[derive(Error, Debug)]
pub enum HashTableError {
    #[error("Directory is at maximum depth, cannot split")]
    DirectoryFull,

    #[error("Key/value pair already present")]
    DuplicateEntry,

    #[error("Buffer pool error: {0}")]
    BufferPool(#[from] BufferPoolError),
}
