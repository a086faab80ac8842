// Export public modules
pub mod catalog;
pub mod common;
pub mod index;
pub mod query;
pub mod storage;
pub mod transaction;

// Re-export key items for convenient access
pub use index::hash::ExtendibleHashTable;
pub use storage::buffer::{BufferPool, BufferPoolError, BufferPoolManager, ParallelBufferPoolManager};
pub use storage::disk::DiskManager;
pub use transaction::{IsolationLevel, LockManager, Transaction, TransactionManager};
