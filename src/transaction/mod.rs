pub mod concurrency;

pub use concurrency::{
    IsolationLevel, LockManager, LockMode, Transaction, TransactionError, TransactionManager,
    TransactionState,
};
