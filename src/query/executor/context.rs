use std::sync::Arc;
use parking_lot::RwLock;

use crate::catalog::Catalog;
use crate::storage::buffer::BufferPool;
use crate::transaction::{LockManager, Transaction, TransactionManager};

/// Everything one query's executor chain needs: storage, catalog, and the
/// transaction it runs under.
pub struct ExecutorContext {
    buffer_pool: Arc<dyn BufferPool>,
    catalog: Arc<RwLock<Catalog>>,
    txn: Arc<Transaction>,
    lock_manager: Arc<LockManager>,
    txn_manager: Arc<TransactionManager>,
}

impl ExecutorContext {
    pub fn new(
        buffer_pool: Arc<dyn BufferPool>,
        catalog: Arc<RwLock<Catalog>>,
        txn: Arc<Transaction>,
        lock_manager: Arc<LockManager>,
        txn_manager: Arc<TransactionManager>,
    ) -> Self {
        Self {
            buffer_pool,
            catalog,
            txn,
            lock_manager,
            txn_manager,
        }
    }

    pub fn buffer_pool(&self) -> &Arc<dyn BufferPool> {
        &self.buffer_pool
    }

    pub fn catalog(&self) -> &Arc<RwLock<Catalog>> {
        &self.catalog
    }

    pub fn txn(&self) -> &Arc<Transaction> {
        &self.txn
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    pub fn txn_manager(&self) -> &Arc<TransactionManager> {
        &self.txn_manager
    }
}
