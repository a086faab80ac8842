use std::sync::Arc;
use anyhow::Result;
use parking_lot::RwLock;
use tempfile::NamedTempFile;

use corundb::catalog::{Catalog, Column, DataType, Schema, TableInfo};
use corundb::query::executor::context::ExecutorContext;
use corundb::storage::buffer::{BufferPool, BufferPoolManager, ParallelBufferPoolManager};
use corundb::storage::disk::DiskManager;
use corundb::transaction::{IsolationLevel, LockManager, Transaction, TransactionManager};

// Create a temporary database file for testing
#[allow(dead_code)]
pub fn create_temp_db_file() -> Result<NamedTempFile> {
    Ok(NamedTempFile::new()?)
}

// Create a buffer pool manager with a temporary database
#[allow(dead_code)]
pub fn create_test_buffer_pool(pool_size: usize) -> Result<(Arc<BufferPoolManager>, NamedTempFile)> {
    let file = NamedTempFile::new()?;
    let disk = Arc::new(DiskManager::new(file.path())?);
    Ok((Arc::new(BufferPoolManager::new(pool_size, disk)), file))
}

// Create a sharded buffer pool with a temporary database
#[allow(dead_code)]
pub fn create_test_parallel_pool(
    num_instances: usize,
    instance_pool_size: usize,
) -> Result<(Arc<ParallelBufferPoolManager>, NamedTempFile)> {
    let file = NamedTempFile::new()?;
    let disk = Arc::new(DiskManager::new(file.path())?);
    Ok((
        Arc::new(ParallelBufferPoolManager::new(
            num_instances,
            instance_pool_size,
            disk,
        )),
        file,
    ))
}

// A full stack for executor tests: storage, catalog, transactions
#[allow(dead_code)]
pub struct TestDb {
    pub buffer_pool: Arc<dyn BufferPool>,
    pub catalog: Arc<RwLock<Catalog>>,
    pub txn_manager: Arc<TransactionManager>,
    pub lock_manager: Arc<LockManager>,
    _file: NamedTempFile,
}

#[allow(dead_code)]
impl TestDb {
    pub fn new(pool_size: usize) -> Result<Self> {
        let file = NamedTempFile::new()?;
        let disk = Arc::new(DiskManager::new(file.path())?);
        let buffer_pool: Arc<dyn BufferPool> = Arc::new(BufferPoolManager::new(pool_size, disk));
        let catalog = Arc::new(RwLock::new(Catalog::new(buffer_pool.clone())));
        let txn_manager = Arc::new(TransactionManager::new());
        let lock_manager = Arc::new(LockManager::new(txn_manager.clone()));

        Ok(Self {
            buffer_pool,
            catalog,
            txn_manager,
            lock_manager,
            _file: file,
        })
    }

    pub fn create_accounts_table(&self) -> Result<Arc<TableInfo>> {
        let schema = Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("owner", DataType::Text),
            Column::new("balance", DataType::Integer),
        ]);
        Ok(self.catalog.write().create_table("accounts", schema)?)
    }

    pub fn create_owners_table(&self) -> Result<Arc<TableInfo>> {
        let schema = Schema::new(vec![
            Column::new("owner", DataType::Text),
            Column::new("region", DataType::Text),
        ]);
        Ok(self.catalog.write().create_table("owners", schema)?)
    }

    pub fn begin(&self, isolation: IsolationLevel) -> Arc<Transaction> {
        self.txn_manager.begin(isolation)
    }

    pub fn context(&self, txn: &Arc<Transaction>) -> Arc<ExecutorContext> {
        Arc::new(ExecutorContext::new(
            self.buffer_pool.clone(),
            self.catalog.clone(),
            txn.clone(),
            self.lock_manager.clone(),
            self.txn_manager.clone(),
        ))
    }
}
