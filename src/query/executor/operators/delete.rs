// Delete executor.
//
// For each input rid: take the exclusive lock (upgrading a held shared
// lock), tombstone the heap tuple, and remove the pair from every index.
// Read uncommitted drops the lock right after the write.

use std::sync::Arc;

use crate::catalog::{IndexInfo, TableInfo};
use crate::query::executor::context::ExecutorContext;
use crate::query::executor::operators::Executor;
use crate::query::executor::result::{NextTuple, QueryError, QueryResult};
use crate::transaction::IsolationLevel;

pub struct DeleteExecutor {
    context: Arc<ExecutorContext>,
    table_name: String,
    child: Box<dyn Executor>,
    table: Option<Arc<TableInfo>>,
    indexes: Vec<Arc<IndexInfo>>,
    done: bool,
}

impl DeleteExecutor {
    pub fn new(
        context: Arc<ExecutorContext>,
        table_name: impl Into<String>,
        child: Box<dyn Executor>,
    ) -> Self {
        Self {
            context,
            table_name: table_name.into(),
            child,
            table: None,
            indexes: Vec::new(),
            done: false,
        }
    }
}

impl Executor for DeleteExecutor {
    fn init(&mut self) -> QueryResult<()> {
        let catalog = self.context.catalog().read();
        let table = catalog
            .get_table_by_name(&self.table_name)
            .ok_or_else(|| QueryError::TableNotFound(self.table_name.clone()))?;
        self.indexes = catalog.table_indexes(table.oid);
        self.table = Some(table);
        drop(catalog);

        self.child.init()?;
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<NextTuple> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let table = self.table.clone().ok_or(QueryError::NotInitialized)?;
        let txn = self.context.txn().clone();
        let lock_manager = self.context.lock_manager().clone();

        while let Some((tuple, rid)) = self.child.next()? {
            if !txn.is_exclusive_locked(rid) {
                if txn.is_shared_locked(rid) {
                    lock_manager.lock_upgrade(&txn, rid)?;
                } else {
                    lock_manager.lock_exclusive(&txn, rid)?;
                }
            }

            table.heap.delete_tuple(rid)?;

            if txn.isolation_level() == IsolationLevel::ReadUncommitted {
                lock_manager.unlock(&txn, rid);
            }

            for index in &self.indexes {
                let key = index.key_of(&tuple)?;
                index.index.remove(&key, &rid)?;
            }
        }

        Ok(None)
    }
}
