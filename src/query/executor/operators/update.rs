// Update executor.
//
// Applies a list of set-clauses to each input row under the exclusive lock,
// rewriting the heap tuple in place (rids stay stable) and swapping the old
// index entries for new ones.

use std::sync::Arc;

use crate::catalog::{IndexInfo, TableInfo};
use crate::query::executor::context::ExecutorContext;
use crate::query::executor::operators::Executor;
use crate::query::executor::result::{NextTuple, QueryError, QueryResult, Tuple, Value};
use crate::transaction::IsolationLevel;

/// Assign `value` to the column at `column_index`
pub struct SetClause {
    pub column_index: usize,
    pub value: Value,
}

pub struct UpdateExecutor {
    context: Arc<ExecutorContext>,
    table_name: String,
    child: Box<dyn Executor>,
    set_clauses: Vec<SetClause>,
    table: Option<Arc<TableInfo>>,
    indexes: Vec<Arc<IndexInfo>>,
    done: bool,
}

impl UpdateExecutor {
    pub fn new(
        context: Arc<ExecutorContext>,
        table_name: impl Into<String>,
        child: Box<dyn Executor>,
        set_clauses: Vec<SetClause>,
    ) -> Self {
        Self {
            context,
            table_name: table_name.into(),
            child,
            set_clauses,
            table: None,
            indexes: Vec::new(),
            done: false,
        }
    }

    fn updated_tuple(&self, old: &Tuple) -> QueryResult<Tuple> {
        let mut values = old.values.clone();
        for clause in &self.set_clauses {
            if clause.column_index >= values.len() {
                return Err(QueryError::ColumnOutOfRange(clause.column_index));
            }
            values[clause.column_index] = clause.value.clone();
        }
        Ok(Tuple::new(values))
    }
}

impl Executor for UpdateExecutor {
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

        while let Some((old_tuple, rid)) = self.child.next()? {
            let new_tuple = self.updated_tuple(&old_tuple)?;

            if !txn.is_exclusive_locked(rid) {
                if txn.is_shared_locked(rid) {
                    lock_manager.lock_upgrade(&txn, rid)?;
                } else {
                    lock_manager.lock_exclusive(&txn, rid)?;
                }
            }

            table.heap.update_tuple(rid, &new_tuple.to_bytes()?)?;

            if txn.isolation_level() == IsolationLevel::ReadUncommitted {
                lock_manager.unlock(&txn, rid);
            }

            for index in &self.indexes {
                let old_key = index.key_of(&old_tuple)?;
                let new_key = index.key_of(&new_tuple)?;
                if old_key != new_key {
                    index.index.remove(&old_key, &rid)?;
                    index.index.insert(&new_key, &rid)?;
                }
            }
        }

        Ok(None)
    }
}
