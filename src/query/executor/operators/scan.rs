// Sequential scan over a table heap.
//
// Row visibility follows the transaction's isolation level: everything but
// read uncommitted takes a shared lock before reading a row, and read
// committed gives the lock back as soon as the row has been read.

use std::sync::Arc;

use crate::query::executor::context::ExecutorContext;
use crate::query::executor::operators::{Executor, TuplePredicate};
use crate::query::executor::result::{NextTuple, QueryError, QueryResult, Tuple};
use crate::storage::heap::TableIterator;
use crate::transaction::IsolationLevel;

pub struct SeqScanExecutor {
    context: Arc<ExecutorContext>,
    table_name: String,
    predicate: Option<TuplePredicate>,
    iter: Option<TableIterator>,
}

impl SeqScanExecutor {
    pub fn new(
        context: Arc<ExecutorContext>,
        table_name: impl Into<String>,
        predicate: Option<TuplePredicate>,
    ) -> Self {
        Self {
            context,
            table_name: table_name.into(),
            predicate,
            iter: None,
        }
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> QueryResult<()> {
        let table = self
            .context
            .catalog()
            .read()
            .get_table_by_name(&self.table_name)
            .ok_or_else(|| QueryError::TableNotFound(self.table_name.clone()))?;
        self.iter = Some(table.heap.iter());
        Ok(())
    }

    fn next(&mut self) -> QueryResult<NextTuple> {
        let iter = self.iter.as_mut().ok_or(QueryError::NotInitialized)?;
        let txn = self.context.txn().clone();
        let lock_manager = self.context.lock_manager();

        loop {
            let (rid, bytes) = match iter.next_tuple()? {
                Some(row) => row,
                None => return Ok(None),
            };

            let locked_here = if txn.isolation_level() != IsolationLevel::ReadUncommitted
                && !txn.is_shared_locked(rid)
                && !txn.is_exclusive_locked(rid)
            {
                lock_manager.lock_shared(&txn, rid)?;
                true
            } else {
                false
            };

            let tuple = Tuple::from_bytes(&bytes)?;
            let passes = match &self.predicate {
                Some(predicate) => predicate(&tuple),
                None => true,
            };

            // Read committed keeps shared locks only for the duration of the
            // read itself
            if locked_here
                && txn.isolation_level() == IsolationLevel::ReadCommitted
                && !txn.is_exclusive_locked(rid)
            {
                lock_manager.unlock(&txn, rid);
            }

            if passes {
                return Ok(Some((tuple, rid)));
            }
        }
    }
}
