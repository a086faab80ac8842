// Insert executor: writes rows into the heap and every index on the table.
//
// All work happens in the first call to `next`, which yields no rows.

use std::sync::Arc;

use crate::catalog::{IndexInfo, TableInfo};
use crate::query::executor::context::ExecutorContext;
use crate::query::executor::operators::Executor;
use crate::query::executor::result::{NextTuple, QueryError, QueryResult, Tuple, Value};

pub struct InsertExecutor {
    context: Arc<ExecutorContext>,
    table_name: String,
    /// Literal rows for a raw insert
    rows: Vec<Vec<Value>>,
    /// Alternatively, a child producing the rows to insert
    child: Option<Box<dyn Executor>>,
    table: Option<Arc<TableInfo>>,
    indexes: Vec<Arc<IndexInfo>>,
    done: bool,
}

impl InsertExecutor {
    pub fn new_raw(
        context: Arc<ExecutorContext>,
        table_name: impl Into<String>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        Self {
            context,
            table_name: table_name.into(),
            rows,
            child: None,
            table: None,
            indexes: Vec::new(),
            done: false,
        }
    }

    pub fn new_from_child(
        context: Arc<ExecutorContext>,
        table_name: impl Into<String>,
        child: Box<dyn Executor>,
    ) -> Self {
        Self {
            context,
            table_name: table_name.into(),
            rows: Vec::new(),
            child: Some(child),
            table: None,
            indexes: Vec::new(),
            done: false,
        }
    }

    fn insert_one(
        table: &TableInfo,
        indexes: &[Arc<IndexInfo>],
        tuple: &Tuple,
    ) -> QueryResult<()> {
        let rid = table.heap.insert_tuple(&tuple.to_bytes()?)?;
        for index in indexes {
            let key = index.key_of(tuple)?;
            index.index.insert(&key, &rid)?;
        }
        Ok(())
    }
}

impl Executor for InsertExecutor {
    fn init(&mut self) -> QueryResult<()> {
        let catalog = self.context.catalog().read();
        let table = catalog
            .get_table_by_name(&self.table_name)
            .ok_or_else(|| QueryError::TableNotFound(self.table_name.clone()))?;
        self.indexes = catalog.table_indexes(table.oid);
        self.table = Some(table);
        drop(catalog);

        if let Some(child) = &mut self.child {
            child.init()?;
        }
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<NextTuple> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let table = self.table.clone().ok_or(QueryError::NotInitialized)?;

        let mut pending: Vec<Tuple> = Vec::new();
        if let Some(child) = &mut self.child {
            while let Some((tuple, _)) = child.next()? {
                pending.push(tuple);
            }
        } else {
            pending.extend(std::mem::take(&mut self.rows).into_iter().map(Tuple::new));
        }

        for tuple in &pending {
            Self::insert_one(&table, &self.indexes, tuple)?;
        }

        Ok(None)
    }
}
