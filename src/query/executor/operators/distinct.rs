// Distinct executor: materializes a set keyed by the full output row at
// init, then replays unique rows in first-seen order.

use std::collections::HashSet;

use crate::common::types::Rid;
use crate::query::executor::operators::Executor;
use crate::query::executor::result::{NextTuple, QueryResult, Tuple, Value};

pub struct DistinctExecutor {
    child: Box<dyn Executor>,
    rows: Vec<Tuple>,
    position: usize,
}

impl DistinctExecutor {
    pub fn new(child: Box<dyn Executor>) -> Self {
        Self {
            child,
            rows: Vec::new(),
            position: 0,
        }
    }
}

impl Executor for DistinctExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.child.init()?;
        self.rows.clear();
        self.position = 0;

        let mut seen: HashSet<Vec<Value>> = HashSet::new();
        while let Some((tuple, _)) = self.child.next()? {
            if seen.insert(tuple.values.clone()) {
                self.rows.push(tuple);
            }
        }
        Ok(())
    }

    fn next(&mut self) -> QueryResult<NextTuple> {
        if self.position < self.rows.len() {
            let tuple = self.rows[self.position].clone();
            self.position += 1;
            return Ok(Some((tuple, Rid::INVALID)));
        }
        Ok(None)
    }
}
