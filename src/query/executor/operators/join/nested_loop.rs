// Nested loop join: driven by the outer side, re-initializing the inner
// side for every outer row.

use crate::common::types::Rid;
use crate::query::executor::operators::{Executor, JoinPredicate};
use crate::query::executor::result::{NextTuple, QueryResult, Tuple};

pub struct NestedLoopJoinExecutor {
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    predicate: Option<JoinPredicate>,
    outer: Option<Tuple>,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        predicate: Option<JoinPredicate>,
    ) -> Self {
        Self {
            left,
            right,
            predicate,
            outer: None,
        }
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.left.init()?;
        self.right.init()?;
        self.outer = self.left.next()?.map(|(tuple, _)| tuple);
        Ok(())
    }

    fn next(&mut self) -> QueryResult<NextTuple> {
        loop {
            let outer = match &self.outer {
                Some(tuple) => tuple.clone(),
                None => return Ok(None),
            };

            match self.right.next()? {
                Some((inner, _)) => {
                    let matches = match &self.predicate {
                        Some(predicate) => predicate(&outer, &inner),
                        None => true,
                    };
                    if matches {
                        return Ok(Some((Tuple::joined(&outer, &inner), Rid::INVALID)));
                    }
                }
                None => {
                    // inner exhausted: advance the outer row and restart it
                    self.outer = self.left.next()?.map(|(tuple, _)| tuple);
                    if self.outer.is_some() {
                        self.right.init()?;
                    }
                }
            }
        }
    }
}
