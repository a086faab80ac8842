// Hash join for equality conditions: the left (build) side is materialized
// into a keyed multimap at init, the right (probe) side streams through
// `next`.

use std::collections::HashMap;

use crate::common::types::Rid;
use crate::query::executor::operators::{Executor, KeyExtractor};
use crate::query::executor::result::{NextTuple, QueryResult, Tuple, Value};

pub struct HashJoinExecutor {
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    left_key: KeyExtractor,
    right_key: KeyExtractor,
    hash_table: HashMap<Value, Vec<Tuple>>,
    /// Probe row currently being matched and its remaining matches
    current: Option<(Tuple, Vec<Tuple>)>,
    match_index: usize,
}

impl HashJoinExecutor {
    pub fn new(
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        left_key: KeyExtractor,
        right_key: KeyExtractor,
    ) -> Self {
        Self {
            left,
            right,
            left_key,
            right_key,
            hash_table: HashMap::new(),
            current: None,
            match_index: 0,
        }
    }
}

impl Executor for HashJoinExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.left.init()?;
        self.right.init()?;
        self.hash_table.clear();
        self.current = None;
        self.match_index = 0;

        while let Some((tuple, _)) = self.left.next()? {
            let key = (self.left_key)(&tuple);
            self.hash_table.entry(key).or_default().push(tuple);
        }
        Ok(())
    }

    fn next(&mut self) -> QueryResult<NextTuple> {
        loop {
            if let Some((right_tuple, matches)) = self.current.take() {
                if self.match_index < matches.len() {
                    let joined = Tuple::joined(&matches[self.match_index], &right_tuple);
                    self.match_index += 1;
                    self.current = Some((right_tuple, matches));
                    return Ok(Some((joined, Rid::INVALID)));
                }
                // matches exhausted, fall through and probe the next row
            }

            match self.right.next()? {
                Some((right_tuple, _)) => {
                    let key = (self.right_key)(&right_tuple);
                    if let Some(matches) = self.hash_table.get(&key) {
                        self.current = Some((right_tuple, matches.clone()));
                        self.match_index = 0;
                    }
                }
                None => return Ok(None),
            }
        }
    }
}
