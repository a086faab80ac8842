// Hash-based aggregation.
//
// The group-by hash table is materialized at init; `next` walks the groups,
// applying the HAVING condition to (group keys, aggregate results).

use std::collections::HashMap;

use crate::common::types::Rid;
use crate::query::executor::operators::{Executor, HavingPredicate};
use crate::query::executor::result::{NextTuple, QueryError, QueryResult, Tuple, Value};

/// Supported aggregate functions; the payload is the input column index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    CountStar,
    Count(usize),
    Sum(usize),
    Min(usize),
    Max(usize),
    Avg(usize),
}

/// Running state of one aggregate within one group
struct Accumulator {
    function: AggregateFunction,
    count: i64,
    sum: Option<Value>,
    min: Option<Value>,
    max: Option<Value>,
}

impl Accumulator {
    fn new(function: AggregateFunction) -> Self {
        Self {
            function,
            count: 0,
            sum: None,
            min: None,
            max: None,
        }
    }

    fn update(&mut self, tuple: &Tuple) -> QueryResult<()> {
        let value = match self.function {
            AggregateFunction::CountStar => {
                self.count += 1;
                return Ok(());
            }
            AggregateFunction::Count(column)
            | AggregateFunction::Sum(column)
            | AggregateFunction::Min(column)
            | AggregateFunction::Max(column)
            | AggregateFunction::Avg(column) => tuple.get(column)?.clone(),
        };

        // SQL semantics: NULL inputs do not contribute
        if value == Value::Null {
            return Ok(());
        }
        self.count += 1;

        match self.function {
            AggregateFunction::Sum(_) | AggregateFunction::Avg(_) => {
                self.sum = Some(match self.sum.take() {
                    Some(sum) => numeric_add(&sum, &value)?,
                    None => value,
                });
            }
            AggregateFunction::Min(_) => {
                let keep_old = matches!(&self.min, Some(min) if min <= &value);
                if !keep_old {
                    self.min = Some(value);
                }
            }
            AggregateFunction::Max(_) => {
                let keep_old = matches!(&self.max, Some(max) if max >= &value);
                if !keep_old {
                    self.max = Some(value);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        match self.function {
            AggregateFunction::CountStar | AggregateFunction::Count(_) => {
                Value::Integer(self.count)
            }
            AggregateFunction::Sum(_) => self.sum.clone().unwrap_or(Value::Null),
            AggregateFunction::Min(_) => self.min.clone().unwrap_or(Value::Null),
            AggregateFunction::Max(_) => self.max.clone().unwrap_or(Value::Null),
            AggregateFunction::Avg(_) => match (&self.sum, self.count) {
                (_, 0) | (None, _) => Value::Null,
                (Some(sum), count) => {
                    let total = match sum {
                        Value::Integer(i) => *i as f64,
                        Value::Float(f) => *f,
                        _ => return Value::Null,
                    };
                    Value::Float(total / count as f64)
                }
            },
        }
    }
}

fn numeric_add(a: &Value, b: &Value) -> QueryResult<Value> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(x + y)),
        (Value::Integer(x), Value::Float(y)) => Ok(Value::Float(*x as f64 + y)),
        (Value::Float(x), Value::Integer(y)) => Ok(Value::Float(x + *y as f64)),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x + y)),
        _ => Err(QueryError::InvalidExpression(format!(
            "cannot add {} and {}",
            a, b
        ))),
    }
}

pub struct AggregationExecutor {
    child: Box<dyn Executor>,
    group_by: Vec<usize>,
    aggregates: Vec<AggregateFunction>,
    having: Option<HavingPredicate>,
    /// Groups in first-seen order: (group-by values, accumulators)
    groups: Vec<(Vec<Value>, Vec<Accumulator>)>,
    position: usize,
}

impl AggregationExecutor {
    pub fn new(
        child: Box<dyn Executor>,
        group_by: Vec<usize>,
        aggregates: Vec<AggregateFunction>,
        having: Option<HavingPredicate>,
    ) -> Self {
        Self {
            child,
            group_by,
            aggregates,
            having,
            groups: Vec::new(),
            position: 0,
        }
    }
}

impl Executor for AggregationExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.child.init()?;
        self.groups.clear();
        self.position = 0;

        let mut group_index: HashMap<Vec<Value>, usize> = HashMap::new();
        while let Some((tuple, _)) = self.child.next()? {
            let mut keys = Vec::with_capacity(self.group_by.len());
            for &column in &self.group_by {
                keys.push(tuple.get(column)?.clone());
            }

            let at = match group_index.get(&keys) {
                Some(&at) => at,
                None => {
                    let accumulators = self
                        .aggregates
                        .iter()
                        .map(|&function| Accumulator::new(function))
                        .collect();
                    self.groups.push((keys.clone(), accumulators));
                    group_index.insert(keys, self.groups.len() - 1);
                    self.groups.len() - 1
                }
            };

            for accumulator in &mut self.groups[at].1 {
                accumulator.update(&tuple)?;
            }
        }
        Ok(())
    }

    fn next(&mut self) -> QueryResult<NextTuple> {
        while self.position < self.groups.len() {
            let (keys, accumulators) = &self.groups[self.position];
            self.position += 1;

            let results: Vec<Value> = accumulators.iter().map(Accumulator::finalize).collect();
            let passes = match &self.having {
                Some(having) => having(keys, &results),
                None => true,
            };
            if !passes {
                continue;
            }

            let mut values = keys.clone();
            values.extend(results);
            return Ok(Some((Tuple::new(values), Rid::INVALID)));
        }
        Ok(None)
    }
}
