// Query operators for the pull-based (iterator) execution model.
//
// Every operator implements `Executor`: `init` prepares it, `next` yields
// one row at a time until `None`.

pub mod agg;
pub mod delete;
pub mod distinct;
pub mod insert;
pub mod join;
pub mod scan;
pub mod update;

use crate::query::executor::result::{NextTuple, QueryResult, Tuple, Value};

pub use agg::{AggregateFunction, AggregationExecutor};
pub use delete::DeleteExecutor;
pub use distinct::DistinctExecutor;
pub use insert::InsertExecutor;
pub use join::{HashJoinExecutor, NestedLoopJoinExecutor};
pub use scan::SeqScanExecutor;
pub use update::UpdateExecutor;

/// The pull-based executor contract. Single-threaded per query chain.
pub trait Executor: Send {
    /// Prepare the executor; called once before the first `next`
    fn init(&mut self) -> QueryResult<()>;

    /// Produce the next row, or `None` when exhausted
    fn next(&mut self) -> QueryResult<NextTuple>;
}

/// Residual filter applied to one tuple
pub type TuplePredicate = Box<dyn Fn(&Tuple) -> bool + Send + Sync>;

/// Join condition over an (outer, inner) pair
pub type JoinPredicate = Box<dyn Fn(&Tuple, &Tuple) -> bool + Send + Sync>;

/// Extracts a join key from one side's tuple
pub type KeyExtractor = Box<dyn Fn(&Tuple) -> Value + Send + Sync>;

/// HAVING condition over (group-by values, aggregate values)
pub type HavingPredicate = Box<dyn Fn(&[Value], &[Value]) -> bool + Send + Sync>;
