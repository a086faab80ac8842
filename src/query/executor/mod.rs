pub mod context;
pub mod operators;
pub mod result;

pub use context::ExecutorContext;
pub use operators::Executor;
pub use result::{QueryError, QueryResult, Tuple, Value};
