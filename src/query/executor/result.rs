// Query execution result types: values, tuples, and the error taxonomy
// shared by the executor tree.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::common::types::Rid;
use crate::index::hash::HashTableError;
use crate::storage::buffer::BufferPoolError;
use crate::storage::heap::HeapError;
use crate::transaction::TransactionError;

/// Possible data types for values in a tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Type discriminant first so different types never collide
        match self {
            Value::Null => 0.hash(state),
            Value::Integer(i) => {
                1.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                2.hash(state);
                f.to_bits().hash(state);
            }
            Value::Text(s) => {
                3.hash(state);
                s.hash(state);
            }
            Value::Boolean(b) => {
                4.hash(state);
                b.hash(state);
            }
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            // Null is incomparable with anything
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            // Integers and floats compare numerically
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// A positional row of values, the unit executors pass around
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    pub values: Vec<Value>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> QueryResult<&Value> {
        self.values
            .get(index)
            .ok_or(QueryError::ColumnOutOfRange(index))
    }

    pub fn to_bytes(&self) -> QueryResult<Vec<u8>> {
        bincode::serialize(&self.values).map_err(|e| QueryError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> QueryResult<Self> {
        let values =
            bincode::deserialize(bytes).map_err(|e| QueryError::Serialization(e.to_string()))?;
        Ok(Self { values })
    }

    /// Concatenate two tuples, left side first (join output)
    pub fn joined(left: &Tuple, right: &Tuple) -> Self {
        let mut values = Vec::with_capacity(left.values.len() + right.values.len());
        values.extend(left.values.iter().cloned());
        values.extend(right.values.iter().cloned());
        Self { values }
    }
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column index {0} out of range")]
    ColumnOutOfRange(usize),

    #[error("Executor used before init")]
    NotInitialized,

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Heap error: {0}")]
    Heap(#[from] HeapError),

    #[error("Buffer pool error: {0}")]
    BufferPool(#[from] BufferPoolError),

    #[error("Index error: {0}")]
    Index(#[from] HashTableError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// What `next` hands back: a tuple and the rid it came from. Executors that
/// synthesize rows (joins, aggregates) use `Rid::INVALID`.
pub type NextTuple = Option<(Tuple, Rid)>;
