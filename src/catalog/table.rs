use std::sync::Arc;

use crate::catalog::schema::Schema;
use crate::catalog::CatalogError;
use crate::common::types::Rid;
use crate::index::hash::ExtendibleHashTable;
use crate::query::executor::result::{Tuple, Value};
use crate::storage::heap::TableHeap;

pub type TableOid = u32;
pub type IndexOid = u32;

/// Catalog entry for one table
pub struct TableInfo {
    pub oid: TableOid,
    pub name: String,
    pub schema: Schema,
    pub heap: Arc<TableHeap>,
}

/// Catalog entry for one single-column hash index
pub struct IndexInfo {
    pub oid: IndexOid,
    pub name: String,
    pub table_oid: TableOid,
    pub key_column: usize,
    pub index: Arc<ExtendibleHashTable<i64, Rid>>,
}

impl IndexInfo {
    /// Extract this index's key from a table tuple
    pub fn key_of(&self, tuple: &Tuple) -> Result<i64, CatalogError> {
        match tuple.values.get(self.key_column) {
            Some(Value::Integer(key)) => Ok(*key),
            Some(other) => Err(CatalogError::UnsupportedKeyType(format!(
                "column {} holds {}, only integer keys are indexable",
                self.key_column, other
            ))),
            None => Err(CatalogError::ColumnNotFound(format!(
                "column index {}",
                self.key_column
            ))),
        }
    }
}
