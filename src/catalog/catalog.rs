use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::schema::Schema;
use crate::catalog::table::{IndexInfo, IndexOid, TableInfo, TableOid};
use crate::index::hash::{ExtendibleHashTable, HashTableError};
use crate::query::executor::result::Tuple;
use crate::storage::buffer::BufferPool;
use crate::storage::heap::{HeapError, TableHeap};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Index already exists: {0}")]
    IndexExists(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Unsupported index key: {0}")]
    UnsupportedKeyType(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Heap error: {0}")]
    Heap(#[from] HeapError),

    #[error("Index error: {0}")]
    Index(#[from] HashTableError),
}

/// In-memory catalog mapping names and oids to table heaps and indexes
pub struct Catalog {
    buffer_pool: Arc<dyn BufferPool>,
    tables: HashMap<TableOid, Arc<TableInfo>>,
    table_names: HashMap<String, TableOid>,
    indexes: HashMap<IndexOid, Arc<IndexInfo>>,
    index_names: HashMap<String, IndexOid>,
    table_indexes: HashMap<TableOid, Vec<IndexOid>>,
    next_table_oid: TableOid,
    next_index_oid: IndexOid,
}

impl Catalog {
    pub fn new(buffer_pool: Arc<dyn BufferPool>) -> Self {
        Self {
            buffer_pool,
            tables: HashMap::new(),
            table_names: HashMap::new(),
            indexes: HashMap::new(),
            index_names: HashMap::new(),
            table_indexes: HashMap::new(),
            next_table_oid: 0,
            next_index_oid: 0,
        }
    }

    pub fn create_table(
        &mut self,
        name: impl Into<String>,
        schema: Schema,
    ) -> Result<Arc<TableInfo>, CatalogError> {
        let name = name.into();
        if self.table_names.contains_key(&name) {
            return Err(CatalogError::TableExists(name));
        }

        let heap = Arc::new(TableHeap::new(self.buffer_pool.clone())?);
        let oid = self.next_table_oid;
        self.next_table_oid += 1;

        let info = Arc::new(TableInfo {
            oid,
            name: name.clone(),
            schema,
            heap,
        });
        self.tables.insert(oid, info.clone());
        self.table_names.insert(name, oid);
        self.table_indexes.insert(oid, Vec::new());

        Ok(info)
    }

    pub fn get_table(&self, oid: TableOid) -> Option<Arc<TableInfo>> {
        self.tables.get(&oid).cloned()
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<Arc<TableInfo>> {
        self.table_names
            .get(name)
            .and_then(|oid| self.tables.get(oid))
            .cloned()
    }

    /// Create a hash index over one integer column and back-fill it from the
    /// table's existing rows.
    pub fn create_index(
        &mut self,
        index_name: impl Into<String>,
        table_name: &str,
        key_column_name: &str,
    ) -> Result<Arc<IndexInfo>, CatalogError> {
        let index_name = index_name.into();
        if self.index_names.contains_key(&index_name) {
            return Err(CatalogError::IndexExists(index_name));
        }
        let table = self
            .get_table_by_name(table_name)
            .ok_or_else(|| CatalogError::TableNotFound(table_name.to_string()))?;
        let key_column = table
            .schema
            .column_index(key_column_name)
            .ok_or_else(|| CatalogError::ColumnNotFound(key_column_name.to_string()))?;

        let index = Arc::new(ExtendibleHashTable::new(self.buffer_pool.clone())?);
        let oid = self.next_index_oid;
        self.next_index_oid += 1;

        let info = Arc::new(IndexInfo {
            oid,
            name: index_name.clone(),
            table_oid: table.oid,
            key_column,
            index,
        });

        // Back-fill from rows already in the heap
        let mut iter = table.heap.iter();
        while let Some((rid, bytes)) = iter.next_tuple()? {
            let tuple =
                Tuple::from_bytes(&bytes).map_err(|e| CatalogError::Serialization(e.to_string()))?;
            let key = info.key_of(&tuple)?;
            info.index.insert(&key, &rid)?;
        }

        self.indexes.insert(oid, info.clone());
        self.index_names.insert(index_name, oid);
        self.table_indexes
            .entry(table.oid)
            .or_default()
            .push(oid);

        Ok(info)
    }

    pub fn get_index_by_name(&self, name: &str) -> Option<Arc<IndexInfo>> {
        self.index_names
            .get(name)
            .and_then(|oid| self.indexes.get(oid))
            .cloned()
    }

    /// Every index defined over a table
    pub fn table_indexes(&self, oid: TableOid) -> Vec<Arc<IndexInfo>> {
        self.table_indexes
            .get(&oid)
            .map(|oids| {
                oids.iter()
                    .filter_map(|index_oid| self.indexes.get(index_oid).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}
