pub mod bucket;
pub mod directory;
pub mod error;
pub mod key;
pub mod table;

pub use error::HashTableError;
pub use key::{IndexKey, IndexValue};
pub use table::{ExtendibleHashTable, HashTableOptions};
