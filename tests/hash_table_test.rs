use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::Arc;
use std::thread;

use corundb::common::types::Rid;
use corundb::index::hash::{
    ExtendibleHashTable, HashTableError, HashTableOptions, IndexKey, IndexValue,
};
use corundb::storage::buffer::BufferPool;

mod common;
use common::create_test_buffer_pool;

/// Key whose hash is its own value, so tests control exactly which directory
/// slots collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IdentKey(u32);

impl IndexKey for IdentKey {
    const ENCODED_SIZE: usize = 4;

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(buf, self.0);
    }

    fn decode_from(buf: &[u8]) -> Self {
        IdentKey(LittleEndian::read_u32(buf))
    }

    fn hash64(&self) -> u64 {
        self.0 as u64
    }
}

fn small_table(
    pool_size: usize,
    bucket_capacity: usize,
    max_depth: u32,
) -> Result<(
    ExtendibleHashTable<IdentKey, i64>,
    tempfile::NamedTempFile,
)> {
    let (buffer_pool, file) = create_test_buffer_pool(pool_size)?;
    let table = ExtendibleHashTable::with_options(
        buffer_pool as Arc<dyn BufferPool>,
        HashTableOptions {
            bucket_capacity: Some(bucket_capacity),
            max_depth,
        },
    )?;
    Ok((table, file))
}

// Three keys colliding on their low bits overflow a two-slot bucket on the
// third insert; the table splits until every key is reachable again.
#[test]
fn test_split_on_third_insert() -> Result<()> {
    let (table, _file) = small_table(3, 2, 9)?;

    table.insert(&IdentKey(0), &100)?;
    table.insert(&IdentKey(4), &101)?;
    assert_eq!(table.global_depth()?, 0);

    table.insert(&IdentKey(8), &102)?;
    assert!(table.global_depth()? >= 1);

    assert_eq!(table.get_value(&IdentKey(0))?, vec![100]);
    assert_eq!(table.get_value(&IdentKey(4))?, vec![101]);
    assert_eq!(table.get_value(&IdentKey(8))?, vec![102]);
    table.verify_integrity()?;

    Ok(())
}

// Removing the keys that forced the split empties their buckets; merges
// collapse local depths and the directory shrinks back.
#[test]
fn test_merge_on_emptying() -> Result<()> {
    let (table, _file) = small_table(3, 2, 9)?;

    table.insert(&IdentKey(0), &100)?;
    table.insert(&IdentKey(4), &101)?;
    table.insert(&IdentKey(8), &102)?;
    let depth_after_split = table.global_depth()?;
    assert!(depth_after_split >= 1);

    assert!(table.remove(&IdentKey(4), &101)?);
    assert!(table.remove(&IdentKey(8), &102)?);
    table.verify_integrity()?;

    assert!(table.global_depth()? < depth_after_split);
    assert_eq!(table.get_value(&IdentKey(0))?, vec![100]);
    assert_eq!(table.get_value(&IdentKey(4))?, Vec::<i64>::new());
    assert_eq!(table.get_value(&IdentKey(8))?, Vec::<i64>::new());

    // removing an absent pair reports false
    assert!(!table.remove(&IdentKey(8), &102)?);

    Ok(())
}

// A capped directory refuses the insert that would need one more split.
#[test]
fn test_directory_full_refuses_insert() -> Result<()> {
    let (table, _file) = small_table(10, 4, 2)?;

    // all of these collide on the last two bits
    for key in [0u32, 4, 8, 12] {
        table.insert(&IdentKey(key), &(key as i64))?;
    }

    match table.insert(&IdentKey(16), &16) {
        Err(HashTableError::DirectoryFull) => {}
        other => panic!("expected DirectoryFull, got {:?}", other),
    }

    // the failed insert leaves the table usable
    assert_eq!(table.get_value(&IdentKey(0))?, vec![0]);
    assert_eq!(table.get_value(&IdentKey(12))?, vec![12]);
    table.verify_integrity()?;

    Ok(())
}

#[test]
fn test_duplicate_pair_rejected() -> Result<()> {
    let (table, _file) = small_table(10, 4, 9)?;

    table.insert(&IdentKey(1), &10)?;
    match table.insert(&IdentKey(1), &10) {
        Err(HashTableError::DuplicateEntry) => {}
        other => panic!("expected DuplicateEntry, got {:?}", other),
    }

    // same key with a different value is a legal multi-value entry
    table.insert(&IdentKey(1), &11)?;
    let mut values = table.get_value(&IdentKey(1))?;
    values.sort_unstable();
    assert_eq!(values, vec![10, 11]);

    assert!(table.remove(&IdentKey(1), &10)?);
    assert_eq!(table.get_value(&IdentKey(1))?, vec![11]);

    Ok(())
}

// Default-capacity table over i64 keys: a few hundred inserts and removals
// with integrity checks along the way.
#[test]
fn test_insert_remove_many() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(50)?;
    let table: ExtendibleHashTable<i64, i64> =
        ExtendibleHashTable::new(buffer_pool as Arc<dyn BufferPool>)?;

    for key in 0..500i64 {
        table.insert(&key, &(key * 10))?;
    }
    table.verify_integrity()?;

    for key in 0..500i64 {
        assert_eq!(table.get_value(&key)?, vec![key * 10]);
    }

    for key in (0..500i64).step_by(2) {
        assert!(table.remove(&key, &(key * 10))?);
    }
    table.verify_integrity()?;

    for key in 0..500i64 {
        let expected = if key % 2 == 0 { vec![] } else { vec![key * 10] };
        assert_eq!(table.get_value(&key)?, expected);
    }

    Ok(())
}

// Shuffled insert/lookup/remove order stresses split and merge interleaving.
#[test]
fn test_randomized_workload() -> Result<()> {
    use rand::seq::SliceRandom;

    let (buffer_pool, _file) = create_test_buffer_pool(50)?;
    let table: ExtendibleHashTable<i64, i64> =
        ExtendibleHashTable::new(buffer_pool as Arc<dyn BufferPool>)?;

    let mut rng = rand::thread_rng();
    let mut keys: Vec<i64> = (0..300).collect();

    keys.shuffle(&mut rng);
    for &key in &keys {
        table.insert(&key, &(key + 1))?;
    }
    table.verify_integrity()?;

    keys.shuffle(&mut rng);
    for &key in &keys {
        assert_eq!(table.get_value(&key)?, vec![key + 1]);
    }

    keys.shuffle(&mut rng);
    for &key in &keys {
        assert!(table.remove(&key, &(key + 1))?);
    }
    table.verify_integrity()?;
    for &key in &keys {
        assert!(table.get_value(&key)?.is_empty());
    }

    Ok(())
}

// Rid values, as the catalog stores them
#[test]
fn test_rid_values() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(20)?;
    let table: ExtendibleHashTable<i64, Rid> =
        ExtendibleHashTable::new(buffer_pool as Arc<dyn BufferPool>)?;

    let rid_a = Rid::new(7, 0);
    let rid_b = Rid::new(7, 1);
    table.insert(&99, &rid_a)?;
    table.insert(&99, &rid_b)?;

    let mut values = table.get_value(&99)?;
    values.sort_by_key(|rid| rid.slot);
    assert_eq!(values, vec![rid_a, rid_b]);

    assert_eq!(Rid::ENCODED_SIZE, 8);
    Ok(())
}

// Writers serialize through the table latch; concurrent inserts over
// disjoint ranges must all be visible afterwards.
#[test]
fn test_concurrent_inserts() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(50)?;
    let table: Arc<ExtendibleHashTable<i64, i64>> = Arc::new(ExtendibleHashTable::new(
        buffer_pool as Arc<dyn BufferPool>,
    )?);

    let mut handles = Vec::new();
    for worker in 0..4i64 {
        let table = table.clone();
        handles.push(thread::spawn(move || {
            for offset in 0..100i64 {
                let key = worker * 100 + offset;
                table.insert(&key, &key).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for key in 0..400i64 {
        assert_eq!(table.get_value(&key)?, vec![key]);
    }
    table.verify_integrity()?;

    Ok(())
}

// The default i64 hash is deterministic across calls, a requirement for a
// disk-backed directory.
#[test]
fn test_hash_is_deterministic() {
    let key = 123_456_789i64;
    assert_eq!(key.hash64(), key.hash64());

    let mut hasher = DefaultHasher::new();
    hasher.write_i64(key);
    assert_eq!(key.hash64(), hasher.finish());
}
