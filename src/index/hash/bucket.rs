use crate::common::types::{Page, PAGE_SIZE};
use crate::index::hash::key::{IndexKey, IndexValue};

/// Why a bucket-local insert did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketInsertError {
    /// No non-readable slot left
    Full,
    /// The exact key/value pair is already present
    Duplicate,
}

/// Decoded form of one hash bucket page.
///
/// Layout: `occupied` bitmap, `readable` bitmap, then `capacity` fixed-width
/// key/value pairs. `occupied` marks slots that ever held a pair (tombstone
/// awareness); `readable` marks slots that currently hold a live pair, so
/// `readable[i]` implies `occupied[i]`.
pub struct HashBucketPage<K, V> {
    capacity: usize,
    occupied: Vec<u8>,
    readable: Vec<u8>,
    entries: Vec<(K, V)>,
}

impl<K: IndexKey, V: IndexValue> HashBucketPage<K, V> {
    const ENTRY_SIZE: usize = K::ENCODED_SIZE + V::ENCODED_SIZE;

    /// Largest capacity whose bitmaps and pairs fit in one page
    pub fn max_capacity() -> usize {
        let mut capacity = (PAGE_SIZE * 8) / (8 * Self::ENTRY_SIZE + 2);
        while Self::bytes_needed(capacity) > PAGE_SIZE {
            capacity -= 1;
        }
        capacity
    }

    fn bytes_needed(capacity: usize) -> usize {
        2 * capacity.div_ceil(8) + capacity * Self::ENTRY_SIZE
    }

    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "bucket capacity must be positive");
        assert!(
            Self::bytes_needed(capacity) <= PAGE_SIZE,
            "bucket capacity {} does not fit one page",
            capacity
        );

        let bitmap_len = capacity.div_ceil(8);
        let zeroed_key = vec![0u8; K::ENCODED_SIZE];
        let zeroed_value = vec![0u8; V::ENCODED_SIZE];
        let entries = (0..capacity)
            .map(|_| (K::decode_from(&zeroed_key), V::decode_from(&zeroed_value)))
            .collect();

        Self {
            capacity,
            occupied: vec![0; bitmap_len],
            readable: vec![0; bitmap_len],
            entries,
        }
    }

    pub fn from_page(page: &Page, capacity: usize) -> Self {
        let bitmap_len = capacity.div_ceil(8);
        let occupied = page.data[0..bitmap_len].to_vec();
        let readable = page.data[bitmap_len..2 * bitmap_len].to_vec();

        let mut entries = Vec::with_capacity(capacity);
        let base = 2 * bitmap_len;
        for slot in 0..capacity {
            let at = base + slot * Self::ENTRY_SIZE;
            let key = K::decode_from(&page.data[at..at + K::ENCODED_SIZE]);
            let value = V::decode_from(
                &page.data[at + K::ENCODED_SIZE..at + Self::ENTRY_SIZE],
            );
            entries.push((key, value));
        }

        Self {
            capacity,
            occupied,
            readable,
            entries,
        }
    }

    pub fn write_to(&self, page: &mut Page) {
        let bitmap_len = self.capacity.div_ceil(8);
        page.data[0..bitmap_len].copy_from_slice(&self.occupied);
        page.data[bitmap_len..2 * bitmap_len].copy_from_slice(&self.readable);

        let base = 2 * bitmap_len;
        for (slot, (key, value)) in self.entries.iter().enumerate() {
            let at = base + slot * Self::ENTRY_SIZE;
            key.encode_into(&mut page.data[at..at + K::ENCODED_SIZE]);
            value.encode_into(&mut page.data[at + K::ENCODED_SIZE..at + Self::ENTRY_SIZE]);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn key_at(&self, slot: usize) -> &K {
        &self.entries[slot].0
    }

    pub fn value_at(&self, slot: usize) -> &V {
        &self.entries[slot].1
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        self.occupied[slot / 8] & (1 << (slot % 8)) != 0
    }

    pub fn set_occupied(&mut self, slot: usize) {
        self.occupied[slot / 8] |= 1 << (slot % 8);
    }

    pub fn is_readable(&self, slot: usize) -> bool {
        self.readable[slot / 8] & (1 << (slot % 8)) != 0
    }

    pub fn set_readable(&mut self, slot: usize) {
        self.readable[slot / 8] |= 1 << (slot % 8);
    }

    /// Clear the readable bit, leaving the occupied tombstone in place
    pub fn remove_at(&mut self, slot: usize) {
        self.readable[slot / 8] &= !(1 << (slot % 8));
    }

    /// Write a pair into a slot and mark it live
    pub fn set_pair(&mut self, slot: usize, key: K, value: V) {
        self.entries[slot] = (key, value);
        self.set_occupied(slot);
        self.set_readable(slot);
    }

    /// Insert into the first non-readable slot; the exact pair may appear
    /// only once.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), BucketInsertError> {
        for slot in 0..self.capacity {
            if self.is_readable(slot)
                && *self.key_at(slot) == key
                && *self.value_at(slot) == value
            {
                return Err(BucketInsertError::Duplicate);
            }
        }
        for slot in 0..self.capacity {
            if !self.is_readable(slot) {
                self.set_pair(slot, key, value);
                return Ok(());
            }
        }
        Err(BucketInsertError::Full)
    }

    /// Remove the exact pair; false when it is not present
    pub fn remove(&mut self, key: &K, value: &V) -> bool {
        for slot in 0..self.capacity {
            if self.is_readable(slot)
                && self.key_at(slot) == key
                && self.value_at(slot) == value
            {
                self.remove_at(slot);
                return true;
            }
        }
        false
    }

    /// Every value stored under a key
    pub fn get_value(&self, key: &K) -> Vec<V> {
        (0..self.capacity)
            .filter(|&slot| self.is_readable(slot) && self.key_at(slot) == key)
            .map(|slot| self.value_at(slot).clone())
            .collect()
    }

    pub fn num_readable(&self) -> usize {
        (0..self.capacity).filter(|&slot| self.is_readable(slot)).count()
    }

    pub fn is_full(&self) -> bool {
        self.num_readable() == self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.num_readable() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut bucket: HashBucketPage<i64, i64> = HashBucketPage::new(4);

        bucket.insert(10, 100).unwrap();
        bucket.insert(10, 101).unwrap();
        bucket.insert(20, 200).unwrap();

        let mut values = bucket.get_value(&10);
        values.sort_unstable();
        assert_eq!(values, vec![100, 101]);
        assert_eq!(bucket.get_value(&20), vec![200]);
        assert_eq!(bucket.get_value(&30), Vec::<i64>::new());

        assert!(bucket.remove(&10, &100));
        assert!(!bucket.remove(&10, &100));
        assert_eq!(bucket.get_value(&10), vec![101]);
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let mut bucket: HashBucketPage<i64, i64> = HashBucketPage::new(4);
        bucket.insert(1, 1).unwrap();
        assert_eq!(bucket.insert(1, 1), Err(BucketInsertError::Duplicate));
        // same key, different value is fine
        bucket.insert(1, 2).unwrap();
    }

    #[test]
    fn test_full_bucket() {
        let mut bucket: HashBucketPage<i64, i64> = HashBucketPage::new(2);
        bucket.insert(1, 1).unwrap();
        bucket.insert(2, 2).unwrap();
        assert!(bucket.is_full());
        assert_eq!(bucket.insert(3, 3), Err(BucketInsertError::Full));

        // removal reopens a slot
        assert!(bucket.remove(&1, &1));
        bucket.insert(3, 3).unwrap();
    }

    #[test]
    fn test_tombstones_keep_occupied() {
        let mut bucket: HashBucketPage<i64, i64> = HashBucketPage::new(4);
        bucket.insert(5, 50).unwrap();
        assert!(bucket.is_occupied(0));
        assert!(bucket.is_readable(0));

        bucket.remove_at(0);
        assert!(bucket.is_occupied(0));
        assert!(!bucket.is_readable(0));
        assert!(bucket.is_empty());
    }

    #[test]
    fn test_page_roundtrip() {
        let mut bucket: HashBucketPage<i64, i64> = HashBucketPage::new(8);
        bucket.insert(7, 70).unwrap();
        bucket.insert(8, 80).unwrap();
        bucket.remove(&7, &70);

        let mut page = Page::new(1);
        bucket.write_to(&mut page);
        let decoded: HashBucketPage<i64, i64> = HashBucketPage::from_page(&page, 8);

        assert!(decoded.is_occupied(0));
        assert!(!decoded.is_readable(0));
        assert_eq!(decoded.get_value(&8), vec![80]);
        assert_eq!(decoded.num_readable(), 1);
    }

    #[test]
    fn test_max_capacity_fits_page() {
        let capacity = HashBucketPage::<i64, i64>::max_capacity();
        assert!(capacity > 0);
        assert!(HashBucketPage::<i64, i64>::bytes_needed(capacity) <= PAGE_SIZE);
        assert!(HashBucketPage::<i64, i64>::bytes_needed(capacity + 1) > PAGE_SIZE);
    }
}
