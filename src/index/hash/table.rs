use std::marker::PhantomData;
use std::sync::Arc;
use anyhow::Result;
use log::debug;
use parking_lot::RwLock;

use crate::common::types::{PageId, PagePtr};
use crate::index::hash::bucket::{BucketInsertError, HashBucketPage};
use crate::index::hash::directory::{HashDirectoryPage, MAX_GLOBAL_DEPTH};
use crate::index::hash::error::HashTableError;
use crate::index::hash::key::{IndexKey, IndexValue};
use crate::storage::buffer::BufferPool;

/// Construction knobs. Tests shrink both to force splits and directory
/// exhaustion with a handful of keys.
#[derive(Debug, Clone, Copy)]
pub struct HashTableOptions {
    /// Pairs per bucket page; defaults to the most that fit one page
    pub bucket_capacity: Option<usize>,
    /// Cap on the global depth, at most `MAX_GLOBAL_DEPTH`
    pub max_depth: u32,
}

impl Default for HashTableOptions {
    fn default() -> Self {
        Self {
            bucket_capacity: None,
            max_depth: MAX_GLOBAL_DEPTH,
        }
    }
}

/// A disk-backed extendible hash table.
///
/// The table owns a directory page id; the pages themselves live in the
/// buffer pool, passed in as an explicit handle. A single reader-writer
/// latch covers the table: lookups take the read side, anything structural
/// takes the write side. Page fetches below it synchronize through the
/// buffer pool's own mutex.
pub struct ExtendibleHashTable<K: IndexKey, V: IndexValue> {
    buffer_pool: Arc<dyn BufferPool>,
    directory_page_id: PageId,
    bucket_capacity: usize,
    max_depth: u32,
    table_latch: RwLock<()>,
    _marker: PhantomData<(K, V)>,
}

impl<K: IndexKey, V: IndexValue> ExtendibleHashTable<K, V> {
    pub fn new(buffer_pool: Arc<dyn BufferPool>) -> Result<Self, HashTableError> {
        Self::with_options(buffer_pool, HashTableOptions::default())
    }

    /// Create an empty table: depth-zero directory pointing at one bucket
    pub fn with_options(
        buffer_pool: Arc<dyn BufferPool>,
        options: HashTableOptions,
    ) -> Result<Self, HashTableError> {
        assert!(
            options.max_depth <= MAX_GLOBAL_DEPTH,
            "max_depth {} exceeds the directory array",
            options.max_depth
        );
        let bucket_capacity = options
            .bucket_capacity
            .unwrap_or_else(HashBucketPage::<K, V>::max_capacity);

        let (directory_ptr, directory_page_id) = buffer_pool.new_page()?;
        let (bucket_ptr, bucket_page_id) = buffer_pool.new_page()?;

        let mut directory = HashDirectoryPage::new(directory_page_id);
        directory.set_bucket_page_id(0, bucket_page_id);
        directory.write_to(&mut directory_ptr.write());
        HashBucketPage::<K, V>::new(bucket_capacity).write_to(&mut bucket_ptr.write());

        buffer_pool.unpin_page(directory_page_id, true);
        buffer_pool.unpin_page(bucket_page_id, true);

        Ok(Self {
            buffer_pool,
            directory_page_id,
            bucket_capacity,
            max_depth: options.max_depth,
            table_latch: RwLock::new(()),
            _marker: PhantomData,
        })
    }

    pub fn directory_page_id(&self) -> PageId {
        self.directory_page_id
    }

    /// All values stored under a key
    pub fn get_value(&self, key: &K) -> Result<Vec<V>, HashTableError> {
        let _guard = self.table_latch.read();

        let directory = self.load_directory()?;
        let index = Self::directory_index(&directory, key);
        let bucket_page_id = directory.bucket_page_id(index);

        let bucket_ptr = self.buffer_pool.fetch_page(bucket_page_id)?;
        let values = {
            let page = bucket_ptr.read();
            HashBucketPage::<K, V>::from_page(&page, self.bucket_capacity).get_value(key)
        };
        self.buffer_pool.unpin_page(bucket_page_id, false);

        Ok(values)
    }

    /// Insert a pair, splitting buckets (and growing the directory) until it
    /// fits. The exact pair may be stored only once.
    pub fn insert(&self, key: &K, value: &V) -> Result<(), HashTableError> {
        let _guard = self.table_latch.write();

        loop {
            let directory = self.load_directory()?;
            let index = Self::directory_index(&directory, key);
            let bucket_page_id = directory.bucket_page_id(index);

            let bucket_ptr = self.buffer_pool.fetch_page(bucket_page_id)?;
            let mut bucket = {
                let page = bucket_ptr.read();
                HashBucketPage::<K, V>::from_page(&page, self.bucket_capacity)
            };

            match bucket.insert(key.clone(), value.clone()) {
                Ok(()) => {
                    bucket.write_to(&mut bucket_ptr.write());
                    self.buffer_pool.unpin_page(bucket_page_id, true);
                    return Ok(());
                }
                Err(BucketInsertError::Duplicate) => {
                    self.buffer_pool.unpin_page(bucket_page_id, false);
                    return Err(HashTableError::DuplicateEntry);
                }
                Err(BucketInsertError::Full) => {
                    self.buffer_pool.unpin_page(bucket_page_id, false);
                    self.split(key)?;
                    // retry; several splits may be needed before the key's
                    // bucket has room
                }
            }
        }
    }

    /// Remove the exact pair; an emptied bucket triggers a merge
    pub fn remove(&self, key: &K, value: &V) -> Result<bool, HashTableError> {
        let _guard = self.table_latch.write();

        let directory = self.load_directory()?;
        let index = Self::directory_index(&directory, key);
        let bucket_page_id = directory.bucket_page_id(index);

        let bucket_ptr = self.buffer_pool.fetch_page(bucket_page_id)?;
        let mut bucket = {
            let page = bucket_ptr.read();
            HashBucketPage::<K, V>::from_page(&page, self.bucket_capacity)
        };

        if !bucket.remove(key, value) {
            self.buffer_pool.unpin_page(bucket_page_id, false);
            return Ok(false);
        }

        let now_empty = bucket.is_empty();
        bucket.write_to(&mut bucket_ptr.write());
        self.buffer_pool.unpin_page(bucket_page_id, true);

        if now_empty {
            debug!("bucket page {} emptied, merging", bucket_page_id);
            self.merge(key)?;
        }

        Ok(true)
    }

    /// Current global depth, for tests and introspection
    pub fn global_depth(&self) -> Result<u32, HashTableError> {
        let _guard = self.table_latch.read();
        Ok(self.load_directory()?.global_depth())
    }

    /// Assert the directory invariants
    pub fn verify_integrity(&self) -> Result<(), HashTableError> {
        let _guard = self.table_latch.read();
        self.load_directory()?.verify_integrity();
        Ok(())
    }

    fn hash32(key: &K) -> u32 {
        key.hash64() as u32
    }

    fn directory_index(directory: &HashDirectoryPage, key: &K) -> usize {
        (Self::hash32(key) & directory.global_depth_mask()) as usize
    }

    /// Fetch and decode the directory, dropping the pin immediately. Callers
    /// hold the table latch, so the decoded copy cannot go stale.
    fn load_directory(&self) -> Result<HashDirectoryPage, HashTableError> {
        let directory_ptr = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let directory = {
            let page = directory_ptr.read();
            HashDirectoryPage::from_page(&page)
        };
        self.buffer_pool.unpin_page(self.directory_page_id, false);
        Ok(directory)
    }

    fn fetch_bucket(
        &self,
        bucket_page_id: PageId,
    ) -> Result<(PagePtr, HashBucketPage<K, V>), HashTableError> {
        let bucket_ptr = self.buffer_pool.fetch_page(bucket_page_id)?;
        let bucket = {
            let page = bucket_ptr.read();
            HashBucketPage::<K, V>::from_page(&page, self.bucket_capacity)
        };
        Ok((bucket_ptr, bucket))
    }

    /// Split the bucket the key routes to. The original bucket keeps the
    /// keys whose bit `local_depth` matches the routing slot; its split
    /// image takes the complementary half, copied slot-for-slot.
    fn split(&self, key: &K) -> Result<(), HashTableError> {
        let directory_ptr = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let mut directory = {
            let page = directory_ptr.read();
            HashDirectoryPage::from_page(&page)
        };

        let kti = Self::directory_index(&directory, key);
        if directory.local_depth(kti) == directory.global_depth() {
            if directory.global_depth() >= self.max_depth {
                self.buffer_pool.unpin_page(self.directory_page_id, false);
                return Err(HashTableError::DirectoryFull);
            }
            directory.incr_global_depth();
        }

        let old_page_id = directory.bucket_page_id(kti);
        let (old_ptr, mut old_bucket) = self.fetch_bucket(old_page_id)?;

        let (new_ptr, new_page_id) = self.buffer_pool.new_page()?;
        let mut new_bucket = HashBucketPage::<K, V>::new(self.bucket_capacity);

        // Raise the depth of every slot sharing the bucket and point the
        // half that disagrees with `kti` in bit `local_depth` at the new one.
        let local_depth = directory.local_depth(kti) as usize;
        let stride = 1usize << local_depth;
        let mut slot = kti & (stride - 1);
        while slot < directory.size() {
            directory.incr_local_depth(slot);
            if ((slot >> local_depth) & 1) != ((kti >> local_depth) & 1) {
                directory.set_bucket_page_id(slot, new_page_id);
            }
            slot += stride;
        }

        // Rehash: pairs now routing to the image move, keeping their slot
        let mask = directory.global_depth_mask();
        for slot in 0..self.bucket_capacity {
            if !old_bucket.is_readable(slot) {
                continue;
            }
            let pair_key = old_bucket.key_at(slot).clone();
            let target = (Self::hash32(&pair_key) & mask) as usize;
            if directory.bucket_page_id(target) == new_page_id {
                let pair_value = old_bucket.value_at(slot).clone();
                new_bucket.set_pair(slot, pair_key, pair_value);
                old_bucket.remove_at(slot);
            }
        }

        debug!(
            "split bucket {} into {} at local depth {}",
            old_page_id,
            new_page_id,
            local_depth + 1
        );

        old_bucket.write_to(&mut old_ptr.write());
        new_bucket.write_to(&mut new_ptr.write());
        directory.write_to(&mut directory_ptr.write());
        self.buffer_pool.unpin_page(old_page_id, true);
        self.buffer_pool.unpin_page(new_page_id, true);
        self.buffer_pool.unpin_page(self.directory_page_id, true);

        Ok(())
    }

    /// Collapse the emptied bucket the key routes to into its split image,
    /// then shrink the directory to the fixpoint, re-checking every bucket
    /// that is empty at the smaller depth.
    fn merge(&self, key: &K) -> Result<(), HashTableError> {
        let directory_ptr = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let mut directory = {
            let page = directory_ptr.read();
            HashDirectoryPage::from_page(&page)
        };

        let kti = Self::directory_index(&directory, key);
        let mut dirty = self.try_merge_at(&mut directory, kti)?;

        loop {
            let mut changed = false;
            while directory.can_shrink() {
                directory.decr_global_depth();
                changed = true;
            }
            for slot in 0..directory.size() {
                if directory.local_depth(slot) == 0 {
                    continue;
                }
                if self.bucket_is_empty(directory.bucket_page_id(slot))?
                    && self.try_merge_at(&mut directory, slot)?
                {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            dirty = true;
        }

        if dirty {
            directory.write_to(&mut directory_ptr.write());
        }
        self.buffer_pool.unpin_page(self.directory_page_id, dirty);
        Ok(())
    }

    /// Merge the bucket at `kti` into its split image when legal: local
    /// depth above zero, both sides at the same depth, distinct pages.
    fn try_merge_at(
        &self,
        directory: &mut HashDirectoryPage,
        kti: usize,
    ) -> Result<bool, HashTableError> {
        let local_depth = directory.local_depth(kti);
        if local_depth == 0 {
            return Ok(false);
        }
        let image = directory.split_image_index(kti);
        if directory.local_depth(image) != local_depth {
            return Ok(false);
        }

        let old_page_id = directory.bucket_page_id(kti);
        let image_page_id = directory.bucket_page_id(image);
        if old_page_id == image_page_id {
            return Ok(false);
        }

        // Every slot congruent to kti at the shallower depth drops a level;
        // those still pointing at the emptied bucket retarget to the image.
        let new_depth = local_depth - 1;
        let stride = 1usize << new_depth;
        let mut slot = kti & (stride - 1);
        while slot < directory.size() {
            if directory.bucket_page_id(slot) == old_page_id {
                directory.set_bucket_page_id(slot, image_page_id);
            }
            directory.set_local_depth(slot, new_depth);
            slot += stride;
        }

        debug!("merged bucket {} into {}", old_page_id, image_page_id);
        self.buffer_pool.delete_page(old_page_id)?;
        Ok(true)
    }

    fn bucket_is_empty(&self, bucket_page_id: PageId) -> Result<bool, HashTableError> {
        let (_, bucket) = self.fetch_bucket(bucket_page_id)?;
        self.buffer_pool.unpin_page(bucket_page_id, false);
        Ok(bucket.is_empty())
    }
}
