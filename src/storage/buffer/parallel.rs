use std::sync::Arc;
use parking_lot::Mutex;

use crate::common::types::{PageId, PagePtr};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::manager::BufferPoolManager;
use crate::storage::disk::DiskManager;

/// A buffer pool sharded over several instances.
///
/// Page ids partition by `page_id % num_instances`, so every operation on an
/// existing page routes straight to its owning shard. Allocation rotates:
/// `new_page` starts at `start_index`, falls through to the next shard when
/// one is full, and bumps `start_index` on every call, win or lose.
pub struct ParallelBufferPoolManager {
    instances: Vec<Arc<BufferPoolManager>>,
    start_index: Mutex<usize>,
    pool_size: usize,
}

impl ParallelBufferPoolManager {
    pub fn new(
        num_instances: usize,
        instance_pool_size: usize,
        disk_manager: Arc<DiskManager>,
    ) -> Self {
        assert!(num_instances > 0, "a parallel pool needs at least one shard");

        let instances = (0..num_instances)
            .map(|i| {
                Arc::new(BufferPoolManager::new_shard(
                    instance_pool_size,
                    num_instances as u32,
                    i as u32,
                    disk_manager.clone(),
                ))
            })
            .collect();

        Self {
            instances,
            start_index: Mutex::new(0),
            pool_size: num_instances * instance_pool_size,
        }
    }

    /// The shard responsible for a page id
    fn instance_for(&self, page_id: PageId) -> &BufferPoolManager {
        &self.instances[page_id as usize % self.instances.len()]
    }

    pub fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        let num = self.instances.len();
        let start = {
            let mut index = self.start_index.lock();
            let current = *index;
            *index = (current + 1) % num;
            current
        };

        for offset in 0..num {
            match self.instances[(start + offset) % num].new_page() {
                Ok(result) => return Ok(result),
                Err(BufferPoolError::NoEvictableFrame(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(BufferPoolError::NoEvictableFrame(self.pool_size))
    }

    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        self.instance_for(page_id).fetch_page(page_id)
    }

    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.instance_for(page_id).unpin_page(page_id, is_dirty)
    }

    pub fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        self.instance_for(page_id).flush_page(page_id)
    }

    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        self.instance_for(page_id).delete_page(page_id)
    }

    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        for instance in &self.instances {
            instance.flush_all_pages()?;
        }
        Ok(())
    }

    /// Total frames across all shards
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }
}
