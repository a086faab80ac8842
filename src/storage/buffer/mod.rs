pub mod error;
pub mod manager;
pub mod parallel;
pub mod replacer;

pub use error::BufferPoolError;
pub use manager::BufferPoolManager;
pub use parallel::ParallelBufferPoolManager;

use crate::common::types::{PageId, PagePtr};

/// The pool interface consumed by storage clients (heap, index, executors).
///
/// Both the single-instance and the sharded pool implement it, so clients
/// hold an `Arc<dyn BufferPool>` and never name a concrete pool type.
pub trait BufferPool: Send + Sync {
    fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError>;
    fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError>;
    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool;
    fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError>;
    fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError>;
    fn flush_all_pages(&self) -> Result<(), BufferPoolError>;
    fn pool_size(&self) -> usize;
}

impl BufferPool for BufferPoolManager {
    fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        BufferPoolManager::new_page(self)
    }

    fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        BufferPoolManager::fetch_page(self, page_id)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        BufferPoolManager::unpin_page(self, page_id, is_dirty)
    }

    fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        BufferPoolManager::flush_page(self, page_id)
    }

    fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        BufferPoolManager::delete_page(self, page_id)
    }

    fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        BufferPoolManager::flush_all_pages(self)
    }

    fn pool_size(&self) -> usize {
        BufferPoolManager::pool_size(self)
    }
}

impl BufferPool for ParallelBufferPoolManager {
    fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        ParallelBufferPoolManager::new_page(self)
    }

    fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        ParallelBufferPoolManager::fetch_page(self, page_id)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        ParallelBufferPoolManager::unpin_page(self, page_id, is_dirty)
    }

    fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        ParallelBufferPoolManager::flush_page(self, page_id)
    }

    fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        ParallelBufferPoolManager::delete_page(self, page_id)
    }

    fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        ParallelBufferPoolManager::flush_all_pages(self)
    }

    fn pool_size(&self) -> usize {
        ParallelBufferPoolManager::pool_size(self)
    }
}
