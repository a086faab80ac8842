use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use log::{debug, warn};
use parking_lot::Mutex;

use crate::common::types::{Frame, FrameId, Page, PageId, PagePtr, INVALID_PAGE_ID};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::replacer::LruReplacer;
use crate::storage::disk::DiskManager;

/// A single buffer pool instance.
///
/// All bookkeeping (frame metadata, page table, free list, replacer, page id
/// allocation) lives behind one mutex. The mutex is never held across a wait;
/// callers take page-level latches only after the pool call returns.
///
/// When used as a shard of a parallel pool, `next_page_id` starts at the
/// shard index and steps by the shard count, so allocated ids route back to
/// this instance under `page_id % num_instances`.
pub struct BufferPoolManager {
    pool_size: usize,
    num_instances: u32,
    instance_index: u32,
    disk_manager: Arc<DiskManager>,
    inner: Mutex<PoolInner>,
}

struct PoolInner {
    frames: Vec<Frame>,
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    replacer: LruReplacer,
    next_page_id: PageId,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        Self::new_shard(pool_size, 1, 0, disk_manager)
    }

    pub fn new_shard(
        pool_size: usize,
        num_instances: u32,
        instance_index: u32,
        disk_manager: Arc<DiskManager>,
    ) -> Self {
        assert!(num_instances > 0, "a pool needs at least one instance");
        assert!(
            instance_index < num_instances,
            "shard index {} out of range for {} instances",
            instance_index,
            num_instances
        );

        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        for i in 0..pool_size {
            frames.push(Frame::new(Arc::new(parking_lot::RwLock::new(Page::new(
                INVALID_PAGE_ID,
            )))));
            free_list.push_back(i as FrameId);
        }

        Self {
            pool_size,
            num_instances,
            instance_index,
            disk_manager,
            inner: Mutex::new(PoolInner {
                frames,
                page_table: HashMap::new(),
                free_list,
                replacer: LruReplacer::new(pool_size),
                next_page_id: instance_index,
            }),
        }
    }

    /// Allocate a frame and a fresh page id; the page comes back zeroed and
    /// pinned once. Fails with `NoEvictableFrame` when every frame is pinned.
    pub fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        let mut inner = self.inner.lock();
        let frame_id = self.acquire_frame(&mut inner)?;

        let page_id = inner.next_page_id;
        inner.next_page_id += self.num_instances;

        let page_ptr = {
            let frame = &mut inner.frames[frame_id as usize];
            frame.page.write().reset(page_id);
            frame.pin_count = 1;
            frame.is_dirty = false;
            frame.page.clone()
        };
        inner.page_table.insert(page_id, frame_id);

        Ok((page_ptr, page_id))
    }

    /// Fetch a page, reading it from disk if it is not resident
    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId);
        }

        let mut inner = self.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let page_ptr = {
                let frame = &mut inner.frames[frame_id as usize];
                frame.pin_count += 1;
                frame.page.clone()
            };
            inner.replacer.pin(frame_id);
            return Ok(page_ptr);
        }

        let frame_id = self.acquire_frame(&mut inner)?;
        let read_result = {
            let frame = &inner.frames[frame_id as usize];
            let mut page = frame.page.write();
            page.reset(page_id);
            self.disk_manager.read_page(page_id, &mut page)
        };
        if let Err(e) = read_result {
            inner.free_list.push_back(frame_id);
            return Err(e.into());
        }

        let page_ptr = {
            let frame = &mut inner.frames[frame_id as usize];
            frame.pin_count = 1;
            frame.is_dirty = false;
            frame.page.clone()
        };
        inner.page_table.insert(page_id, frame_id);

        Ok(page_ptr)
    }

    /// Drop one pin. The dirty flag OR-accumulates; the frame becomes
    /// evictable when its pin count reaches zero. Absent pages are a no-op.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut inner = self.inner.lock();
        let frame_id = match inner.page_table.get(&page_id) {
            Some(&id) => id,
            None => return false,
        };

        let pin_count_after = {
            let frame = &mut inner.frames[frame_id as usize];
            frame.is_dirty |= is_dirty;
            if frame.pin_count == 0 {
                warn!("unpin of page {} with zero pin count", page_id);
                return true;
            }
            frame.pin_count -= 1;
            frame.pin_count
        };

        if pin_count_after == 0 {
            inner.replacer.unpin(frame_id);
        }
        true
    }

    /// Write a resident page through to disk. The in-memory dirty bit is left
    /// as-is; the contract is only that disk matches memory at return.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let inner = self.inner.lock();
        let frame_id = match inner.page_table.get(&page_id) {
            Some(&id) => id,
            None => return Ok(false),
        };

        let page = inner.frames[frame_id as usize].page.read();
        self.disk_manager.write_page(&page)?;
        Ok(true)
    }

    /// Flush every resident page
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let page_ids: Vec<PageId> = self.inner.lock().page_table.keys().copied().collect();
        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Drop a page from the pool and release its id. Deleting a page that is
    /// not resident succeeds; deleting a pinned page fails.
    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let mut inner = self.inner.lock();
        let frame_id = match inner.page_table.get(&page_id) {
            Some(&id) => id,
            None => {
                self.disk_manager.deallocate_page(page_id);
                return Ok(());
            }
        };

        {
            let frame = &mut inner.frames[frame_id as usize];
            if frame.pin_count > 0 {
                return Err(BufferPoolError::PagePinned(page_id));
            }
            frame.page.write().reset(INVALID_PAGE_ID);
            frame.is_dirty = false;
        }

        inner.page_table.remove(&page_id);
        inner.replacer.pin(frame_id);
        inner.free_list.push_back(frame_id);
        self.disk_manager.deallocate_page(page_id);

        Ok(())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Pick a frame to hold a page: free list first, then the replacer.
    /// Evicting a dirty victim writes it back before the frame is reused.
    fn acquire_frame(&self, inner: &mut PoolInner) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        let victim = inner
            .replacer
            .victim()
            .ok_or(BufferPoolError::NoEvictableFrame(self.pool_size))?;

        let old_page_id = {
            let frame = &inner.frames[victim as usize];
            debug_assert_eq!(frame.pin_count, 0, "replacer handed out a pinned frame");
            let page = frame.page.read();
            if frame.is_dirty {
                debug!("evicting dirty page {}, writing back", page.page_id);
                self.disk_manager.write_page(&page)?;
            }
            page.page_id
        };
        inner.frames[victim as usize].is_dirty = false;

        if old_page_id != INVALID_PAGE_ID {
            inner.page_table.remove(&old_page_id);
        }

        Ok(victim)
    }
}
