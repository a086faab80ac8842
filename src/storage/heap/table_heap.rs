use std::sync::Arc;
use anyhow::Result;
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::{PageId, PagePtr, Rid, INVALID_PAGE_ID};
use crate::storage::buffer::{BufferPool, BufferPoolError};
use crate::storage::page::{PageError, PageManager};

#[derive(Error, Debug)]
pub enum HeapError {
    #[error("Buffer pool error: {0}")]
    BufferPool(#[from] BufferPoolError),
    #[error("Page error: {0}")]
    Page(#[from] PageError),
}

/// A heap of tuples stored in a doubly linked chain of slotted pages.
///
/// Tuples are addressed by `Rid { page_id, slot }`; deletes tombstone the
/// slot so rids stay stable. Inserts walk the chain and append a page when
/// no page has room.
pub struct TableHeap {
    buffer_pool: Arc<dyn BufferPool>,
    page_manager: PageManager,
    first_page_id: PageId,
    append_latch: Mutex<()>,
}

impl TableHeap {
    pub fn new(buffer_pool: Arc<dyn BufferPool>) -> Result<Self, HeapError> {
        let page_manager = PageManager::new();
        let (page_ptr, first_page_id) = buffer_pool.new_page()?;
        {
            let mut page = page_ptr.write();
            page_manager.init_page(&mut page);
        }
        buffer_pool.unpin_page(first_page_id, true);

        Ok(Self {
            buffer_pool,
            page_manager,
            first_page_id,
            append_latch: Mutex::new(()),
        })
    }

    pub fn first_page_id(&self) -> PageId {
        self.first_page_id
    }

    /// Insert a tuple, extending the page chain when every page is full
    pub fn insert_tuple(&self, data: &[u8]) -> Result<Rid, HeapError> {
        let _guard = self.append_latch.lock();

        let mut page_id = self.first_page_id;
        loop {
            let page_ptr = self.buffer_pool.fetch_page(page_id)?;
            let inserted = {
                let mut page = page_ptr.write();
                self.page_manager.insert_record(&mut page, data)
            };

            match inserted {
                Ok(slot) => {
                    self.buffer_pool.unpin_page(page_id, true);
                    return Ok(Rid::new(page_id, slot));
                }
                Err(PageError::InsufficientSpace) => {
                    let next = {
                        let page = page_ptr.read();
                        self.page_manager.get_header(&page).next_page_id
                    };
                    if next != INVALID_PAGE_ID {
                        self.buffer_pool.unpin_page(page_id, false);
                        page_id = next;
                        continue;
                    }
                    return self.append_page_and_insert(page_id, &page_ptr, data);
                }
                Err(e) => {
                    self.buffer_pool.unpin_page(page_id, false);
                    return Err(e.into());
                }
            }
        }
    }

    /// Read the tuple at a rid; deleted or unknown slots are an error
    pub fn get_tuple(&self, rid: Rid) -> Result<Vec<u8>, HeapError> {
        let page_ptr = self.buffer_pool.fetch_page(rid.page_id)?;
        let record = {
            let page = page_ptr.read();
            self.page_manager.record_at(&page, rid.slot)
        };
        self.buffer_pool.unpin_page(rid.page_id, false);

        match record? {
            Some(data) => Ok(data),
            None => Err(PageError::RecordNotFound.into()),
        }
    }

    /// Overwrite the tuple at a rid, keeping the rid stable
    pub fn update_tuple(&self, rid: Rid, data: &[u8]) -> Result<(), HeapError> {
        let page_ptr = self.buffer_pool.fetch_page(rid.page_id)?;
        let updated = {
            let mut page = page_ptr.write();
            self.page_manager.update_record(&mut page, rid.slot, data)
        };
        self.buffer_pool.unpin_page(rid.page_id, updated.is_ok());
        updated.map_err(Into::into)
    }

    /// Tombstone the tuple at a rid
    pub fn delete_tuple(&self, rid: Rid) -> Result<(), HeapError> {
        let page_ptr = self.buffer_pool.fetch_page(rid.page_id)?;
        let deleted = {
            let mut page = page_ptr.write();
            self.page_manager.delete_record(&mut page, rid.slot)
        };
        self.buffer_pool.unpin_page(rid.page_id, deleted.is_ok());
        deleted.map_err(Into::into)
    }

    pub fn iter(&self) -> TableIterator {
        TableIterator {
            buffer_pool: self.buffer_pool.clone(),
            page_manager: PageManager::new(),
            current_page_id: self.first_page_id,
            current_slot: 0,
        }
    }

    fn append_page_and_insert(
        &self,
        tail_page_id: PageId,
        tail_ptr: &PagePtr,
        data: &[u8],
    ) -> Result<Rid, HeapError> {
        let (new_ptr, new_page_id) = match self.buffer_pool.new_page() {
            Ok(result) => result,
            Err(e) => {
                self.buffer_pool.unpin_page(tail_page_id, false);
                return Err(e.into());
            }
        };

        {
            let mut new_page = new_ptr.write();
            self.page_manager.init_page(&mut new_page);
            let mut header = self.page_manager.get_header(&new_page);
            header.prev_page_id = tail_page_id;
            self.page_manager.put_header(&mut new_page, header);
        }
        {
            let mut tail = tail_ptr.write();
            let mut header = self.page_manager.get_header(&tail);
            header.next_page_id = new_page_id;
            self.page_manager.put_header(&mut tail, header);
        }
        self.buffer_pool.unpin_page(tail_page_id, true);

        let inserted = {
            let mut new_page = new_ptr.write();
            self.page_manager.insert_record(&mut new_page, data)
        };
        self.buffer_pool.unpin_page(new_page_id, true);

        Ok(Rid::new(new_page_id, inserted?))
    }
}

enum ScanStep {
    Found(Rid, Vec<u8>),
    NextPage(PageId),
}

/// Pull iterator over the live tuples of a heap, in chain order
pub struct TableIterator {
    buffer_pool: Arc<dyn BufferPool>,
    page_manager: PageManager,
    current_page_id: PageId,
    current_slot: u32,
}

impl TableIterator {
    pub fn next_tuple(&mut self) -> Result<Option<(Rid, Vec<u8>)>, HeapError> {
        loop {
            if self.current_page_id == INVALID_PAGE_ID {
                return Ok(None);
            }

            let page_id = self.current_page_id;
            let page_ptr = self.buffer_pool.fetch_page(page_id)?;
            let step = {
                let page = page_ptr.read();
                let header = self.page_manager.get_header(&page);
                let mut step = ScanStep::NextPage(header.next_page_id);
                while self.current_slot < header.slot_count {
                    let slot = self.current_slot;
                    self.current_slot += 1;
                    if let Some(data) = self.page_manager.record_at(&page, slot)? {
                        step = ScanStep::Found(Rid::new(page_id, slot), data);
                        break;
                    }
                }
                step
            };
            self.buffer_pool.unpin_page(page_id, false);

            match step {
                ScanStep::Found(rid, data) => return Ok(Some((rid, data))),
                ScanStep::NextPage(next) => {
                    self.current_page_id = next;
                    self.current_slot = 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::buffer::BufferPoolManager;
    use crate::storage::disk::DiskManager;
    use tempfile::NamedTempFile;

    fn test_heap(pool_size: usize) -> (TableHeap, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let disk = Arc::new(DiskManager::new(file.path()).unwrap());
        let pool: Arc<dyn BufferPool> = Arc::new(BufferPoolManager::new(pool_size, disk));
        (TableHeap::new(pool).unwrap(), file)
    }

    #[test]
    fn test_insert_get_roundtrip() {
        let (heap, _file) = test_heap(8);
        let rid = heap.insert_tuple(b"hello heap").unwrap();
        assert_eq!(heap.get_tuple(rid).unwrap(), b"hello heap");
    }

    #[test]
    fn test_insert_spans_pages() {
        let (heap, _file) = test_heap(8);
        let payload = vec![1u8; 600];

        let mut rids = Vec::new();
        for _ in 0..40 {
            rids.push(heap.insert_tuple(&payload).unwrap());
        }
        // 600-byte tuples cannot all fit one 4KB page
        assert!(rids.iter().any(|rid| rid.page_id != rids[0].page_id));

        let mut iter = heap.iter();
        let mut seen = 0;
        while let Some((_, data)) = iter.next_tuple().unwrap() {
            assert_eq!(data, payload);
            seen += 1;
        }
        assert_eq!(seen, 40);
    }

    #[test]
    fn test_delete_then_iterate_skips() {
        let (heap, _file) = test_heap(8);
        let a = heap.insert_tuple(b"a").unwrap();
        let b = heap.insert_tuple(b"b").unwrap();
        let c = heap.insert_tuple(b"c").unwrap();

        heap.delete_tuple(b).unwrap();
        assert!(heap.get_tuple(b).is_err());

        let mut iter = heap.iter();
        let mut rids = Vec::new();
        while let Some((rid, _)) = iter.next_tuple().unwrap() {
            rids.push(rid);
        }
        assert_eq!(rids, vec![a, c]);
    }

    #[test]
    fn test_update_keeps_rid() {
        let (heap, _file) = test_heap(8);
        let rid = heap.insert_tuple(b"before").unwrap();
        heap.update_tuple(rid, b"after with a longer payload").unwrap();
        assert_eq!(heap.get_tuple(rid).unwrap(), b"after with a longer payload");
    }
}
