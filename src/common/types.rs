use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Page ID type
pub type PageId = u32;

/// Sentinel for "no page"
pub const INVALID_PAGE_ID: PageId = PageId::MAX;

/// Buffer pool frame ID type
pub type FrameId = u32;

/// Transaction ID type; smaller ids belong to older transactions
pub type TxnId = u32;

/// LSN (Log Sequence Number) type, carried in page headers
pub type Lsn = u32;

/// Record ID: a page and a slot within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rid {
    pub page_id: PageId,
    pub slot: u32,
}

impl Rid {
    pub const INVALID: Rid = Rid {
        page_id: INVALID_PAGE_ID,
        slot: u32::MAX,
    };

    pub fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }
}

/// Page structure
#[derive(Debug, Clone)]
pub struct Page {
    pub data: [u8; PAGE_SIZE],
    pub page_id: PageId,
    pub lsn: Lsn,
}

impl Page {
    pub fn new(page_id: PageId) -> Self {
        Self {
            data: [0; PAGE_SIZE],
            page_id,
            lsn: 0,
        }
    }

    /// Zero the payload and rebind the page to a new id
    pub fn reset(&mut self, page_id: PageId) {
        self.data = [0; PAGE_SIZE];
        self.page_id = page_id;
        self.lsn = 0;
    }
}

/// Smart pointer to a page
pub type PagePtr = Arc<RwLock<Page>>;

/// Buffer pool frame structure
#[derive(Debug)]
pub struct Frame {
    pub page: PagePtr,
    pub is_dirty: bool,
    pub pin_count: u32,
}

impl Frame {
    pub fn new(page: PagePtr) -> Self {
        Self {
            page,
            is_dirty: false,
            pin_count: 0,
        }
    }
}
