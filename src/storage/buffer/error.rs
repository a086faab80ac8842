use thiserror::Error;

use crate::common::types::PageId;
use crate::storage::disk::DiskManagerError;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("No evictable frame: all {0} frames are pinned")]
    NoEvictableFrame(usize),

    #[error("Page {0} is pinned")]
    PagePinned(PageId),

    #[error("Invalid page ID")]
    InvalidPageId,

    #[error("Disk manager error: {0}")]
    Disk(#[from] DiskManagerError),
}
