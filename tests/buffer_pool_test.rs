use anyhow::Result;
use std::sync::Arc;

use corundb::storage::buffer::{BufferPoolError, BufferPoolManager};
use corundb::storage::disk::DiskManager;

mod common;
use common::create_test_buffer_pool;

#[test]
fn test_new_page() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(10)?;

    let (page, page_id) = buffer_pool.new_page()?;
    {
        let page_guard = page.read();
        assert_eq!(page_guard.page_id, page_id);
        assert!(page_guard.data.iter().all(|&b| b == 0));
    }

    assert!(buffer_pool.unpin_page(page_id, false));
    Ok(())
}

#[test]
fn test_fetch_page() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(10)?;

    let (_, page_id) = buffer_pool.new_page()?;
    buffer_pool.unpin_page(page_id, false);

    let fetched = buffer_pool.fetch_page(page_id)?;
    assert_eq!(fetched.read().page_id, page_id);
    buffer_pool.unpin_page(page_id, false);

    Ok(())
}

#[test]
fn test_page_modification_persists() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(10)?;

    let (page, page_id) = buffer_pool.new_page()?;
    {
        let mut page_guard = page.write();
        page_guard.data[100..109].copy_from_slice(b"Test Data");
    }
    buffer_pool.unpin_page(page_id, true);

    let fetched = buffer_pool.fetch_page(page_id)?;
    assert_eq!(&fetched.read().data[100..109], b"Test Data");
    buffer_pool.unpin_page(page_id, false);

    Ok(())
}

// Pool of two frames: writing P1, then allocating P2 and P3 must evict P1 to
// disk; fetching P1 again returns the same bytes.
#[test]
fn test_eviction_writes_back_dirty_page() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(2)?;

    let (page1, page1_id) = buffer_pool.new_page()?;
    {
        let mut page_guard = page1.write();
        page_guard.data[0..13].copy_from_slice(b"evicted bytes");
    }
    buffer_pool.unpin_page(page1_id, true);

    let (_, page2_id) = buffer_pool.new_page()?;
    buffer_pool.unpin_page(page2_id, false);
    let (_, page3_id) = buffer_pool.new_page()?;
    buffer_pool.unpin_page(page3_id, false);

    let fetched = buffer_pool.fetch_page(page1_id)?;
    assert_eq!(&fetched.read().data[0..13], b"evicted bytes");
    buffer_pool.unpin_page(page1_id, false);

    Ok(())
}

#[test]
fn test_no_evictable_frame_when_all_pinned() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(3)?;

    let mut page_ids = Vec::new();
    for _ in 0..3 {
        let (_, page_id) = buffer_pool.new_page()?;
        page_ids.push(page_id); // keep pinned
    }

    match buffer_pool.new_page() {
        Err(BufferPoolError::NoEvictableFrame(size)) => assert_eq!(size, 3),
        other => panic!("expected NoEvictableFrame, got {:?}", other.map(|(_, id)| id)),
    }

    // unpinning one frame makes allocation possible again
    buffer_pool.unpin_page(page_ids[0], false);
    let (_, new_id) = buffer_pool.new_page()?;
    buffer_pool.unpin_page(new_id, false);
    for &page_id in &page_ids[1..] {
        buffer_pool.unpin_page(page_id, false);
    }

    Ok(())
}

#[test]
fn test_unpin_absent_page_is_noop() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(4)?;
    assert!(!buffer_pool.unpin_page(999, true));
    Ok(())
}

#[test]
fn test_flush_page() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(10)?;

    let (page, page_id) = buffer_pool.new_page()?;
    {
        let mut page_guard = page.write();
        page_guard.data[0..7].copy_from_slice(b"flushed");
    }
    buffer_pool.unpin_page(page_id, true);

    assert!(buffer_pool.flush_page(page_id)?);
    assert!(!buffer_pool.flush_page(4242)?);

    let fetched = buffer_pool.fetch_page(page_id)?;
    assert_eq!(&fetched.read().data[0..7], b"flushed");
    buffer_pool.unpin_page(page_id, false);

    Ok(())
}

#[test]
fn test_flush_all_pages() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(10)?;

    let mut page_ids = Vec::new();
    for i in 0..5u8 {
        let (page, page_id) = buffer_pool.new_page()?;
        page.write().data[0] = i + 1;
        buffer_pool.unpin_page(page_id, true);
        page_ids.push(page_id);
    }

    buffer_pool.flush_all_pages()?;

    for (i, &page_id) in page_ids.iter().enumerate() {
        let fetched = buffer_pool.fetch_page(page_id)?;
        assert_eq!(fetched.read().data[0], i as u8 + 1);
        buffer_pool.unpin_page(page_id, false);
    }

    Ok(())
}

#[test]
fn test_delete_page() -> Result<()> {
    let (buffer_pool, _file) = create_test_buffer_pool(10)?;

    let (_, page_id) = buffer_pool.new_page()?;

    // pinned pages cannot be deleted
    match buffer_pool.delete_page(page_id) {
        Err(BufferPoolError::PagePinned(id)) => assert_eq!(id, page_id),
        other => panic!("expected PagePinned, got {:?}", other),
    }

    buffer_pool.unpin_page(page_id, false);
    buffer_pool.delete_page(page_id)?;

    // deleting a page that is not resident succeeds
    buffer_pool.delete_page(page_id)?;

    Ok(())
}

// A shard allocates page ids congruent to its index, stepping by the shard
// count, so ids route back to it under modulo.
#[test]
fn test_shard_page_id_allocation() -> Result<()> {
    let file = tempfile::NamedTempFile::new()?;
    let disk = Arc::new(DiskManager::new(file.path())?);
    let shard = BufferPoolManager::new_shard(5, 3, 1, disk);

    let mut ids = Vec::new();
    for _ in 0..3 {
        let (_, page_id) = shard.new_page()?;
        shard.unpin_page(page_id, false);
        ids.push(page_id);
    }
    assert_eq!(ids, vec![1, 4, 7]);

    Ok(())
}
