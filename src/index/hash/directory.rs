use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::{Lsn, Page, PageId, INVALID_PAGE_ID};

/// Maximum number of directory slots
pub const DIRECTORY_ARRAY_SIZE: usize = 512;
/// `2^MAX_GLOBAL_DEPTH == DIRECTORY_ARRAY_SIZE`
pub const MAX_GLOBAL_DEPTH: u32 = 9;

const PAGE_ID_OFFSET: usize = 0;
const LSN_OFFSET: usize = 4;
const GLOBAL_DEPTH_OFFSET: usize = 8;
const LOCAL_DEPTHS_OFFSET: usize = 12;
const BUCKET_PAGE_IDS_OFFSET: usize = LOCAL_DEPTHS_OFFSET + DIRECTORY_ARRAY_SIZE;

/// Decoded form of the directory page of one extendible hash table.
///
/// On-page layout, little-endian, padded to the page size:
/// `{ page_id: u32, lsn: u32, global_depth: u32,
///    local_depths[512]: u8, bucket_page_ids[512]: u32 }`
///
/// Only the first `2^global_depth` slots are meaningful.
pub struct HashDirectoryPage {
    page_id: PageId,
    lsn: Lsn,
    global_depth: u32,
    local_depths: [u8; DIRECTORY_ARRAY_SIZE],
    bucket_page_ids: [PageId; DIRECTORY_ARRAY_SIZE],
}

impl HashDirectoryPage {
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            lsn: 0,
            global_depth: 0,
            local_depths: [0; DIRECTORY_ARRAY_SIZE],
            bucket_page_ids: [INVALID_PAGE_ID; DIRECTORY_ARRAY_SIZE],
        }
    }

    pub fn from_page(page: &Page) -> Self {
        let data = &page.data;
        let mut local_depths = [0u8; DIRECTORY_ARRAY_SIZE];
        local_depths
            .copy_from_slice(&data[LOCAL_DEPTHS_OFFSET..LOCAL_DEPTHS_OFFSET + DIRECTORY_ARRAY_SIZE]);

        let mut bucket_page_ids = [INVALID_PAGE_ID; DIRECTORY_ARRAY_SIZE];
        for (i, id) in bucket_page_ids.iter_mut().enumerate() {
            let at = BUCKET_PAGE_IDS_OFFSET + i * 4;
            *id = LittleEndian::read_u32(&data[at..at + 4]);
        }

        Self {
            page_id: LittleEndian::read_u32(&data[PAGE_ID_OFFSET..PAGE_ID_OFFSET + 4]),
            lsn: LittleEndian::read_u32(&data[LSN_OFFSET..LSN_OFFSET + 4]),
            global_depth: LittleEndian::read_u32(&data[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4]),
            local_depths,
            bucket_page_ids,
        }
    }

    pub fn write_to(&self, page: &mut Page) {
        let data = &mut page.data;
        LittleEndian::write_u32(&mut data[PAGE_ID_OFFSET..PAGE_ID_OFFSET + 4], self.page_id);
        LittleEndian::write_u32(&mut data[LSN_OFFSET..LSN_OFFSET + 4], self.lsn);
        LittleEndian::write_u32(
            &mut data[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4],
            self.global_depth,
        );
        data[LOCAL_DEPTHS_OFFSET..LOCAL_DEPTHS_OFFSET + DIRECTORY_ARRAY_SIZE]
            .copy_from_slice(&self.local_depths);
        for (i, id) in self.bucket_page_ids.iter().enumerate() {
            let at = BUCKET_PAGE_IDS_OFFSET + i * 4;
            LittleEndian::write_u32(&mut data[at..at + 4], *id);
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn global_depth(&self) -> u32 {
        self.global_depth
    }

    pub fn global_depth_mask(&self) -> u32 {
        (1u32 << self.global_depth) - 1
    }

    /// Number of live directory slots
    pub fn size(&self) -> usize {
        1usize << self.global_depth
    }

    pub fn local_depth(&self, index: usize) -> u32 {
        debug_assert!(index < self.size());
        self.local_depths[index] as u32
    }

    pub fn set_local_depth(&mut self, index: usize, depth: u32) {
        debug_assert!(index < self.size());
        debug_assert!(depth <= self.global_depth);
        self.local_depths[index] = depth as u8;
    }

    pub fn incr_local_depth(&mut self, index: usize) {
        debug_assert!(self.local_depth(index) < self.global_depth);
        self.local_depths[index] += 1;
    }

    pub fn decr_local_depth(&mut self, index: usize) {
        debug_assert!(self.local_depth(index) > 0);
        self.local_depths[index] -= 1;
    }

    pub fn bucket_page_id(&self, index: usize) -> PageId {
        debug_assert!(index < self.size());
        self.bucket_page_ids[index]
    }

    pub fn set_bucket_page_id(&mut self, index: usize, page_id: PageId) {
        debug_assert!(index < self.size());
        self.bucket_page_ids[index] = page_id;
    }

    /// The buddy slot a split targets or a merge collapses into: the slot
    /// differing from `index` only in bit `local_depth - 1`.
    pub fn split_image_index(&self, index: usize) -> usize {
        let depth = self.local_depth(index);
        debug_assert!(depth > 0);
        index ^ (1usize << (depth - 1))
    }

    /// True when halving the directory would strand no bucket
    pub fn can_shrink(&self) -> bool {
        self.global_depth > 0
            && (0..self.size()).all(|i| self.local_depth(i) < self.global_depth)
    }

    /// Double the directory by mirroring the low half into the high half
    pub fn incr_global_depth(&mut self) {
        assert!(
            self.global_depth < MAX_GLOBAL_DEPTH,
            "directory already at maximum depth"
        );
        let size = self.size();
        for i in 0..size {
            self.local_depths[size + i] = self.local_depths[i];
            self.bucket_page_ids[size + i] = self.bucket_page_ids[i];
        }
        self.global_depth += 1;
    }

    pub fn decr_global_depth(&mut self) {
        assert!(self.global_depth > 0, "directory already at depth zero");
        self.global_depth -= 1;
    }

    /// Assert the structural invariants: every live slot points at a valid
    /// bucket, local depths never exceed the global depth, slots agreeing on
    /// their low `local_depth` bits share one bucket page, and each bucket is
    /// referenced exactly `2^(global_depth - local_depth)` times.
    pub fn verify_integrity(&self) {
        use std::collections::HashMap;

        let mut refcount: HashMap<PageId, u32> = HashMap::new();
        let mut depth_of: HashMap<PageId, u32> = HashMap::new();

        for i in 0..self.size() {
            let bucket = self.bucket_page_id(i);
            let depth = self.local_depth(i);
            assert_ne!(bucket, INVALID_PAGE_ID, "slot {} has no bucket", i);
            assert!(
                depth <= self.global_depth,
                "slot {} local depth {} exceeds global depth {}",
                i,
                depth,
                self.global_depth
            );

            *refcount.entry(bucket).or_insert(0) += 1;
            match depth_of.get(&bucket) {
                Some(&d) => assert_eq!(
                    d, depth,
                    "bucket {} referenced with local depths {} and {}",
                    bucket, d, depth
                ),
                None => {
                    depth_of.insert(bucket, depth);
                }
            }
        }

        for (bucket, count) in refcount {
            let depth = depth_of[&bucket];
            assert_eq!(
                count,
                1u32 << (self.global_depth - depth),
                "bucket {} at depth {} has wrong reference count",
                bucket,
                depth
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_directory_defaults() {
        let dir = HashDirectoryPage::new(5);
        assert_eq!(dir.page_id(), 5);
        assert_eq!(dir.global_depth(), 0);
        assert_eq!(dir.global_depth_mask(), 0);
        assert_eq!(dir.size(), 1);
    }

    #[test]
    fn test_incr_global_depth_mirrors_low_half() {
        let mut dir = HashDirectoryPage::new(1);
        dir.set_bucket_page_id(0, 10);

        dir.incr_global_depth();
        assert_eq!(dir.size(), 2);
        assert_eq!(dir.bucket_page_id(0), 10);
        assert_eq!(dir.bucket_page_id(1), 10);
        assert_eq!(dir.local_depth(1), 0);
        dir.verify_integrity();
    }

    #[test]
    fn test_split_image_index() {
        let mut dir = HashDirectoryPage::new(1);
        dir.set_bucket_page_id(0, 10);
        dir.incr_global_depth();
        dir.incr_global_depth();

        dir.set_local_depth(0, 2);
        assert_eq!(dir.split_image_index(0), 2);
        dir.set_local_depth(3, 1);
        assert_eq!(dir.split_image_index(3), 2);
    }

    #[test]
    fn test_can_shrink() {
        let mut dir = HashDirectoryPage::new(1);
        dir.set_bucket_page_id(0, 10);
        assert!(!dir.can_shrink()); // depth zero cannot shrink

        dir.incr_global_depth();
        dir.set_local_depth(0, 1);
        dir.set_local_depth(1, 1);
        dir.set_bucket_page_id(1, 11);
        assert!(!dir.can_shrink());

        dir.set_local_depth(0, 0);
        dir.set_local_depth(1, 0);
        dir.set_bucket_page_id(1, 10);
        assert!(dir.can_shrink());

        dir.decr_global_depth();
        assert_eq!(dir.size(), 1);
    }

    #[test]
    fn test_page_roundtrip() {
        let mut dir = HashDirectoryPage::new(3);
        dir.set_bucket_page_id(0, 21);
        dir.incr_global_depth();
        dir.set_bucket_page_id(1, 22);
        dir.set_local_depth(0, 1);
        dir.set_local_depth(1, 1);

        let mut page = Page::new(3);
        dir.write_to(&mut page);
        let decoded = HashDirectoryPage::from_page(&page);

        assert_eq!(decoded.page_id(), 3);
        assert_eq!(decoded.global_depth(), 1);
        assert_eq!(decoded.bucket_page_id(0), 21);
        assert_eq!(decoded.bucket_page_id(1), 22);
        assert_eq!(decoded.local_depth(1), 1);
        decoded.verify_integrity();
    }
}
