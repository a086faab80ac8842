use crate::common::types::{Page, PAGE_SIZE};
use crate::storage::page::error::PageError;
use crate::storage::page::header::PageHeader;
use crate::storage::page::layout::{RecordLocation, HEADER_SIZE, SLOT_ENTRY_SIZE};

/// Stateless manager for the slotted heap page format.
///
/// Record bytes grow forward from the header; slot entries grow backward
/// from the end of the page. Deleted slots stay in the slot array with
/// length zero so record ids remain stable.
pub struct PageManager;

impl Default for PageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PageManager {
    pub fn new() -> Self {
        Self
    }

    pub fn init_page(&self, page: &mut Page) {
        self.put_header(page, PageHeader::new());
    }

    /// Append a record, returning its slot index
    pub fn insert_record(&self, page: &mut Page, data: &[u8]) -> Result<u32, PageError> {
        let mut header = self.get_header(page);

        let record_size = data.len() as u32;
        let total_needed = record_size + SLOT_ENTRY_SIZE as u32;
        if header.free_space_size < total_needed {
            return Err(PageError::InsufficientSpace);
        }

        let slot = header.slot_count;
        let location = RecordLocation {
            offset: header.free_space_offset,
            length: record_size,
        };

        let start = header.free_space_offset as usize;
        page.data[start..start + data.len()].copy_from_slice(data);
        self.put_slot(page, slot, location);

        header.free_space_offset += record_size;
        header.free_space_size -= total_needed;
        header.slot_count += 1;
        self.put_header(page, header);

        Ok(slot)
    }

    /// Read the record in a slot; `None` when the slot is tombstoned
    pub fn record_at(&self, page: &Page, slot: u32) -> Result<Option<Vec<u8>>, PageError> {
        let header = self.get_header(page);
        if slot >= header.slot_count {
            return Err(PageError::InvalidSlot);
        }

        let location = self.get_slot(page, slot);
        if location.length == 0 {
            return Ok(None);
        }

        let start = location.offset as usize;
        let end = start + location.length as usize;
        Ok(Some(page.data[start..end].to_vec()))
    }

    /// Overwrite the record in a slot, keeping the slot index stable. Larger
    /// records relocate to fresh space within the page.
    pub fn update_record(&self, page: &mut Page, slot: u32, data: &[u8]) -> Result<(), PageError> {
        let mut header = self.get_header(page);
        if slot >= header.slot_count {
            return Err(PageError::InvalidSlot);
        }

        let location = self.get_slot(page, slot);
        if location.length == 0 {
            return Err(PageError::RecordNotFound);
        }

        let new_size = data.len() as u32;
        if new_size > location.length {
            // Relocate: the old bytes become garbage until compaction
            let grow = new_size - location.length;
            if header.free_space_size < grow {
                return Err(PageError::InsufficientSpace);
            }

            let start = header.free_space_offset as usize;
            page.data[start..start + data.len()].copy_from_slice(data);
            self.put_slot(
                page,
                slot,
                RecordLocation {
                    offset: header.free_space_offset,
                    length: new_size,
                },
            );

            header.free_space_offset += new_size;
            header.free_space_size -= grow;
            self.put_header(page, header);
            return Ok(());
        }

        let start = location.offset as usize;
        page.data[start..start + data.len()].copy_from_slice(data);
        if new_size < location.length {
            self.put_slot(
                page,
                slot,
                RecordLocation {
                    offset: location.offset,
                    length: new_size,
                },
            );
        }

        Ok(())
    }

    /// Tombstone a slot. The slot entry stays so later slots keep their ids.
    pub fn delete_record(&self, page: &mut Page, slot: u32) -> Result<(), PageError> {
        let header = self.get_header(page);
        if slot >= header.slot_count {
            return Err(PageError::InvalidSlot);
        }

        let mut location = self.get_slot(page, slot);
        if location.length == 0 {
            return Err(PageError::RecordNotFound);
        }

        location.length = 0;
        self.put_slot(page, slot, location);
        Ok(())
    }

    pub fn get_header(&self, page: &Page) -> PageHeader {
        PageHeader::from_bytes(&page.data[0..HEADER_SIZE])
    }

    pub fn put_header(&self, page: &mut Page, header: PageHeader) {
        page.data[0..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    }

    pub fn free_space(&self, page: &Page) -> u32 {
        self.get_header(page).free_space_size
    }

    fn slot_position(&self, slot: u32) -> usize {
        PAGE_SIZE - SLOT_ENTRY_SIZE * (slot as usize + 1)
    }

    fn get_slot(&self, page: &Page, slot: u32) -> RecordLocation {
        let pos = self.slot_position(slot);
        RecordLocation::from_bytes(&page.data[pos..pos + SLOT_ENTRY_SIZE])
    }

    fn put_slot(&self, page: &mut Page, slot: u32, location: RecordLocation) {
        let pos = self.slot_position(slot);
        page.data[pos..pos + SLOT_ENTRY_SIZE].copy_from_slice(&location.to_bytes());
    }
}
