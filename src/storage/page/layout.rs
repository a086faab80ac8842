use byteorder::{ByteOrder, LittleEndian};

pub const HEADER_SIZE: usize = 20; // 4 bytes per field * 5 fields
pub const SLOT_ENTRY_SIZE: usize = 8; // 4 bytes offset + 4 bytes length

/// Location of one record inside a page. A length of zero marks a deleted
/// slot.
#[derive(Debug, Clone, Copy)]
pub struct RecordLocation {
    pub offset: u32,
    pub length: u32,
}

impl RecordLocation {
    pub fn to_bytes(&self) -> [u8; SLOT_ENTRY_SIZE] {
        let mut bytes = [0u8; SLOT_ENTRY_SIZE];
        LittleEndian::write_u32(&mut bytes[0..4], self.offset);
        LittleEndian::write_u32(&mut bytes[4..8], self.length);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            offset: LittleEndian::read_u32(&bytes[0..4]),
            length: LittleEndian::read_u32(&bytes[4..8]),
        }
    }
}
