use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::Rid;

/// A key the hash index can store inline: fixed encoded width, equality as
/// the comparator, and a deterministic 64-bit hash that the directory
/// downcasts to 32 bits.
pub trait IndexKey: Clone + PartialEq + Send + Sync + 'static {
    const ENCODED_SIZE: usize;

    fn encode_into(&self, buf: &mut [u8]);
    fn decode_from(buf: &[u8]) -> Self;
    fn hash64(&self) -> u64;
}

/// A value the hash index can store inline next to its key
pub trait IndexValue: Clone + PartialEq + Send + Sync + 'static {
    const ENCODED_SIZE: usize;

    fn encode_into(&self, buf: &mut [u8]);
    fn decode_from(buf: &[u8]) -> Self;
}

impl IndexKey for i64 {
    const ENCODED_SIZE: usize = 8;

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_i64(buf, *self);
    }

    fn decode_from(buf: &[u8]) -> Self {
        LittleEndian::read_i64(buf)
    }

    fn hash64(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write_i64(*self);
        hasher.finish()
    }
}

impl IndexKey for i32 {
    const ENCODED_SIZE: usize = 4;

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_i32(buf, *self);
    }

    fn decode_from(buf: &[u8]) -> Self {
        LittleEndian::read_i32(buf)
    }

    fn hash64(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write_i32(*self);
        hasher.finish()
    }
}

impl IndexKey for u32 {
    const ENCODED_SIZE: usize = 4;

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(buf, *self);
    }

    fn decode_from(buf: &[u8]) -> Self {
        LittleEndian::read_u32(buf)
    }

    fn hash64(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write_u32(*self);
        hasher.finish()
    }
}

impl IndexValue for Rid {
    const ENCODED_SIZE: usize = 8;

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.page_id);
        LittleEndian::write_u32(&mut buf[4..8], self.slot);
    }

    fn decode_from(buf: &[u8]) -> Self {
        Rid {
            page_id: LittleEndian::read_u32(&buf[0..4]),
            slot: LittleEndian::read_u32(&buf[4..8]),
        }
    }
}

impl IndexValue for i64 {
    const ENCODED_SIZE: usize = 8;

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_i64(buf, *self);
    }

    fn decode_from(buf: &[u8]) -> Self {
        LittleEndian::read_i64(buf)
    }
}

impl IndexValue for i32 {
    const ENCODED_SIZE: usize = 4;

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_i32(buf, *self);
    }

    fn decode_from(buf: &[u8]) -> Self {
        LittleEndian::read_i32(buf)
    }
}
