use byteorder::{ByteOrder, LittleEndian};

use crate::error::ArchiveError;
use crate::index::INDEX_ENTRY_SIZE;

pub const MAGIC: &[u8; 8] = b"TATIX_AR";
/// magic(8) + index_count(8) + total_size(8)
pub const HEADER_SIZE: usize = 24;

/// Fixed 24-byte archive header.  All integers little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub magic:       [u8; 8],
    pub index_count: i64,
    pub total_size:  i64,
}

impl ArchiveHeader {
    pub fn new(index_count: i64, total_size: i64) -> Self {
        Self { magic: *MAGIC, index_count, total_size }
    }

    /// Byte offset where the data section begins.
    pub fn data_start(&self) -> u64 {
        (INDEX_ENTRY_SIZE as u64)
            .saturating_mul(self.index_count.max(0) as u64)
            .saturating_add(HEADER_SIZE as u64)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&self.magic);
        LittleEndian::write_i64(&mut buf[8..16], self.index_count);
        LittleEndian::write_i64(&mut buf[16..24], self.total_size);
        buf
    }

    /// Parse the header at the start of `buf`, rejecting foreign magic.
    pub fn parse(buf: &[u8]) -> Result<Self, ArchiveError> {
        if buf.len() < HEADER_SIZE {
            return Err(ArchiveError::Truncated {
                needed:    HEADER_SIZE as u64,
                available: buf.len() as u64,
            });
        }
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&buf[0..8]);
        if &magic != MAGIC {
            return Err(ArchiveError::InvalidMagic(magic));
        }
        Ok(Self {
            magic,
            index_count: LittleEndian::read_i64(&buf[8..16]),
            total_size:  LittleEndian::read_i64(&buf[16..24]),
        })
    }
}
