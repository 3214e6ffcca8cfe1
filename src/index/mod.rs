//! Index table entries.
//!
//! The table follows the header directly: `index_count` fixed-size entries,
//! one per file, in the order the files were added.
//!
//! ```text
//! off  size  field
//!   0     8  checksum     u64  DJB2 of ("/" + path) ++ data
//!   8     8  offset       i64  absolute offset of the data block
//!  16     8  length       i64  path_length + data size
//!  24     8  path_length  i64  UTF-8 bytes of the stored path
//!  32     4  reserved     u32  written as 0, ignored on read
//! ```

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

pub const INDEX_ENTRY_SIZE: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub checksum:    u64,
    pub offset:      i64,
    pub length:      i64,
    pub path_length: i64,
    pub reserved:    u32,
}

impl IndexEntry {
    pub fn to_bytes(&self) -> [u8; INDEX_ENTRY_SIZE] {
        let mut buf = [0u8; INDEX_ENTRY_SIZE];
        LittleEndian::write_u64(&mut buf[0..8], self.checksum);
        LittleEndian::write_i64(&mut buf[8..16], self.offset);
        LittleEndian::write_i64(&mut buf[16..24], self.length);
        LittleEndian::write_i64(&mut buf[24..32], self.path_length);
        LittleEndian::write_u32(&mut buf[32..36], self.reserved);
        buf
    }

    /// Decode one entry.  `buf` must hold at least [`INDEX_ENTRY_SIZE`] bytes.
    pub fn parse(buf: &[u8]) -> Self {
        Self {
            checksum:    LittleEndian::read_u64(&buf[0..8]),
            offset:      LittleEndian::read_i64(&buf[8..16]),
            length:      LittleEndian::read_i64(&buf[16..24]),
            path_length: LittleEndian::read_i64(&buf[24..32]),
            reserved:    LittleEndian::read_u32(&buf[32..36]),
        }
    }

    /// Byte range of the data block inside an archive of `archive_len` bytes,
    /// or `None` if the entry's fields are negative, inconsistent, or run
    /// past the end.
    pub fn data_range(&self, archive_len: usize) -> Option<Range<usize>> {
        let offset      = usize::try_from(self.offset).ok()?;
        let length      = usize::try_from(self.length).ok()?;
        let path_length = usize::try_from(self.path_length).ok()?;
        if path_length > length {
            return None;
        }
        let end = offset.checked_add(length)?;
        (end <= archive_len).then_some(offset..end)
    }

    /// Size of the file content, excluding the stored path.
    pub fn data_size(&self) -> i64 {
        self.length - self.path_length
    }
}
