//! Container codec: builder and reader.
//!
//! # Layout
//! ```text
//! [header 24 B][index entry 36 B × n][path ++ data]…
//! ```
//! Data blocks are packed back to back in index order with no padding, so
//! entry *i* starts at `24 + 36·n + Σ length(0..i)`.
//!
//! # Builder
//! [`ArchiveBuilder`] accumulates [`FileRecord`]s and lays the whole archive
//! out in one pass.  Output depends only on the records and their order.
//!
//! # Reader
//! [`ArchiveReader`] validates the header and index table bounds once, then
//! hands out a single-pass iterator of [`Entry`] values that borrow path and
//! content straight from the archive buffer.  Every entry's checksum is
//! checked before it is yielded; the first failure ends the iteration.

use std::io::{self, Write};
use std::iter::FusedIterator;

use log::{debug, warn};

use crate::checksum::Djb2;
use crate::error::ArchiveError;
use crate::header::{ArchiveHeader, HEADER_SIZE};
use crate::index::{IndexEntry, INDEX_ENTRY_SIZE};
use crate::record::FileRecord;

// ── Builder ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct ArchiveBuilder {
    records: Vec<FileRecord>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.add_record(FileRecord::new(path, data))
    }

    pub fn add_record(&mut self, record: FileRecord) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Byte length of the archive [`build`](Self::build) would produce.
    pub fn total_size(&self) -> u64 {
        total_size(&self.records)
    }

    /// Index entries in record order, with offsets assigned contiguously.
    pub fn index_entries(&self) -> Vec<IndexEntry> {
        index_entries(&self.records)
    }

    /// Lay out the archive in memory.
    pub fn build(&self) -> Vec<u8> {
        build(&self.records)
    }

    /// Write the same bytes [`build`](Self::build) returns to `writer`,
    /// without materialising a second copy.  Returns the byte count.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<u64> {
        writer.write_all(&header(&self.records).to_bytes())?;
        for entry in index_entries(&self.records) {
            writer.write_all(&entry.to_bytes())?;
        }
        for r in &self.records {
            writer.write_all(r.internal_path().as_bytes())?;
            writer.write_all(&r.data)?;
        }
        writer.flush()?;
        Ok(self.total_size())
    }
}

impl FromIterator<FileRecord> for ArchiveBuilder {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        Self { records: iter.into_iter().collect() }
    }
}

fn data_section_start(count: usize) -> u64 {
    HEADER_SIZE as u64 + (INDEX_ENTRY_SIZE * count) as u64
}

/// `len("/" + path) + len(data)`
fn block_len(r: &FileRecord) -> u64 {
    1 + r.path.len() as u64 + r.data.len() as u64
}

fn total_size(records: &[FileRecord]) -> u64 {
    data_section_start(records.len()) + records.iter().map(block_len).sum::<u64>()
}

fn header(records: &[FileRecord]) -> ArchiveHeader {
    ArchiveHeader::new(records.len() as i64, total_size(records) as i64)
}

fn index_entries(records: &[FileRecord]) -> Vec<IndexEntry> {
    let mut offset = data_section_start(records.len());
    records
        .iter()
        .map(|r| {
            let path = r.internal_path();
            let mut hasher = Djb2::new();
            hasher.update(path.as_bytes());
            hasher.update(&r.data);
            let length = block_len(r);
            let entry = IndexEntry {
                checksum:    hasher.finalize(),
                offset:      offset as i64,
                length:      length as i64,
                path_length: path.len() as i64,
                reserved:    0,
            };
            offset += length;
            entry
        })
        .collect()
}

fn build(records: &[FileRecord]) -> Vec<u8> {
    let mut out = Vec::with_capacity(total_size(records) as usize);
    out.extend_from_slice(&header(records).to_bytes());
    for entry in index_entries(records) {
        out.extend_from_slice(&entry.to_bytes());
    }
    for r in records {
        out.extend_from_slice(r.internal_path().as_bytes());
        out.extend_from_slice(&r.data);
    }
    debug!("built archive: {} entries, {} bytes", records.len(), out.len());
    out
}

// ── Reader ───────────────────────────────────────────────────────────────────

/// Validated view over an archive buffer.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveReader<'a> {
    buf:    &'a [u8],
    header: ArchiveHeader,
    count:  usize,
}

impl<'a> ArchiveReader<'a> {
    /// Check the magic, that the full index table lies inside `buf`, and
    /// that the declared total size is non-negative and fits in `buf`.
    pub fn new(buf: &'a [u8]) -> Result<Self, ArchiveError> {
        let header = ArchiveHeader::parse(buf)?;
        let count = usize::try_from(header.index_count)
            .map_err(|_| ArchiveError::NegativeIndexCount(header.index_count))?;

        let table_end = count
            .checked_mul(INDEX_ENTRY_SIZE)
            .and_then(|n| n.checked_add(HEADER_SIZE));
        match table_end {
            Some(end) if end <= buf.len() => {}
            _ => {
                return Err(ArchiveError::Truncated {
                    needed:    header.data_start(),
                    available: buf.len() as u64,
                })
            }
        }

        if header.total_size < 0 || header.total_size as u64 > buf.len() as u64 {
            return Err(ArchiveError::SizeMismatch {
                declared:  header.total_size,
                available: buf.len() as u64,
            });
        }
        if header.total_size as u64 != buf.len() as u64 {
            warn!(
                "archive header declares {} bytes, ignoring {} trailing bytes",
                header.total_size,
                buf.len() as u64 - header.total_size as u64
            );
        }
        Ok(Self { buf, header, count })
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Raw index entry `i`, unchecked against its data block.
    pub fn index_entry(&self, i: usize) -> Option<IndexEntry> {
        if i >= self.count {
            return None;
        }
        let start = HEADER_SIZE + i * INDEX_ENTRY_SIZE;
        Some(IndexEntry::parse(&self.buf[start..start + INDEX_ENTRY_SIZE]))
    }

    pub fn index_entries(&self) -> impl Iterator<Item = IndexEntry> + '_ {
        (0..self.count).filter_map(move |i| self.index_entry(i))
    }

    /// Validate and decode entry `i`.
    pub fn entry(&self, i: usize) -> Option<Result<Entry<'a>, ArchiveError>> {
        let ie = self.index_entry(i)?;
        Some(self.validate(i, ie))
    }

    pub fn entries(&self) -> Entries<'a> {
        Entries { reader: *self, next: 0, failed: false }
    }

    fn validate(&self, index: usize, ie: IndexEntry) -> Result<Entry<'a>, ArchiveError> {
        let buf: &'a [u8] = self.buf;
        let range = ie.data_range(buf.len()).ok_or(ArchiveError::EntryOutOfBounds {
            index,
            offset:      ie.offset,
            length:      ie.length,
            path_length: ie.path_length,
        })?;
        let block = &buf[range];

        let mut hasher = Djb2::new();
        hasher.update(block);
        let computed = hasher.finalize();
        if computed != ie.checksum {
            return Err(ArchiveError::ChecksumMismatch { index, stored: ie.checksum, computed });
        }

        // data_range guarantees 0 <= path_length <= length
        let (path_bytes, data) = block.split_at(ie.path_length as usize);
        let stored = std::str::from_utf8(path_bytes)
            .map_err(|source| ArchiveError::InvalidPath { index, source })?;
        let path = stored.strip_prefix('/').unwrap_or(stored);

        Ok(Entry { path, data, checksum: ie.checksum, offset: ie.offset as u64 })
    }
}

/// One validated file, borrowed from the archive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    /// Relative path: the stored path minus one leading `/`.
    pub path:     &'a str,
    pub data:     &'a [u8],
    pub checksum: u64,
    pub offset:   u64,
}

impl Entry<'_> {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn to_record(&self) -> FileRecord {
        FileRecord::new(self.path, self.data)
    }
}

/// Single-pass iterator over validated entries.  Yields `None` after the
/// first error.
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    reader: ArchiveReader<'a>,
    next:   usize,
    failed: bool,
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<Entry<'a>, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.reader.entry(self.next)?;
        self.next += 1;
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        (0, Some(self.reader.len() - self.next))
    }
}

impl FusedIterator for Entries<'_> {}

// ── One-shot helpers ─────────────────────────────────────────────────────────

/// Encode `records` in order into a fresh archive buffer.
pub fn encode(records: &[FileRecord]) -> Vec<u8> {
    build(records)
}

/// Decode every entry of `buf`.  Fails on the first bad entry.
pub fn decode(buf: &[u8]) -> Result<Vec<FileRecord>, ArchiveError> {
    ArchiveReader::new(buf)?
        .entries()
        .map(|e| e.map(|entry| entry.to_record()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;
    use crate::error::ErrorKind;
    use byteorder::{ByteOrder, LittleEndian};

    fn hello() -> Vec<u8> {
        encode(&[FileRecord::new("a.txt", b"hello".to_vec())])
    }

    #[test]
    fn single_file_layout() {
        let buf = hello();
        assert_eq!(buf.len(), 71);
        assert_eq!(&buf[0..8], b"TATIX_AR");
        assert_eq!(LittleEndian::read_i64(&buf[8..16]), 1);
        assert_eq!(LittleEndian::read_i64(&buf[16..24]), 71);

        let ie = IndexEntry::parse(&buf[24..60]);
        assert_eq!(ie.checksum, checksum(b"/a.txthello"));
        assert_eq!(ie.offset, 60);
        assert_eq!(ie.length, 11);
        assert_eq!(ie.path_length, 6);
        assert_eq!(ie.reserved, 0);
        assert_eq!(&buf[60..], b"/a.txthello");
    }

    #[test]
    fn empty_archive_is_header_only() {
        let buf = encode(&[]);
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(LittleEndian::read_i64(&buf[8..16]), 0);
        assert_eq!(LittleEndian::read_i64(&buf[16..24]), 24);
        assert!(decode(&buf).unwrap().is_empty());
    }

    #[test]
    fn offsets_are_contiguous() {
        let mut b = ArchiveBuilder::new();
        b.add_file("x", b"12345".to_vec()).add_file("dir/y", Vec::<u8>::new()).add_file("z", b"9".to_vec());
        let entries = b.index_entries();
        let start = (HEADER_SIZE + 3 * INDEX_ENTRY_SIZE) as i64;
        assert_eq!(entries[0].offset, start);
        assert_eq!(entries[1].offset, start + 2 + 5);
        assert_eq!(entries[2].offset, start + 7 + 6);
        assert_eq!(b.total_size(), (start + 7 + 6 + 3) as u64);
    }

    #[test]
    fn build_and_write_to_agree() {
        let mut b = ArchiveBuilder::new();
        b.add_file("bin/init", vec![0x7f, b'E', b'L', b'F']).add_file("etc/hostname", b"tatix\n".to_vec());
        let mut streamed = Vec::new();
        let n = b.write_to(&mut streamed).unwrap();
        assert_eq!(streamed, b.build());
        assert_eq!(n, streamed.len() as u64);
    }

    #[test]
    fn encoding_is_deterministic() {
        let records = vec![
            FileRecord::new("a", b"1".to_vec()),
            FileRecord::new("b", b"2".to_vec()),
        ];
        assert_eq!(encode(&records), encode(&records));
    }

    #[test]
    fn order_is_preserved() {
        let records = vec![
            FileRecord::new("zeta", b"last".to_vec()),
            FileRecord::new("alpha", b"first".to_vec()),
        ];
        assert_eq!(decode(&encode(&records)).unwrap(), records);
    }

    #[test]
    fn duplicate_paths_survive() {
        let records = vec![
            FileRecord::new("same", b"one".to_vec()),
            FileRecord::new("same", b"two".to_vec()),
        ];
        assert_eq!(decode(&encode(&records)).unwrap(), records);
    }

    #[test]
    fn absolute_input_keeps_residual_slash() {
        let records = vec![FileRecord::new("/etc/motd", b"hi".to_vec())];
        let buf = encode(&records);
        assert_eq!(&buf[60..71], b"//etc/motdh");
        assert_eq!(decode(&buf).unwrap(), records);
    }

    #[test]
    fn stored_path_without_slash_is_kept() {
        // Hand-built archive whose stored path lacks the leading slash.
        let block = b"rawdata";
        let ie = IndexEntry {
            checksum:    checksum(block),
            offset:      60,
            length:      7,
            path_length: 3,
            reserved:    0,
        };
        let mut buf = ArchiveHeader::new(1, 67).to_bytes().to_vec();
        buf.extend_from_slice(&ie.to_bytes());
        buf.extend_from_slice(block);
        let records = decode(&buf).unwrap();
        assert_eq!(records, vec![FileRecord::new("raw", b"data".to_vec())]);
    }

    #[test]
    fn bad_magic_is_format_error() {
        let mut buf = hello();
        buf[0] = b'X';
        let err = decode(&buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(err, ArchiveError::InvalidMagic(_)));
    }

    #[test]
    fn truncated_header_and_table() {
        assert!(matches!(decode(b"TATIX"), Err(ArchiveError::Truncated { .. })));
        let buf = hello();
        assert!(matches!(decode(&buf[..40]), Err(ArchiveError::Truncated { .. })));
    }

    #[test]
    fn truncated_data_is_out_of_bounds() {
        let mut buf = hello();
        buf.truncate(70);
        LittleEndian::write_i64(&mut buf[16..24], 70);
        let err = decode(&buf).unwrap_err();
        assert!(matches!(err, ArchiveError::EntryOutOfBounds { index: 0, .. }));
    }

    #[test]
    fn negative_count_rejected() {
        let buf = ArchiveHeader::new(-1, 24).to_bytes();
        assert!(matches!(decode(&buf), Err(ArchiveError::NegativeIndexCount(-1))));
    }

    #[test]
    fn oversized_total_size_rejected() {
        let mut buf = hello();
        LittleEndian::write_i64(&mut buf[16..24], 1_000_000);
        let err = decode(&buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(err, ArchiveError::SizeMismatch { declared: 1_000_000, available: 71 }));
    }

    #[test]
    fn negative_total_size_rejected() {
        let mut buf = hello();
        LittleEndian::write_i64(&mut buf[16..24], -5);
        assert!(matches!(decode(&buf), Err(ArchiveError::SizeMismatch { declared: -5, .. })));
    }

    #[test]
    fn trailing_bytes_after_declared_size_tolerated() {
        let mut buf = hello();
        buf.extend_from_slice(b"padding");
        assert_eq!(decode(&buf).unwrap(), vec![FileRecord::new("a.txt", b"hello".to_vec())]);
    }

    #[test]
    fn flipped_data_bit_is_integrity_error() {
        let mut buf = hello();
        buf[68] ^= 0x01;
        let err = decode(&buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn flipped_path_bit_is_integrity_error() {
        let mut buf = hello();
        buf[62] ^= 0x20;
        assert!(matches!(decode(&buf), Err(ArchiveError::ChecksumMismatch { index: 0, .. })));
    }

    #[test]
    fn invalid_utf8_path_is_encoding_error() {
        let block = [b'/', 0xFF, 0xFE, b'x'];
        let ie = IndexEntry {
            checksum:    checksum(&block),
            offset:      60,
            length:      4,
            path_length: 3,
            reserved:    0,
        };
        let mut buf = ArchiveHeader::new(1, 64).to_bytes().to_vec();
        buf.extend_from_slice(&ie.to_bytes());
        buf.extend_from_slice(&block);
        assert_eq!(decode(&buf).unwrap_err().kind(), ErrorKind::Encoding);
    }

    #[test]
    fn reserved_field_ignored_on_read() {
        let mut buf = hello();
        LittleEndian::write_u32(&mut buf[56..60], 0xFFFF_FFFF);
        assert_eq!(decode(&buf).unwrap()[0].path, "a.txt");
    }

    #[test]
    fn iteration_stops_after_first_error() {
        let records = vec![
            FileRecord::new("ok", b"fine".to_vec()),
            FileRecord::new("bad", b"corrupt me".to_vec()),
            FileRecord::new("never", b"reached".to_vec()),
        ];
        let mut buf = encode(&records);
        let reader = ArchiveReader::new(&buf).unwrap();
        let bad_offset = reader.index_entry(1).unwrap().offset as usize;
        buf[bad_offset + 5] ^= 0xFF;

        let reader = ArchiveReader::new(&buf).unwrap();
        let mut it = reader.entries();
        assert_eq!(it.next().unwrap().unwrap().path, "ok");
        assert!(matches!(it.next(), Some(Err(ArchiveError::ChecksumMismatch { index: 1, .. }))));
        assert!(it.next().is_none());
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn entries_borrow_from_buffer() {
        let buf = hello();
        let reader = ArchiveReader::new(&buf).unwrap();
        let entry = reader.entries().next().unwrap().unwrap();
        assert_eq!(entry.data.as_ptr(), buf[66..].as_ptr());
        assert_eq!(entry.size(), 5);
        assert_eq!(entry.offset, 60);
    }
}
