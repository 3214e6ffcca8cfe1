use std::io;
use std::str::Utf8Error;
use thiserror::Error;

/// Everything that can make an archive buffer unusable.
///
/// Decoding stops at the first error; there is no partially valid archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    // ── Format ───────────────────────────────────────────────────────────────
    #[error("not a recognized archive: bad magic {0:02x?}")]
    InvalidMagic([u8; 8]),
    #[error("archive truncated: need {needed} bytes, have {available}")]
    Truncated { needed: u64, available: u64 },
    #[error("archive header declares a negative index count ({0})")]
    NegativeIndexCount(i64),
    #[error("archive header declares {declared} bytes but {available} are available")]
    SizeMismatch { declared: i64, available: u64 },
    #[error("index entry {index} points outside the archive (offset {offset}, length {length}, path length {path_length})")]
    EntryOutOfBounds {
        index:       usize,
        offset:      i64,
        length:      i64,
        path_length: i64,
    },

    // ── Integrity ────────────────────────────────────────────────────────────
    #[error("checksum mismatch in entry {index}: stored {stored:016x}, computed {computed:016x}")]
    ChecksumMismatch { index: usize, stored: u64, computed: u64 },

    // ── Encoding ─────────────────────────────────────────────────────────────
    #[error("path of entry {index} is not valid UTF-8: {source}")]
    InvalidPath {
        index:  usize,
        #[source]
        source: Utf8Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification of [`ArchiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Integrity,
    Encoding,
    Io,
}

impl ArchiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::InvalidMagic(_)
            | ArchiveError::Truncated { .. }
            | ArchiveError::NegativeIndexCount(_)
            | ArchiveError::SizeMismatch { .. }
            | ArchiveError::EntryOutOfBounds { .. } => ErrorKind::Format,
            ArchiveError::ChecksumMismatch { .. } => ErrorKind::Integrity,
            ArchiveError::InvalidPath { .. }      => ErrorKind::Encoding,
            ArchiveError::Io(_)                   => ErrorKind::Io,
        }
    }
}

impl From<ArchiveError> for io::Error {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::Io(inner) => inner,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
