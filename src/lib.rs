pub mod checksum;
pub mod header;
pub mod index;
pub mod record;
pub mod error;
pub mod container;
pub mod archive;
pub mod selftest;

pub use checksum::{checksum, Djb2};
pub use header::{ArchiveHeader, MAGIC, HEADER_SIZE};
pub use index::{IndexEntry, INDEX_ENTRY_SIZE};
pub use record::FileRecord;
pub use error::{ArchiveError, ErrorKind};
pub use container::{decode, encode, ArchiveBuilder, ArchiveReader, Entry};
