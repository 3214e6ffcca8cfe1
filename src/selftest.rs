//! In-memory round-trip check: collect a directory, encode it, decode the
//! result, and require the decoded records to equal the collected ones.

use std::io;
use std::path::Path;

use log::info;
use thiserror::Error;

use crate::archive::{collect_dir, CollectOptions};
use crate::container::{decode, encode};
use crate::error::ArchiveError;
use crate::record::FileRecord;

#[derive(Error, Debug)]
pub enum SelfTestError {
    #[error("number of files in the archive does not match the original: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("file information mismatch at entry {index} ({path})")]
    RecordMismatch { index: usize, path: String },
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestReport {
    pub files:         usize,
    pub content_bytes: u64,
    pub archive_bytes: u64,
}

/// Encode and decode `records`, comparing the result record by record.
pub fn verify_round_trip(records: &[FileRecord]) -> Result<SelfTestReport, SelfTestError> {
    let buf = encode(records);
    let decoded = decode(&buf)?;

    if decoded.len() != records.len() {
        return Err(SelfTestError::CountMismatch { expected: records.len(), actual: decoded.len() });
    }
    if let Some((index, original)) = records
        .iter()
        .zip(&decoded)
        .enumerate()
        .find_map(|(i, (a, b))| (a != b).then_some((i, a)))
    {
        return Err(SelfTestError::RecordMismatch { index, path: original.path.clone() });
    }

    Ok(SelfTestReport {
        files:         records.len(),
        content_bytes: records.iter().map(|r| r.size).sum(),
        archive_bytes: buf.len() as u64,
    })
}

/// Round-trip every regular file under `dir`.
pub fn self_test<P: AsRef<Path>>(dir: P, opts: &CollectOptions) -> Result<SelfTestReport, SelfTestError> {
    let records = collect_dir(dir.as_ref(), opts)?;
    let report = verify_round_trip(&records)?;
    info!(
        "round trip of {} verified: {} file(s), {} content bytes, {} archive bytes",
        dir.as_ref().display(),
        report.files,
        report.content_bytes,
        report.archive_bytes
    );
    Ok(report)
}
