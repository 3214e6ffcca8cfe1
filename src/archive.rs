//! Filesystem side of the archive: collecting a directory tree into
//! [`FileRecord`]s and writing decoded records back out.
//!
//! ```no_run
//! use tatix_ar::archive::{pack_dir, unpack_archive, CollectOptions};
//!
//! pack_dir("rootfs", "rootfs.tar", &CollectOptions::default())?;
//! unpack_archive("rootfs.tar", "out")?;
//! # Ok::<(), std::io::Error>(())
//! ```

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use crate::container::{ArchiveBuilder, ArchiveReader};
use crate::record::FileRecord;

// ── CollectOptions ────────────────────────────────────────────────────────────

/// Configuration for [`collect_dir`].
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Descend into symlinked directories and archive symlinked files by
    /// their target's content.  Off by default; links are skipped.
    pub follow_links: bool,
}

// ── PackSummary ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSummary {
    pub files: usize,
    pub bytes: u64,
}

// ── Collect ───────────────────────────────────────────────────────────────────

/// Read every regular file under `root` into memory.
///
/// Entries are visited in file-name order so an unchanged tree always
/// produces the same record list.
pub fn collect_dir<P: AsRef<Path>>(root: P, opts: &CollectOptions) -> io::Result<Vec<FileRecord>> {
    let root = root.as_ref();
    let mut records = Vec::new();

    for entry in WalkDir::new(root).follow_links(opts.follow_links).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let path = relative_path_string(rel)?;
        let data = fs::read(entry.path())?;
        debug!("collected {path} ({} bytes)", data.len());
        records.push(FileRecord::new(path, data));
    }

    Ok(records)
}

/// Join `rel`'s components with `/`, independent of the host separator.
fn relative_path_string(rel: &Path) -> io::Result<String> {
    let mut parts = Vec::new();
    for c in rel.components() {
        match c {
            Component::Normal(s) => parts.push(s.to_str().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 file name: {}", rel.display()),
                )
            })?),
            Component::CurDir => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unexpected path component in {}", rel.display()),
                ))
            }
        }
    }
    Ok(parts.join("/"))
}

// ── Extract ───────────────────────────────────────────────────────────────────

/// Write each record to `dest/<path>`, creating parents and overwriting
/// existing files.  Files already written stay in place if a later one fails.
pub fn extract_all<P: AsRef<Path>>(dest: P, records: &[FileRecord]) -> io::Result<()> {
    let dest = dest.as_ref();
    fs::create_dir_all(dest)?;
    for r in records {
        write_file(dest, &r.path, &r.data)?;
    }
    Ok(())
}

fn write_file(dest: &Path, path: &str, data: &[u8]) -> io::Result<()> {
    let target = resolve_target(dest, path)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, data)?;
    debug!("extracted {}", target.display());
    Ok(())
}

/// Map an archive path under `dest`.  Root components are dropped so a
/// residual leading slash stays inside `dest`; `..` is refused.
fn resolve_target(dest: &Path, path: &str) -> io::Result<PathBuf> {
    let mut target = dest.to_path_buf();
    let mut pushed = false;
    for c in Path::new(path).components() {
        match c {
            Component::Normal(s) => {
                target.push(s);
                pushed = true;
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("path escapes extraction directory: {path}"),
                ))
            }
        }
    }
    if !pushed {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("empty file path in archive: {path:?}"),
        ));
    }
    Ok(target)
}

// ── Whole-archive helpers ─────────────────────────────────────────────────────

/// Collect `dir` and write it as an archive file at `archive_path`.
pub fn pack_dir<P: AsRef<Path>, Q: AsRef<Path>>(
    dir:          P,
    archive_path: Q,
    opts:         &CollectOptions,
) -> io::Result<PackSummary> {
    let records = collect_dir(dir.as_ref(), opts)?;
    let builder: ArchiveBuilder = records.into_iter().collect();
    let out = BufWriter::new(File::create(archive_path.as_ref())?);
    let bytes = builder.write_to(out)?;
    info!(
        "archived {} file(s) from {} into {} ({bytes} bytes)",
        builder.len(),
        dir.as_ref().display(),
        archive_path.as_ref().display()
    );
    Ok(PackSummary { files: builder.len(), bytes })
}

/// Decode the archive file at `archive_path` and extract it into `dir`.
/// Nothing is written unless every entry validates.  Returns the file count.
pub fn unpack_archive<P: AsRef<Path>, Q: AsRef<Path>>(archive_path: P, dir: Q) -> io::Result<usize> {
    let buf = fs::read(archive_path.as_ref())?;
    let reader = ArchiveReader::new(&buf)?;
    let entries = reader.entries().collect::<Result<Vec<_>, _>>()?;

    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    for e in &entries {
        write_file(dir, e.path, e.data)?;
    }
    info!(
        "extracted {} file(s) from {} into {}",
        entries.len(),
        archive_path.as_ref().display(),
        dir.display()
    );
    Ok(entries.len())
}
