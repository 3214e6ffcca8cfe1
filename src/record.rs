/// One file as exchanged between the collector, the container codec and the
/// extractor.  `path` is relative and `/`-separated; the archive stores it
/// with one extra leading slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub size: u64,
    pub data: Vec<u8>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        Self { path: path.into(), size: data.len() as u64, data }
    }

    /// Path as stored in the archive.  Always prepends exactly one `/`,
    /// even when `path` already starts with one.
    pub fn internal_path(&self) -> String {
        format!("/{}", self.path)
    }
}
