//! Source records: the hand-written files an interface is generated from.

use crate::error::{IgenError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Modification time of `path` in whole seconds since the epoch.
///
/// Returns `Ok(None)` if the file does not exist. Sub-second precision is
/// dropped so cached values compare the same on every filesystem.
pub fn mtime_secs(path: &Path) -> io::Result<Option<u64>> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let modified = metadata.modified()?;
    // Pre-epoch timestamps clamp to 0, which is always "older than the cache".
    let secs = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Ok(Some(secs))
}

/// One physical input file and the mtime observed when the run started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    path: PathBuf,
    mtime: u64,
}

impl SourceRecord {
    /// Stats `path`. The file must exist.
    pub fn open(slug: &str, path: &Path) -> Result<Self> {
        match mtime_secs(path) {
            Ok(Some(mtime)) => Ok(Self {
                path: path.to_path_buf(),
                mtime,
            }),
            Ok(None) => Err(IgenError::SourceMissing {
                slug: slug.to_string(),
                path: path.to_path_buf(),
            }),
            Err(e) => Err(IgenError::io(path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mtime(&self) -> u64 {
        self.mtime
    }
}
