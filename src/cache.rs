//! Persistent check cache.
//!
//! Maps each interface's generated path to the time it was last verified:
//!
//! ```json
//! { "src/togo/kvs/kvs.gen_interface": { "check_time": 1700000000 } }
//! ```
//!
//! The cache is read once at the start of a run and replaced wholesale at
//! the end of a successful one. It is never written incrementally, so a run
//! that fails part-way leaves the previous cache untouched.

use crate::error::{IgenError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub check_time: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CheckCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl CheckCache {
    /// Reads the cache at `path`. A missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(IgenError::io(path, e)),
        };
        serde_json::from_str(&text).map_err(|e| IgenError::CacheCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Replaces the cache at `path`.
    ///
    /// Writes a sibling temporary file and renames it over the old cache so
    /// readers never observe a truncated file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| IgenError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| {
            IgenError::io(path, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = Path::new(&tmp);

        fs::write(tmp, json + "\n").map_err(|e| IgenError::io(tmp, e))?;
        fs::rename(tmp, path).map_err(|e| IgenError::io(path, e))?;
        Ok(())
    }

    /// Deletes the cache file. Returns whether one existed.
    pub fn remove(path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(IgenError::io(path, e)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Last check time for `key`, 0 if it was never checked.
    pub fn check_time(&self, key: &str) -> u64 {
        self.get(key).map(|e| e.check_time).unwrap_or(0)
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
