//! Persisted summary store
//!
//! The store maps absolute directory paths to their file records and is the
//! only state carried between runs. On disk it is one JSON object:
//!
//! ```json
//! {"/data/run1/tdata": [["a.npz", 1700000000.5, 250], ["b_tmp.npz", 1700000001.0, null]]}
//! ```
//!
//! Writes go to a temporary file in the destination directory which is then
//! renamed over the target, so readers see either the old file or a complete
//! new one.

use crate::error::{StoreError, StoreResult};
use crate::summary::types::{DirectorySummary, FileRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// Directory path -> file records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryStore {
    dirs: BTreeMap<String, Vec<FileRecord>>,
}

impl SummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store written by a previous run
    pub fn load(path: &Path) -> StoreResult<Self> {
        let bytes = fs::read(path).map_err(|e| StoreError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Serialize and atomically replace `path`
    pub fn save(&self, path: &Path) -> StoreResult<u64> {
        let bytes = serde_json::to_vec(self).map_err(|e| StoreError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_atomically(path, &bytes)?;
        Ok(bytes.len() as u64)
    }

    /// Whether `key` (an absolute, normalized path) is present
    pub fn contains(&self, key: &str) -> bool {
        self.dirs.contains_key(key)
    }

    /// Records for a directory
    pub fn get(&self, key: &str) -> Option<&[FileRecord]> {
        self.dirs.get(key).map(Vec::as_slice)
    }

    /// Insert or overwrite the records of a summarized directory
    pub fn insert(&mut self, summary: DirectorySummary) -> Option<Vec<FileRecord>> {
        let key = path_key(&summary.dir_path);
        self.dirs.insert(key, summary.records)
    }

    /// Number of directories
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Iterate directories in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FileRecord])> {
        self.dirs.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Sum of known row counts across every directory
    pub fn total_rows(&self) -> u64 {
        self.dirs
            .values()
            .flatten()
            .filter_map(|r| r.row_count.known())
            .sum()
    }
}

/// Copy a prior summary byte-for-byte to a new location
pub fn copy_verbatim(from: &Path, to: &Path) -> StoreResult<u64> {
    let bytes = fs::read(from).map_err(|e| StoreError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    })?;
    write_atomically(to, &bytes)?;
    Ok(bytes.len() as u64)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let write_err = |reason: String| StoreError::Write {
        path: path.to_path_buf(),
        reason,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| write_err(e.to_string()))?;
    tmp.write_all(bytes).map_err(|e| write_err(e.to_string()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| write_err(e.to_string()))?;
    tmp.persist(path).map_err(|e| write_err(e.error.to_string()))?;
    Ok(())
}

/// Make `path` absolute and resolve `.` and `..` lexically
///
/// Symbolic links are not resolved.
pub fn absolute_normalized(path: &Path) -> std::io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Ok(out)
}

/// Store key for an already absolute, normalized path
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
