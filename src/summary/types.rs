//! Record types for directory summaries
//!
//! A file record persists as a JSON 3-array `[filename, mtime, rows|null]`.
//! In memory the row count keeps the reason it is unknown so that warnings
//! and tests can tell failure classes apart.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// Why a file has no row count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowCountFailure {
    /// Name looks like an in-progress write
    TempFile,
    /// File could not be opened due to permissions
    PermissionDenied,
    /// File is not a valid archive container
    CorruptContainer,
    /// File could not be opened for another reason
    Unreadable,
    /// Archive has no entries
    EmptyContainer,
    /// One or more array headers failed to decode
    MalformedEntries,
    /// Primary input tensor entry is absent
    MissingPrimaryEntry,
    /// Loaded as `null` from a prior summary; the reason was not persisted
    Unrecorded,
}

impl RowCountFailure {
    /// Short name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            RowCountFailure::TempFile => "temp file",
            RowCountFailure::PermissionDenied => "permission denied",
            RowCountFailure::CorruptContainer => "bad zip file",
            RowCountFailure::Unreadable => "unreadable",
            RowCountFailure::EmptyContainer => "empty archive",
            RowCountFailure::MalformedEntries => "bad npz headers",
            RowCountFailure::MissingPrimaryEntry => "missing primary entry",
            RowCountFailure::Unrecorded => "unrecorded",
        }
    }
}

impl fmt::Display for RowCountFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row count of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCount {
    Known(u64),
    Unknown(RowCountFailure),
}

impl RowCount {
    /// Row count if known
    pub fn known(&self) -> Option<u64> {
        match self {
            RowCount::Known(n) => Some(*n),
            RowCount::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, RowCount::Known(_))
    }
}

impl From<Option<u64>> for RowCount {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(n) => RowCount::Known(n),
            None => RowCount::Unknown(RowCountFailure::Unrecorded),
        }
    }
}

/// One archive file inside a summarized directory
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Base name of the file
    pub filename: String,

    /// Modification time, seconds since the epoch
    pub mtime: f64,

    /// Row count or failure class
    pub row_count: RowCount,
}

impl FileRecord {
    pub fn new(filename: impl Into<String>, mtime: f64, row_count: RowCount) -> Self {
        Self {
            filename: filename.into(),
            mtime,
            row_count,
        }
    }
}

impl Serialize for FileRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.filename, self.mtime, self.row_count.known()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FileRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (filename, mtime, rows) = <(String, f64, Option<u64>)>::deserialize(deserializer)?;
        Ok(Self {
            filename,
            mtime,
            row_count: RowCount::from(rows),
        })
    }
}

/// Result of summarizing one directory
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySummary {
    /// Directory that was summarized (absolute, normalized)
    pub dir_path: PathBuf,

    /// Records in directory-listing order
    pub records: Vec<FileRecord>,

    /// Sum of known row counts
    pub total_rows: u64,
}

impl DirectorySummary {
    /// Number of files recorded without a row count
    pub fn failed_files(&self) -> usize {
        self.records
            .iter()
            .filter(|r| !r.row_count.is_known())
            .count()
    }
}
