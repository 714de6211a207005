//! Error types for tdata-summary
//!
//! This module defines the error hierarchy for a summary run:
//! - Per-file probe failures (recoverable, turned into data by the summarizer)
//! - Summary store load/save errors
//! - Configuration and CLI errors
//! - Worker pool errors
//!
//! Per-file failures never abort a directory. Everything else propagates to
//! `main` and ends the run without writing a new summary.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a summary run
#[derive(Error, Debug)]
pub enum SummaryError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Summary store errors
    #[error("Summary store error: {0}")]
    Store(#[from] StoreError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Modification time of a candidate file could not be read
    #[error("Failed to read metadata for '{path}': {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory listing failed
    #[error("Failed to list directory '{path}': {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interrupted by signal
    #[error("Operation interrupted by signal")]
    Interrupted,
}

/// Failure to probe a single archive file
///
/// All variants are per-file failures: the summarizer records them as an
/// unknown row count and moves on to the next file.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Open denied by file permissions
    #[error("No permissions for reading file: '{path}'")]
    PermissionDenied { path: PathBuf },

    /// Container structure is not a readable archive
    #[error("Bad archive container '{path}': {reason}")]
    CorruptContainer { path: PathBuf, reason: String },

    /// Any other I/O failure opening the file
    #[error("Failed to open '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Array header decoding errors
#[derive(Error, Debug)]
pub enum NpyError {
    /// Stream does not start with the array magic
    #[error("Bad array magic")]
    BadMagic,

    /// Format version we do not understand
    #[error("Unsupported array format version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// Stream ended inside the header
    #[error("Truncated array header: {0}")]
    Truncated(#[from] std::io::Error),

    /// Header text could not be parsed
    #[error("Invalid array header: {0}")]
    InvalidHeader(String),
}

/// Summary store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Prior summary could not be read
    #[error("Failed to read summary '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Prior summary is not in the expected format
    #[error("Failed to parse summary '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// New summary could not be written
    #[error("Failed to write summary '{path}': {reason}")]
    Write { path: PathBuf, reason: String },

    /// Prior summary could not be copied to the new location
    #[error("Failed to copy summary '{from}' to '{to}': {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid cutoff
    #[error("Invalid cutoff of {days} days: must be a finite, non-negative number")]
    InvalidCutoff { days: f64 },

    /// No root directories given
    #[error("At least one directory to summarize is required")]
    NoRoots,

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Task queue send failed
    #[error("Failed to send task: queue closed")]
    QueueSendFailed,

    /// Worker initialization failed
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },

    /// Result channel closed before every task reported back
    #[error("Result channel closed with {missing} tasks outstanding")]
    ResultChannelClosed { missing: usize },
}

/// Result type alias for SummaryError
pub type Result<T> = std::result::Result<T, SummaryError>;

/// Result type alias for ProbeError
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Result type alias for StoreError
pub type StoreResult<T> = std::result::Result<T, StoreError>;
