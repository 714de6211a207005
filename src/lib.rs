//! tdata-summary - Incremental Training-Data Summaries
//!
//! Walks large trees of `.npz` training-data archives and records, for each
//! data directory, the modification time and row count of every archive.
//! A previous summary can be supplied as a trusted cache so that only new or
//! recent directories are re-scanned.
//!
//! # Features
//!
//! - **Cache-Aware Discovery**: Directories present in the prior summary are
//!   never re-listed. Directories named `tdata`, or named after a date older
//!   than the cutoff, are summarized once and not descended into.
//!
//! - **Parallel Summarization**: A fixed-size pool of worker threads probes
//!   archive headers; only array headers are read, never array bodies.
//!
//! - **Failures Are Data**: Temp files, unreadable files and corrupt archives
//!   are recorded with a `null` row count and one warning line each.
//!
//! - **Safe Output**: The new summary is written in one piece (temp file +
//!   rename). When nothing changed the prior summary is copied byte-for-byte.
//!
//! # Architecture
//!
//! ```text
//!   prior summary ──► SummaryStore (read-only snapshot)
//!                          │
//!   DIR... ──────────► TreeWalker ──► dirs to summarize
//!                                          │
//!                       ┌──────────────────┼──────────────────┐
//!                       ▼                  ▼                  ▼
//!                  Worker 1           Worker 2    ...    Worker N
//!             DirectorySummarizer ──► HeaderProbe ──► npy header
//!                       └──────────────────┼──────────────────┘
//!                                          ▼
//!                              merge ──► new summary
//! ```
//!
//! # Example
//!
//! ```bash
//! # First run
//! tdata-summary /data/selfplay --new-summary-file summary.json
//!
//! # Incremental run trusting the previous output
//! tdata-summary /data/selfplay \
//!     --old-summary-file-to-assume-correct summary.json \
//!     --new-summary-file summary.next.json -w 16
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod progress;
pub mod summarize;
pub mod summary;
pub mod walker;

pub use config::{CliArgs, SummaryConfig};
pub use error::{Result, SummaryError};
pub use summarize::DirectorySummarizer;
pub use summary::{DirectorySummary, FileRecord, RowCount, RowCountFailure, SummaryStore};
pub use walker::{SummaryCoordinator, SummaryRunResult, TreeWalker, WalkDecision};
