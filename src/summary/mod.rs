//! Summary data model and persistence

pub mod store;
pub mod types;

pub use store::{absolute_normalized, copy_verbatim, path_key, SummaryStore};
pub use types::{DirectorySummary, FileRecord, RowCount, RowCountFailure};
