//! Directory discovery and parallel summarization
//!
//! # Architecture
//!
//! ```text
//!                     ┌──────────────────────────┐
//!                     │    SummaryCoordinator    │
//!                     │  - load prior summary    │
//!                     │  - TreeWalker (1 thread) │
//!                     └────────────┬─────────────┘
//!                                  │ DirTask queue (crossbeam)
//!       ┌──────────────────────────┼──────────────────────────┐
//!       │                          │                          │
//! ┌─────▼──────┐             ┌─────▼──────┐             ┌─────▼──────┐
//! │  Worker 1  │             │  Worker 2  │             │  Worker N  │
//! │ summarize  │             │ summarize  │             │ summarize  │
//! └─────┬──────┘             └─────┬──────┘             └─────┬──────┘
//!       └──────────────────────────┼──────────────────────────┘
//!                                  │ TaskResult channel
//!                     ┌────────────▼─────────────┐
//!                     │  merge + write summary   │
//!                     └──────────────────────────┘
//! ```

pub mod coordinator;
pub mod date;
pub mod discover;
pub mod worker;

pub use coordinator::{
    merge_results, MergeStats, SummaryCoordinator, SummaryProgress, SummaryRunResult,
};
pub use date::parse_dir_date;
pub use discover::{Discovery, TreeWalker, WalkDecision, LEAF_MARKER};
