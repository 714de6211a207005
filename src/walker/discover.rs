//! Cache-aware discovery of directories to summarize
//!
//! Walks each root depth-first (following symbolic links) and decides per
//! directory whether to reuse the prior summary, collect it, or descend:
//!
//! ```text
//! in cache?            -> PruneCached  (skip subtree)
//! name == leaf marker? -> Collect      (summarize, skip subtree)
//! name is an old date? -> PruneStale   (summarize, skip subtree)
//! otherwise            -> Descend
//! ```
//!
//! Roots themselves are always descended into. The cache is a read-only
//! snapshot for the whole walk.

use crate::error::Result;
use crate::summary::{absolute_normalized, path_key, SummaryStore};
use crate::walker::date::parse_dir_date;
use chrono::{NaiveDateTime, TimeDelta};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Conventional name of a terminal data directory
pub const LEAF_MARKER: &str = "tdata";

/// Per-directory outcome of the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkDecision {
    /// Recurse into children
    Descend,
    /// Already summarized in the prior run
    PruneCached,
    /// Dated long enough ago to be final; summarize once
    PruneStale,
    /// Terminal data directory; summarize
    Collect,
}

impl WalkDecision {
    /// Whether the directory is added to the result set
    pub fn is_collected(&self) -> bool {
        matches!(self, WalkDecision::PruneStale | WalkDecision::Collect)
    }

    /// Whether the walk continues below the directory
    pub fn descends(&self) -> bool {
        matches!(self, WalkDecision::Descend)
    }
}

/// Directories found by a walk
#[derive(Debug, Default, Clone)]
pub struct Discovery {
    /// Directories needing (re)summarization, in walk order
    pub dirs: Vec<PathBuf>,

    /// Directories visited below the roots
    pub visited: u64,

    /// Subtrees skipped because they were cached
    pub cached: u64,

    /// Directories collected by the leaf marker
    pub leaves: u64,

    /// Directories collected by the stale-date rule
    pub stale: u64,

    /// Traversal errors that were skipped
    pub errors: u64,
}

/// Walks root trees against a cache snapshot
pub struct TreeWalker<'a> {
    cache: &'a SummaryStore,
    leaf_marker: String,
    stale_before: NaiveDateTime,
}

impl<'a> TreeWalker<'a> {
    /// Create a walker; directories dated before `now - cutoff` are stale
    ///
    /// A cutoff reaching past the earliest representable date marks nothing
    /// as stale.
    pub fn new(
        cache: &'a SummaryStore,
        leaf_marker: impl Into<String>,
        cutoff: TimeDelta,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            cache,
            leaf_marker: leaf_marker.into(),
            stale_before: now
                .checked_sub_signed(cutoff)
                .unwrap_or(NaiveDateTime::MIN),
        }
    }

    /// Decide what to do with one directory
    ///
    /// `key` is the directory's absolute, normalized path and `name` its
    /// base name.
    pub fn classify(&self, key: &str, name: &str) -> WalkDecision {
        if self.cache.contains(key) {
            return WalkDecision::PruneCached;
        }
        if name == self.leaf_marker {
            return WalkDecision::Collect;
        }
        match parse_dir_date(name) {
            Some(when) if when < self.stale_before => WalkDecision::PruneStale,
            _ => WalkDecision::Descend,
        }
    }

    /// Walk every root and return the directories to summarize
    pub fn discover(&self, roots: &[PathBuf]) -> Result<Discovery> {
        let mut discovery = Discovery::default();
        let mut seen: HashSet<String> = HashSet::new();

        for root in roots {
            self.walk_root(root, &mut discovery, &mut seen)?;
        }

        debug!(
            dirs = discovery.dirs.len(),
            visited = discovery.visited,
            cached = discovery.cached,
            "Discovery finished"
        );
        Ok(discovery)
    }

    fn walk_root(
        &self,
        root: &Path,
        discovery: &mut Discovery,
        seen: &mut HashSet<String>,
    ) -> Result<()> {
        let root = absolute_normalized(root)?;
        let mut entries = WalkDir::new(&root)
            .follow_links(true)
            .min_depth(1)
            .into_iter();

        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "Skipping unreadable path");
                    discovery.errors += 1;
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }
            discovery.visited += 1;

            let key = path_key(entry.path());
            let name = entry.file_name().to_string_lossy();
            let decision = self.classify(&key, &name);

            match decision {
                WalkDecision::Descend => continue,
                WalkDecision::PruneCached => discovery.cached += 1,
                WalkDecision::Collect => discovery.leaves += 1,
                WalkDecision::PruneStale => discovery.stale += 1,
            }

            if decision.is_collected() && seen.insert(key) {
                discovery.dirs.push(entry.path().to_path_buf());
            }
            entries.skip_current_dir();
        }

        Ok(())
    }
}
