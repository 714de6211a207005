//! Configuration types for tdata-summary
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::archive::PRIMARY_ENTRY;
use crate::error::ConfigError;
use crate::walker::discover::LEAF_MARKER;
use chrono::TimeDelta;
use clap::Parser;
use std::path::PathBuf;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Default number of parallel summarizers
pub const DEFAULT_WORKERS: usize = 4;

/// Default age after which a dated directory is considered final
pub const DEFAULT_CUTOFF_DAYS: f64 = 2.0;

/// Incrementally summarize row counts of training-data archives
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tdata-summary",
    version,
    about = "Incrementally summarize row counts of training-data archives",
    long_about = "Walks directory trees of .npz training data and records, per data directory,\n\
                  the modification time and row count of every archive file.\n\n\
                  Directories already present in a prior summary are trusted and skipped, so\n\
                  only new or recent directories are re-scanned.",
    after_help = "EXAMPLES:\n    \
        tdata-summary /data/selfplay --new-summary-file summary.json\n    \
        tdata-summary /data/selfplay /data/extra \\\n        \
            --old-summary-file-to-assume-correct summary.json \\\n        \
            --new-summary-file summary.new.json -w 16"
)]
pub struct CliArgs {
    /// Directories of training data files
    #[arg(value_name = "DIR", required = true, num_args = 1..)]
    pub dirs: Vec<PathBuf>,

    /// Summary json file for directory contents, trusted as correct
    #[arg(long, value_name = "FILE")]
    pub old_summary_file_to_assume_correct: Option<PathBuf>,

    /// Summary json file to write
    #[arg(long, required = true, value_name = "FILE")]
    pub new_summary_file: PathBuf,

    /// Number of parallel workers
    #[arg(
        short = 'w',
        long = "num-parallel-processes",
        default_value_t = DEFAULT_WORKERS,
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Dated directories older than this many days are summarized once and not descended
    #[arg(long, default_value_t = DEFAULT_CUTOFF_DAYS, value_name = "DAYS")]
    pub cutoff_days: f64,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (per-file debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    /// Root trees to walk
    pub roots: Vec<PathBuf>,

    /// Prior summary trusted as a cache
    pub prior_summary: Option<PathBuf>,

    /// Output summary path
    pub new_summary: PathBuf,

    /// Number of worker threads
    pub worker_count: usize,

    /// Age after which dated directories are final
    pub cutoff: TimeDelta,

    /// Name of terminal data directories
    pub leaf_marker: String,

    /// Archive entry carrying the row count
    pub primary_entry: String,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl SummaryConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.dirs.is_empty() {
            return Err(ConfigError::NoRoots);
        }

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        let cutoff = cutoff_from_days(args.cutoff_days)?;

        if let Some(parent) = args.new_summary_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(ConfigError::InvalidOutputPath {
                    path: args.new_summary_file.clone(),
                    reason: format!("Parent directory '{}' does not exist", parent.display()),
                });
            }
        }
        if args.new_summary_file.is_dir() {
            return Err(ConfigError::InvalidOutputPath {
                path: args.new_summary_file.clone(),
                reason: "Path is a directory".to_string(),
            });
        }

        Ok(Self {
            roots: args.dirs,
            prior_summary: args.old_summary_file_to_assume_correct,
            new_summary: args.new_summary_file,
            worker_count: args.workers,
            cutoff,
            leaf_marker: LEAF_MARKER.to_string(),
            primary_entry: PRIMARY_ENTRY.to_string(),
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }

    /// Create a configuration with defaults for everything but paths
    pub fn new(roots: Vec<PathBuf>, prior_summary: Option<PathBuf>, new_summary: PathBuf) -> Self {
        Self {
            roots,
            prior_summary,
            new_summary,
            worker_count: DEFAULT_WORKERS,
            cutoff: TimeDelta::days(2),
            leaf_marker: LEAF_MARKER.to_string(),
            primary_entry: PRIMARY_ENTRY.to_string(),
            show_progress: false,
            verbose: false,
        }
    }

    /// Prior summary path, only if the file exists
    pub fn existing_prior_summary(&self) -> Option<&PathBuf> {
        self.prior_summary.as_ref().filter(|p| p.is_file())
    }
}

fn cutoff_from_days(days: f64) -> Result<TimeDelta, ConfigError> {
    if !days.is_finite() || days < 0.0 {
        return Err(ConfigError::InvalidCutoff { days });
    }
    let millis = days * 24.0 * 60.0 * 60.0 * 1000.0;
    if millis > i64::MAX as f64 {
        return Err(ConfigError::InvalidCutoff { days });
    }
    TimeDelta::try_milliseconds(millis.round() as i64).ok_or(ConfigError::InvalidCutoff { days })
}
