//! Summary coordinator - orchestrates an incremental summary run
//!
//! The coordinator is responsible for:
//! - Loading the prior summary as a read-only cache snapshot
//! - Discovering directories that need (re)summarization
//! - Fanning directories out to a fixed-size worker pool
//! - Merging results into the store on the coordinating thread
//! - Writing the new summary, or copying the prior one when nothing changed

use crate::archive::HeaderProbe;
use crate::config::SummaryConfig;
use crate::error::{Result, SummaryError, WorkerError};
use crate::progress::{PhaseTimer, ProgressReporter};
use crate::summarize::DirectorySummarizer;
use crate::summary::{copy_verbatim, DirectorySummary, SummaryStore};
use crate::walker::discover::TreeWalker;
use crate::walker::worker::{aggregate_stats, DirTask, TaskResult, Worker};
use chrono::Local;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a completed run
#[derive(Debug, Clone, Default)]
pub struct SummaryRunResult {
    /// Directories summarized in this run
    pub dirs_handled: u64,

    /// Subtrees reused from the prior summary
    pub dirs_cached: u64,

    /// Directories in the written summary
    pub dirs_total: usize,

    /// Rows found in directories summarized in this run
    pub new_rows: u64,

    /// File records produced in this run
    pub files_recorded: u64,

    /// File records without a row count produced in this run
    pub files_failed: u64,

    /// Whether the prior summary was copied verbatim
    pub copied_prior: bool,

    /// Size of the written summary
    pub bytes_written: u64,

    /// Time taken for the run
    pub duration: Duration,
}

/// Progress information for display
#[derive(Debug, Clone, Default)]
pub struct SummaryProgress {
    /// Directories summarized so far
    pub dirs_done: u64,

    /// Directories to summarize
    pub dirs_total: u64,

    /// Rows found so far
    pub rows: u64,

    /// Files without a row count so far
    pub files_failed: u64,

    /// Elapsed time
    pub elapsed: Duration,
}

impl SummaryProgress {
    /// Calculate dirs per second rate
    pub fn dirs_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.dirs_done as f64 / secs
        } else {
            0.0
        }
    }
}

/// Totals from merging fresh summaries into the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub dirs: u64,
    pub new_rows: u64,
    pub files_recorded: u64,
    pub files_failed: u64,
}

/// Insert fresh summaries into the store, overwriting existing keys
pub fn merge_results(store: &mut SummaryStore, summaries: Vec<DirectorySummary>) -> MergeStats {
    let mut stats = MergeStats::default();
    for summary in summaries {
        stats.dirs += 1;
        stats.new_rows += summary.total_rows;
        stats.files_recorded += summary.records.len() as u64;
        stats.files_failed += summary.failed_files() as u64;
        store.insert(summary);
    }
    stats
}

/// Coordinates an incremental summary run
pub struct SummaryCoordinator {
    /// Configuration
    config: Arc<SummaryConfig>,

    /// Shared, stateless per-directory summarizer
    summarizer: Arc<DirectorySummarizer>,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,

    /// Optional progress display
    progress: Option<ProgressReporter>,
}

impl SummaryCoordinator {
    /// Create a new coordinator
    pub fn new(config: SummaryConfig) -> Self {
        let summarizer = DirectorySummarizer::new(HeaderProbe::new(config.primary_entry.clone()));
        Self {
            config: Arc::new(config),
            summarizer: Arc::new(summarizer),
            shutdown: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Attach a progress display
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run the summary pipeline
    pub fn run(self) -> Result<SummaryRunResult> {
        let start = Instant::now();
        let config = Arc::clone(&self.config);

        info!(
            roots = config.roots.len(),
            workers = config.worker_count,
            "Starting summary run"
        );

        let prior = config.existing_prior_summary().cloned();
        let mut store = match &prior {
            Some(path) => {
                self.set_status("Loading prior summary...");
                let _phase = PhaseTimer::start(format!("Loading {}", path.display()));
                SummaryStore::load(path)?
            }
            None => SummaryStore::new(),
        };
        debug!(
            dirs = store.len(),
            rows = store.total_rows(),
            "Cache snapshot ready"
        );

        self.set_status("Finding directories...");
        let discovery = {
            let _phase = PhaseTimer::start("Finding files");
            TreeWalker::new(
                &store,
                config.leaf_marker.as_str(),
                config.cutoff,
                Local::now().naive_local(),
            )
            .discover(&config.roots)?
        };
        self.check_shutdown()?;

        info!(
            dirs = discovery.dirs.len(),
            cached = discovery.cached,
            leaves = discovery.leaves,
            stale = discovery.stale,
            "Found directories to summarize"
        );

        let summaries = {
            let _phase = PhaseTimer::start(format!(
                "Parallel summarizing {} dirs",
                discovery.dirs.len()
            ));
            self.summarize_all(&discovery.dirs)?
        };

        let merged = {
            let _phase = PhaseTimer::start(format!("Merging {} results", summaries.len()));
            merge_results(&mut store, summaries)
        };

        let output = &config.new_summary;
        let (copied_prior, bytes_written) = match &prior {
            Some(prior) if discovery.dirs.is_empty() => {
                let bytes = copy_verbatim(prior, output)?;
                info!("Not writing any new summary, no results, just copying old file");
                (true, bytes)
            }
            _ => {
                let bytes = {
                    let _phase = PhaseTimer::start("Writing result");
                    store.save(output)?
                };
                info!(
                    "Summary file written adding {} additional rows: {}",
                    merged.new_rows,
                    output.display()
                );
                (false, bytes)
            }
        };

        info!("Done computing new summary");

        Ok(SummaryRunResult {
            dirs_handled: merged.dirs,
            dirs_cached: discovery.cached,
            dirs_total: store.len(),
            new_rows: merged.new_rows,
            files_recorded: merged.files_recorded,
            files_failed: merged.files_failed,
            copied_prior,
            bytes_written,
            duration: start.elapsed(),
        })
    }

    /// Summarize every directory on the worker pool
    fn summarize_all(&self, dirs: &[PathBuf]) -> Result<Vec<DirectorySummary>> {
        if dirs.is_empty() {
            return Ok(Vec::new());
        }

        let worker_count = self.config.worker_count.clamp(1, dirs.len());

        // Every task is queued up front; workers exit once the queue drains
        let (task_tx, task_rx) = bounded::<DirTask>(dirs.len());
        for dir in dirs {
            task_tx
                .send(DirTask::new(dir.clone()))
                .map_err(|_| WorkerError::QueueSendFailed)?;
        }
        drop(task_tx);

        let (result_tx, result_rx) = bounded::<TaskResult>(worker_count * 2);

        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            workers.push(Worker::spawn(
                id,
                Arc::clone(&self.summarizer),
                task_rx.clone(),
                result_tx.clone(),
                Arc::clone(&self.shutdown),
            )?);
        }
        drop(task_rx);
        drop(result_tx);
        debug!(count = workers.len(), "Workers spawned");

        let collected = self.collect_results(&result_rx, dirs.len());
        if collected.is_err() {
            self.shutdown.store(true, Ordering::SeqCst);
        }
        drop(result_rx);

        let (dirs_done, rows, failed, errors) = aggregate_stats(&workers);
        debug!(
            dirs = dirs_done,
            rows = rows,
            failed_files = failed,
            errors = errors,
            "Worker totals"
        );

        for worker in workers {
            let id = worker.id();
            if let Err(e) = worker.join() {
                warn!(worker = id, error = %e, "Worker failed to join cleanly");
            }
        }

        collected
    }

    /// Receive one result per task, stopping at the first fatal error
    fn collect_results(
        &self,
        result_rx: &Receiver<TaskResult>,
        expected: usize,
    ) -> Result<Vec<DirectorySummary>> {
        let start = Instant::now();
        let mut summaries = Vec::with_capacity(expected);
        let mut progress = SummaryProgress {
            dirs_total: expected as u64,
            ..Default::default()
        };

        while summaries.len() < expected {
            self.check_shutdown()?;

            let result = match result_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(WorkerError::ResultChannelClosed {
                        missing: expected - summaries.len(),
                    }
                    .into())
                }
            };

            let summary = match result.outcome {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(
                        worker = result.worker,
                        path = %result.path.display(),
                        error = %e,
                        "Directory failed, stopping run"
                    );
                    return Err(e);
                }
            };

            progress.dirs_done += 1;
            progress.rows += summary.total_rows;
            progress.files_failed += summary.failed_files() as u64;
            progress.elapsed = start.elapsed();
            if let Some(reporter) = &self.progress {
                reporter.update(&progress);
            }

            summaries.push(summary);
        }

        Ok(summaries)
    }

    fn check_shutdown(&self) -> Result<()> {
        if self.shutdown.load(Ordering::Relaxed) {
            info!("Shutdown signal received");
            return Err(SummaryError::Interrupted);
        }
        Ok(())
    }

    fn set_status(&self, status: &str) {
        if let Some(reporter) = &self.progress {
            reporter.set_status(status);
        }
    }
}
