//! Worker thread logic for parallel directory summarization
//!
//! Each worker:
//! - Pulls directory tasks from the task queue
//! - Summarizes the directory (no shared mutable state)
//! - Sends the summary, or a fatal error, back to the coordinator

use crate::error::{SummaryError, WorkerError};
use crate::summarize::DirectorySummarizer;
use crate::summary::DirectorySummary;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace};

/// A directory to summarize
#[derive(Debug, Clone)]
pub struct DirTask {
    /// Absolute, normalized directory path
    pub path: PathBuf,
}

impl DirTask {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Outcome of one task, sent back to the coordinator
#[derive(Debug)]
pub struct TaskResult {
    /// Worker that ran the task
    pub worker: usize,

    /// Directory of the task
    pub path: PathBuf,

    /// Summary, or the fatal error that stopped it
    pub outcome: Result<DirectorySummary, SummaryError>,
}

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Directories summarized
    pub dirs_summarized: AtomicU64,

    /// Rows found
    pub rows_found: AtomicU64,

    /// Files recorded without a row count
    pub files_failed: AtomicU64,

    /// Tasks that ended in a fatal error
    pub errors: AtomicU64,
}

impl WorkerStats {
    fn record_summary(&self, summary: &DirectorySummary) {
        self.dirs_summarized.fetch_add(1, Ordering::Relaxed);
        self.rows_found.fetch_add(summary.total_rows, Ordering::Relaxed);
        self.files_failed
            .fetch_add(summary.failed_files() as u64, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// A worker thread that processes directory tasks
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        summarizer: Arc<DirectorySummarizer>,
        task_rx: Receiver<DirTask>,
        result_tx: Sender<TaskResult>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("summarizer-{}", id))
            .spawn(move || {
                worker_loop(id, summarizer, task_rx, result_tx, shutdown, stats_clone)
            })
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                id: self.id,
                message: "Worker thread panicked".into(),
            }),
            None => Ok(()),
        }
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    summarizer: Arc<DirectorySummarizer>,
    task_rx: Receiver<DirTask>,
    result_tx: Sender<TaskResult>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
) {
    debug!(worker = id, "Worker starting");

    while !shutdown.load(Ordering::Relaxed) {
        let task = match task_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(task) => task,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let outcome = summarizer.summarize(&task.path);
        match &outcome {
            Ok(summary) => {
                trace!(
                    worker = id,
                    path = %task.path.display(),
                    rows = summary.total_rows,
                    "Directory summarized"
                );
                stats.record_summary(summary);
            }
            Err(_) => stats.record_error(),
        }

        let result = TaskResult {
            worker: id,
            path: task.path,
            outcome,
        };
        if result_tx.send(result).is_err() {
            // Coordinator stopped listening
            break;
        }
    }

    debug!(worker = id, "Worker exiting");
}

/// Sum stats across workers: (dirs, rows, failed files, errors)
pub fn aggregate_stats(workers: &[Worker]) -> (u64, u64, u64, u64) {
    workers.iter().fold((0, 0, 0, 0), |acc, w| {
        let s = w.stats();
        (
            acc.0 + s.dirs_summarized.load(Ordering::Relaxed),
            acc.1 + s.rows_found.load(Ordering::Relaxed),
            acc.2 + s.files_failed.load(Ordering::Relaxed),
            acc.3 + s.errors.load(Ordering::Relaxed),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use tempfile::tempdir;

    #[test]
    fn test_worker_processes_tasks_until_disconnect() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();

        let (task_tx, task_rx) = bounded(4);
        let (result_tx, result_rx) = bounded(4);
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = Worker::spawn(
            0,
            Arc::new(DirectorySummarizer::default()),
            task_rx,
            result_tx,
            Arc::clone(&shutdown),
        )
        .unwrap();

        task_tx.send(DirTask::new(dir.path().join("empty"))).unwrap();
        task_tx.send(DirTask::new(dir.path().join("missing"))).unwrap();
        drop(task_tx);

        let first = result_rx.recv().unwrap();
        assert!(first.outcome.is_ok());
        let second = result_rx.recv().unwrap();
        assert!(second.outcome.is_err());
        assert_eq!(second.path, dir.path().join("missing"));
        assert_eq!(second.worker, 0);

        let (dirs, rows, failed, errors) = aggregate_stats(std::slice::from_ref(&worker));
        assert_eq!((dirs, rows, failed, errors), (1, 0, 0, 1));
        worker.join().unwrap();
    }

    #[test]
    fn test_worker_stops_on_shutdown() {
        let (_task_tx, task_rx) = bounded::<DirTask>(1);
        let (result_tx, _result_rx) = bounded(1);
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = Worker::spawn(
            7,
            Arc::new(DirectorySummarizer::default()),
            task_rx,
            result_tx,
            Arc::clone(&shutdown),
        )
        .unwrap();
        assert_eq!(worker.id(), 7);

        shutdown.store(true, Ordering::SeqCst);
        worker.join().unwrap();
    }
}
