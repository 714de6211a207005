//! Progress reporting for a summary run
//!
//! Provides a progress bar over the directories being summarized, timed
//! phase log lines, and the final summary block.

use crate::walker::{SummaryProgress, SummaryRunResult};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// Progress reporter that displays summarization status
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &SummaryProgress) {
        let msg = format!(
            "Dirs: {}/{} | Rows: {} | Failed files: {} | Rate: {:.1} dirs/s",
            format_number(progress.dirs_done),
            format_number(progress.dirs_total),
            format_number(progress.rows),
            format_number(progress.files_failed),
            progress.dirs_per_second(),
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs "Beginning: ..." on creation and "Finished: ... in N seconds" on drop
pub struct PhaseTimer {
    task: String,
    start: Instant,
}

impl PhaseTimer {
    pub fn start(task: impl Into<String>) -> Self {
        let task = task.into();
        info!("Beginning: {}", task);
        Self {
            task,
            start: Instant::now(),
        }
    }

    /// Time since the phase began
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        info!(
            "Finished: {} in {:.3} seconds",
            self.task,
            self.start.elapsed().as_secs_f64()
        );
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Print a summary of the run
pub fn print_summary(result: &SummaryRunResult, output: &PathBuf, output_size: Option<u64>) {
    let secs = result.duration.as_secs_f64();

    println!();
    println!("{}", style("Summary Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {} new, {} cached",
        style("Directories:").bold(),
        format_number(result.dirs_handled),
        format_number(result.dirs_cached),
    );
    println!(
        "  {} {}",
        style("Files recorded:").bold(),
        format_number(result.files_recorded)
    );
    println!(
        "  {} {}",
        style("New rows:").bold(),
        format_number(result.new_rows)
    );
    println!("  {} {:.1}s", style("Duration:").bold(), secs);
    if result.files_failed > 0 {
        println!(
            "  {} {}",
            style("Files without rows:").yellow().bold(),
            format_number(result.files_failed)
        );
    }

    let how = if result.copied_prior {
        " (copied from prior summary)"
    } else {
        ""
    };
    match output_size {
        Some(size) => println!(
            "  {} {} ({}){}",
            style("Summary:").bold(),
            output.display(),
            format_size(size, BINARY),
            how
        ),
        None => println!("  {} {}{}", style("Summary:").bold(), output.display(), how),
    }
    println!();
}

/// Print a header at the start of the run
pub fn print_header(roots: &[PathBuf], workers: usize, output: &PathBuf) {
    println!();
    println!(
        "{} {}",
        style("tdata-summary").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    for root in roots {
        println!("  {} {}", style("Source:").bold(), root.display());
    }
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {} {}", style("Output:").bold(), output.display());
    println!();
}
