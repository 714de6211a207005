//! tdata-summary - Incremental Training-Data Summaries
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tdata_summary::config::{CliArgs, SummaryConfig};
use tdata_summary::progress::{print_header, print_summary, ProgressReporter};
use tdata_summary::walker::SummaryCoordinator;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = SummaryConfig::from_args(args).context("Invalid configuration")?;

    if config.show_progress {
        print_header(&config.roots, config.worker_count, &config.new_summary);
    }

    let progress = config.show_progress.then(ProgressReporter::new);

    let mut coordinator = SummaryCoordinator::new(config.clone());
    if let Some(p) = &progress {
        coordinator = coordinator.with_progress(p.clone());
    }

    // Setup signal handler for graceful shutdown
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let result = coordinator.run();

    if let Some(p) = &progress {
        match &result {
            Ok(_) => p.finish("Summary completed"),
            Err(_) => p.finish_and_clear(),
        }
    }

    let result = result.context("Summary run failed")?;

    if config.show_progress {
        print_summary(&result, &config.new_summary, Some(result.bytes_written));
    }

    info!(
        dirs = result.dirs_handled,
        rows = result.new_rows,
        failed_files = result.files_failed,
        "Added {} rows from {} directories",
        result.new_rows,
        result.dirs_handled
    );

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("tdata_summary=debug,warn")
    } else {
        EnvFilter::new("tdata_summary=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
