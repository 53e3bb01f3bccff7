//! file-uploader - Parallel HTTP File Uploader
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use file_uploader::config::{CliArgs, UploadConfig};
use file_uploader::progress::{print_header, print_plan, print_summary};
use file_uploader::transport::HttpConnector;
use file_uploader::upload::UploadCoordinator;
use file_uploader::walker::{Collector, Target};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose, args.quiet)?;

    // Validate and create config
    let config = UploadConfig::from_args(args).context("Invalid configuration")?;

    if config.dry_run {
        return run_dry(&config);
    }

    let connector = HttpConnector::new(config.endpoint.clone(), config.timeout);
    let coordinator = UploadCoordinator::new(config.clone(), connector)
        .context("Failed to initialize uploader")?;

    // Setup signal handler for graceful shutdown
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, finishing in-flight uploads...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    if config.show_progress {
        print_header(&config, coordinator.target());
    }

    let result = coordinator.run().context("Upload failed")?;

    if config.show_progress {
        print_summary(&result);
    }

    if !result.completed {
        info!("Upload was interrupted before completion");
    }

    Ok(ExitCode::from(result.exit_code() as u8))
}

/// List what would be uploaded without contacting the server
fn run_dry(config: &UploadConfig) -> Result<ExitCode> {
    let target = Target::resolve(&config.target).context("Invalid configuration")?;

    if config.show_progress {
        print_header(config, &target);
    }

    let collector = Collector::new(target, config);
    print_plan(collector.discover());

    Ok(ExitCode::SUCCESS)
}

fn setup_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("file_uploader=debug,warn")
    } else {
        EnvFilter::new("file_uploader=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
