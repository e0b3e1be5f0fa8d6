mod commands;
mod logging;
mod reporter;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use media_sorter::config::{self, AppConfig};
use media_sorter::media::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use media_sorter::{Error, SortEngine};
use reporter::CliReporter;
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    dotenv().ok();
    let args = Cli::parse();

    let _guard = logging::init_logger();

    let mut config = match config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Some(Commands::Sort(sort_args)) => {
            sort_args.apply_to(&mut config);
            if let Err(err) = run_sort(config) {
                error!("Error: {:#}", err);
                return ExitCode::FAILURE;
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
        }
        Some(Commands::SupportedTypes) => {
            println!("images: {}", IMAGE_EXTENSIONS.join(", "));
            println!("videos: {}", VIDEO_EXTENSIONS.join(", "));
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    ExitCode::SUCCESS
}

/// Only errors that stop the whole run come back from here. Per-file
/// failures are part of the report.
fn run_sort(config: AppConfig) -> Result<(), Error> {
    let report_path = config.report_path.clone();
    let engine = SortEngine::new(config);
    let reporter = CliReporter::new();
    let report = engine.run(&reporter)?;

    let counters = report.counters();
    println!();
    info!(
        "{}{} scanned, {} moved, {} copied, {} duplicates, {} unsupported, {} failed",
        if report.dry_run() { "[DRY RUN] " } else { "" },
        format!("{}", counters.scanned).cyan(),
        format!("{}", counters.moved).green(),
        format!("{}", counters.copied).green(),
        format!("{}", counters.duplicate).yellow(),
        format!("{}", counters.skipped_unsupported).dimmed(),
        format!("{}", counters.failed).red(),
    );
    for failure in report.failures() {
        warn!(
            "{} {}",
            failure.path.display(),
            failure.error.as_deref().unwrap_or_default().red()
        );
    }

    if let Some(path) = report_path {
        // The sort itself already happened; a missing audit file is not fatal.
        match report
            .write_csv(&path)
            .with_context(|| format!("writing report to {}", path.display()))
        {
            Ok(()) => info!("Report written to {}", path.display()),
            Err(err) => error!("{:#}", err),
        }
    }

    Ok(())
}
