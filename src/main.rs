//! Sinta-Harvest main entry point
//!
//! This is the command-line interface for the Sinta-Harvest publication harvester.

use anyhow::Context;
use clap::Parser;
use sinta_harvest::config::{load_config_with_hash, validate, validate_page_range, Config};
use sinta_harvest::crawler::{shutdown_channel, Driver, RunOptions, RunReport, ShutdownSignal};
use sinta_harvest::output::print_summary;
use sinta_harvest::RunState;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status reported when a harvest is interrupted (128 + SIGINT)
const EXIT_INTERRUPTED: u8 = 130;

/// Sinta-Harvest: a resumable publication listing harvester
///
/// Sinta-Harvest walks a paginated publication directory, extracts one record
/// per listed publication, and keeps a checkpoint so that an interrupted run
/// picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "sinta-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable publication listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// First page to fetch, overriding the checkpoint and the configured start
    #[arg(long, value_name = "PAGE")]
    start: Option<u32>,

    /// Last page to fetch, overriding the configured end
    #[arg(long, value_name = "PAGE")]
    end: Option<u32>,

    /// Discard any existing checkpoint before starting
    #[arg(long)]
    reset: bool,

    /// Start without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_ref())?;

    let options = RunOptions {
        start_page: cli.start,
        end_page: cli.end,
        reset_checkpoint: cli.reset,
    };
    if let Some(start) = options.start_page {
        let end = options.end_page.unwrap_or(config.range.end_page);
        validate_page_range(start, end).context("Invalid page range")?;
    }

    if !cli.yes && !confirm(&config, &options)? {
        println!("Harvest cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current step and saving progress");
            trigger.trigger();
        }
    });

    let mut driver = Driver::new(config, options, shutdown);
    let report = driver.run().await.context("Harvest failed")?;

    report_outcome(&report);

    Ok(match report.state {
        RunState::Interrupted => ExitCode::from(EXIT_INTERRUPTED),
        _ => ExitCode::SUCCESS,
    })
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sinta_harvest=info,warn"),
            1 => EnvFilter::new("sinta_harvest=debug,info"),
            2 => EnvFilter::new("sinta_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or falls back to the built-in defaults
fn load_configuration(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using built-in defaults");
        let config = Config::default();
        validate(&config).context("Built-in configuration is invalid")?;
        return Ok(config);
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Shows what is about to run and asks for confirmation on stdin
fn confirm(config: &Config, options: &RunOptions) -> anyhow::Result<bool> {
    let end = options.end_page.unwrap_or(config.range.end_page);

    println!("=== Sinta-Harvest ===\n");
    println!("Source: {}", config.source.base_url);
    if options.reset_checkpoint {
        let start = options.start_page.unwrap_or(config.range.start_page);
        println!("Pages: {} - {} (checkpoint will be discarded)", start, end);
    } else {
        // Planning without reset only reads the checkpoint
        let preview = Driver::new(config.clone(), options.clone(), ShutdownSignal::never());
        let plan = preview.plan().context("Failed to plan harvest")?;
        match plan.resumed_from {
            Some(last_page) => println!(
                "Pages: {} - {} (resuming after page {} with {} records)",
                plan.range.start,
                plan.range.end,
                last_page,
                plan.seed.records().len()
            ),
            None => println!("Pages: {} - {}", plan.range.start, plan.range.end),
        }
        let skipped = plan.seed.unfetched_pages();
        if !skipped.is_empty() {
            println!(
                "Previously skipped pages ({}), not retried without --start: {:?}",
                skipped.len(),
                skipped
            );
        }
    }
    println!("Output: {}", config.output.directory.display());

    print!("\nStart harvesting? [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Prints the run outcome and summary statistics
fn report_outcome(report: &RunReport) {
    match report.state {
        RunState::Completed => println!("\n✓ Harvest completed"),
        RunState::Interrupted => println!(
            "\n! Harvest interrupted after page {}; rerun to resume",
            report
                .last_page
                .map(|page| page.to_string())
                .unwrap_or_else(|| "-".to_string())
        ),
        other => println!("\nHarvest ended in state {}", other),
    }

    if !report.unfetched_pages.is_empty() {
        println!(
            "Pages skipped after retries ({}): {:?}",
            report.unfetched_pages.len(),
            report.unfetched_pages
        );
    }
    if !report.empty_pages.is_empty() {
        println!(
            "Pages without records ({}): {:?}",
            report.empty_pages.len(),
            report.empty_pages
        );
    }
    for path in &report.exports {
        println!("Exported: {}", path.display());
    }

    println!();
    print_summary(&report.summary);
}
