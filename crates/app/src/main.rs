//! bankprep - BDO statement exports to accounting import files
//!
//! Usage:
//!   bankprep process [--input-dir DIR] [--from-date YYYY-MM-DD] [--files F...] [--dry-run] [--json]
//!   bankprep monthly [--month YYYY-MM] [--yes] [--dry-run]

mod cli;
mod commands;
mod config;
mod discovery;
mod monthly;
mod output;

use anyhow::{Context, Result};
use bankprep_import::StatementParser;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use config::AppConfig;
use discovery::Discovery;

fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    // Priority: RUST_LOG env var > --log-level
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(level.to_lowercase())?
    };

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
    Ok(())
}

fn exit_code(succeeded: bool) -> ExitCode {
    if succeeded {
        tracing::info!("Processing completed successfully");
        ExitCode::SUCCESS
    } else {
        tracing::warn!("Some files failed or no files were processed");
        ExitCode::FAILURE
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_file.as_deref())?;

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let parser =
        StatementParser::new(config.parser.clone()).context("invalid parser configuration")?;

    match cli.command {
        Commands::Process {
            input_dir,
            from_date,
            files,
            dry_run,
            json,
        } => {
            let mut discovery = Discovery::new(&config.discovery)?;
            if let Some(dir) = input_dir {
                discovery = discovery.with_input_dir(dir);
            }
            tracing::info!("Input directory: {}", discovery.input_dir().display());
            tracing::info!("Dry run: {dry_run}");

            let processor = commands::Processor::new(&parser, &config.output, dry_run);
            let stats = if files.is_empty() {
                processor.process_all(&discovery, from_date)
            } else {
                processor.process_list(&discovery, &files)
            };
            commands::log_summary(&stats);
            commands::print_stats(&stats, json)?;
            Ok(exit_code(stats.succeeded()))
        }
        Commands::Monthly {
            input_dir,
            month,
            yes,
            dry_run,
        } => {
            let mut discovery = Discovery::new(&config.discovery)?;
            if let Some(dir) = input_dir {
                discovery = discovery.with_input_dir(dir);
            }
            let run = monthly::MonthlyRun {
                parser: &parser,
                output: &config.output,
                options: monthly::MonthlyOptions {
                    month,
                    yes,
                    dry_run,
                },
            };
            let mut stdout = std::io::stdout();
            let stats = run.run(&discovery, monthly::confirm_month, &mut stdout)?;
            monthly::print_summary(&stats, &mut stdout)?;
            Ok(exit_code(stats.succeeded()))
        }
    }
}
