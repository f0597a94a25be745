//! Command-line definitions. Implementations live in `commands` and `monthly`.

use std::path::PathBuf;

use bankprep_core::Month;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Prepare bank statement exports for accounting import
#[derive(Parser)]
#[command(name = "bankprep")]
#[command(about = "Normalize BDO statement CSV exports into import-ready files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG when set
    #[arg(
        long,
        global = true,
        default_value = "info",
        value_parser = ["error", "warn", "info", "debug", "trace"],
        ignore_case = true
    )]
    pub log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert every eligible statement into its own import file
    Process {
        /// Directory containing statement exports
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Only process statements dated on or after this day (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<NaiveDate>,

        /// Process these files instead of scanning the input directory
        #[arg(long, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Report what would be written without touching any file
        #[arg(long)]
        dry_run: bool,

        /// Print run statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Combine new statements for one month into a single import file
    Monthly {
        /// Directory containing statement exports
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Target month (YYYY-MM); detected from file names when omitted
        #[arg(long)]
        month: Option<Month>,

        /// Accept the detected month without asking
        #[arg(short, long)]
        yes: bool,

        /// Report what would be written without touching any file
        #[arg(long)]
        dry_run: bool,
    },
}
