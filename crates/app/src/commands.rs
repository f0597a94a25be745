use anyhow::Result;
use bankprep_core::DateStyle;
use bankprep_import::StatementParser;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::OutputConfig;
use crate::discovery::{discovery_stats, display_name, Discovery, FileMetadata};
use crate::output::{create_backup, output_path, write_transactions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
    pub transactions_processed: usize,
    pub backups_created: usize,
    pub rows_dropped: usize,
    pub errors: Vec<String>,
}

impl ProcessStats {
    /// A run succeeds when nothing failed and at least one file was written.
    pub fn succeeded(&self) -> bool {
        self.files_failed == 0 && self.files_processed > 0
    }
}

impl fmt::Display for ProcessStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BDO Statement Processing Report")?;
        writeln!(f, "{}", "=".repeat(40))?;
        writeln!(f, "Files discovered: {}", self.files_discovered)?;
        writeln!(f, "Files processed: {}", self.files_processed)?;
        writeln!(f, "Files failed: {}", self.files_failed)?;
        writeln!(f, "Files skipped: {}", self.files_skipped)?;
        writeln!(f, "Transactions processed: {}", self.transactions_processed)?;
        writeln!(f, "Backups created: {}", self.backups_created)?;
        writeln!(f, "Rows dropped: {}", self.rows_dropped)?;
        if !self.errors.is_empty() {
            writeln!(f, "\nErrors ({}):", self.errors.len())?;
            for e in &self.errors {
                writeln!(f, "  - {e}")?;
            }
        }
        Ok(())
    }
}

pub struct Processor<'a> {
    parser: &'a StatementParser,
    output: &'a OutputConfig,
    dry_run: bool,
    stats: ProcessStats,
}

impl<'a> Processor<'a> {
    pub fn new(parser: &'a StatementParser, output: &'a OutputConfig, dry_run: bool) -> Self {
        Self {
            parser,
            output,
            dry_run,
            stats: ProcessStats::default(),
        }
    }

    /// Every eligible statement in the discovery directory.
    pub fn process_all(mut self, discovery: &Discovery, from_date: Option<NaiveDate>) -> ProcessStats {
        let files = match discovery.discover(from_date) {
            Ok(files) => files,
            Err(e) => {
                error!("File discovery failed: {e:#}");
                self.stats.errors.push(format!("File discovery error: {e:#}"));
                return self.stats;
            }
        };
        self.stats.files_discovered = files.len();
        if files.is_empty() {
            warn!("No eligible files found");
            return self.stats;
        }
        let summary = discovery_stats(&files);
        info!("Discovered {} files: {:?}", summary.total, summary.by_account);

        for (path, meta) in &files {
            self.process_file(path, meta);
        }
        self.stats
    }

    /// Explicitly named files. Names that do not follow the export scheme
    /// are skipped since their account type is unknown.
    pub fn process_list(mut self, discovery: &Discovery, paths: &[PathBuf]) -> ProcessStats {
        info!("Processing {} specific files", paths.len());
        for path in paths {
            match discovery.metadata(path) {
                Some(meta) => {
                    self.stats.files_discovered += 1;
                    self.process_file(path, &meta);
                }
                None => {
                    warn!("Could not extract metadata from {}", display_name(path));
                    self.stats.files_skipped += 1;
                }
            }
        }
        self.stats
    }

    fn fail(&mut self, path: &Path, e: impl std::fmt::Display) {
        error!("Error processing {}: {e}", display_name(path));
        self.stats.files_failed += 1;
        self.stats.errors.push(format!("{}: {e}", display_name(path)));
    }

    fn process_file(&mut self, path: &Path, meta: &FileMetadata) {
        info!("Processing file: {}", display_name(path));
        let report = match self.parser.parse_file(path, &meta.account_type) {
            Ok(report) => report,
            Err(e) => return self.fail(path, e),
        };
        self.stats.rows_dropped += report.dropped.total();

        if report.transactions.is_empty() {
            warn!("No transactions found in {}", display_name(path));
            self.stats.files_skipped += 1;
            return;
        }

        let out = output_path(path, &self.output.prefix);
        if self.dry_run {
            info!(
                "DRY RUN: Would write {} transactions to {}",
                report.transactions.len(),
                display_name(&out)
            );
        } else {
            match create_backup(&out, &self.output.backup_suffix, Local::now().naive_local()) {
                Ok(Some(_)) => self.stats.backups_created += 1,
                Ok(None) => {}
                Err(e) => warn!("{e:#}"),
            }
            if let Err(e) = write_transactions(&out, &report.transactions, DateStyle::Iso) {
                return self.fail(path, format!("{e:#}"));
            }
        }

        self.stats.files_processed += 1;
        self.stats.transactions_processed += report.transactions.len();
        info!(
            "Processed {} transactions from {}",
            report.transactions.len(),
            display_name(path)
        );
    }
}

pub fn log_summary(stats: &ProcessStats) {
    info!("=== PROCESSING SUMMARY ===");
    info!("Files discovered: {}", stats.files_discovered);
    info!("Files processed: {}", stats.files_processed);
    info!("Files failed: {}", stats.files_failed);
    info!("Files skipped: {}", stats.files_skipped);
    info!("Transactions processed: {}", stats.transactions_processed);
    info!("Backups created: {}", stats.backups_created);
    if !stats.errors.is_empty() {
        warn!("Errors encountered: {}", stats.errors.len());
        for e in &stats.errors {
            warn!("  - {e}");
        }
    }
}

pub fn print_stats(stats: &ProcessStats, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
    } else {
        println!("\n{stats}");
    }
    Ok(())
}
