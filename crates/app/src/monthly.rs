use anyhow::{bail, Result};
use bankprep_core::{DateStyle, Month, Transaction};
use bankprep_import::StatementParser;
use dialoguer::{Confirm, Input};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::OutputConfig;
use crate::discovery::{display_name, Discovered, Discovery};
use crate::output::{output_path, write_transactions};

const EXPECTED_ACCOUNTS: [&str; 2] = ["Checking", "Savings"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthlyStats {
    pub new_files_found: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub missing_accounts: Vec<String>,
    pub transactions_processed: usize,
    pub target_month: Option<Month>,
    pub output_file: Option<PathBuf>,
    pub errors: Vec<String>,
}

impl MonthlyStats {
    pub fn succeeded(&self) -> bool {
        self.files_failed == 0 && self.files_processed > 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MonthlyOptions {
    pub month: Option<Month>,
    pub yes: bool,
    pub dry_run: bool,
}

/// Discovered statements that have no per-file output yet.
pub fn new_files(files: Vec<Discovered>, prefix: &str) -> Vec<Discovered> {
    files
        .into_iter()
        .filter(|(path, _)| !output_path(path, prefix).exists())
        .collect()
}

/// Most common statement month; ties go to the later month.
pub fn detect_month(files: &[Discovered]) -> Option<Month> {
    let mut counts: BTreeMap<Month, usize> = BTreeMap::new();
    for (_, meta) in files {
        *counts.entry(Month::of(meta.date)).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(month, _)| month)
}

pub fn missing_accounts(files: &[Discovered]) -> Vec<String> {
    let present: BTreeSet<&str> = files.iter().map(|(_, m)| m.account_type.as_str()).collect();
    EXPECTED_ACCOUNTS
        .iter()
        .filter(|a| !present.contains(*a))
        .map(|a| a.to_string())
        .collect()
}

/// `<prefix>My_Transactions BDO <last day of month>.csv`
pub fn monthly_output_path(dir: &Path, prefix: &str, month: Month) -> PathBuf {
    dir.join(format!(
        "{prefix}My_Transactions BDO {}.csv",
        month.last_day().format("%Y-%m-%d")
    ))
}

/// Concatenate per-file transactions, clear transfer accounts for manual
/// assignment, and order by date keeping file order within a day.
pub fn combine(batches: Vec<Vec<Transaction>>) -> Vec<Transaction> {
    let mut combined: Vec<Transaction> = batches.into_iter().flatten().collect();
    for tx in &mut combined {
        tx.transfer_account = None;
    }
    combined.sort_by_key(|tx| tx.date);
    combined
}

/// Validation for a typed `YYYY-MM` month.
pub fn parse_month_input(input: &str) -> Result<Month, String> {
    input
        .trim()
        .parse::<Month>()
        .map_err(|_| "Invalid format. Please use YYYY-MM (e.g., 2024-03)".to_string())
}

/// Ask whether `detected` is right; on refusal prompt for a month until a
/// valid one is typed.
pub fn confirm_month(detected: Month) -> Result<Month> {
    if Confirm::new()
        .with_prompt(format!("Processing files for {}, correct?", detected.long_name()))
        .default(true)
        .interact()?
    {
        return Ok(detected);
    }

    let typed: String = Input::new()
        .with_prompt("Enter target month (YYYY-MM)")
        .validate_with(|s: &String| parse_month_input(s).map(|_| ()))
        .interact_text()?;
    parse_month_input(&typed).map_err(anyhow::Error::msg)
}

pub struct MonthlyRun<'a> {
    pub parser: &'a StatementParser,
    pub output: &'a OutputConfig,
    pub options: MonthlyOptions,
}

impl MonthlyRun<'_> {
    pub fn run(
        &self,
        discovery: &Discovery,
        confirm: impl FnOnce(Month) -> Result<Month>,
        out: &mut impl Write,
    ) -> Result<MonthlyStats> {
        info!("Starting monthly statement processing");
        let mut stats = MonthlyStats::default();

        let files = new_files(discovery.discover(None)?, &self.output.prefix);
        stats.new_files_found = files.len();
        info!("Found {} new files to process", files.len());
        let Some(detected) = detect_month(&files) else {
            writeln!(out, "No new files found to process")?;
            return Ok(stats);
        };

        let month = match self.options.month {
            Some(month) => month,
            None if self.options.yes => detected,
            None => confirm(detected)?,
        };
        stats.target_month = Some(month);

        let month_files: Vec<Discovered> = files
            .into_iter()
            .filter(|(_, meta)| month.contains(meta.date))
            .collect();
        if month_files.is_empty() {
            writeln!(out, "No files found for {month}")?;
            return Ok(stats);
        }

        stats.missing_accounts = missing_accounts(&month_files);
        if !stats.missing_accounts.is_empty() {
            warn!(
                "Missing {} account data for {}; continuing with available data",
                stats.missing_accounts.join(", "),
                month.long_name()
            );
        }

        let mut batches = Vec::new();
        for (path, meta) in &month_files {
            info!("Processing file: {}", display_name(path));
            match self.parser.parse_file(path, &meta.account_type) {
                Ok(report) if report.transactions.is_empty() => {
                    warn!("No transactions found in {}", display_name(path));
                }
                Ok(report) => {
                    stats.files_processed += 1;
                    stats.transactions_processed += report.transactions.len();
                    writeln!(
                        out,
                        "Processed {} transactions from {}",
                        report.transactions.len(),
                        display_name(path)
                    )?;
                    batches.push(report.transactions);
                }
                Err(e) => {
                    error!("Error processing {}: {e}", display_name(path));
                    stats.files_failed += 1;
                    stats.errors.push(format!("{}: {e}", display_name(path)));
                }
            }
        }

        let combined = combine(batches);
        if combined.is_empty() {
            writeln!(out, "No transactions to process")?;
            return Ok(stats);
        }

        let target = monthly_output_path(discovery.input_dir(), &self.output.prefix, month);
        if self.options.dry_run {
            writeln!(
                out,
                "DRY RUN: Would write {} transactions to {}",
                combined.len(),
                display_name(&target)
            )?;
        } else {
            write_transactions(&target, &combined, DateStyle::Us)?;
            writeln!(out, "Created monthly output: {}", display_name(&target))?;
            stats.output_file = Some(target);
        }
        Ok(stats)
    }
}

pub fn print_summary(stats: &MonthlyStats, out: &mut impl Write) -> Result<()> {
    writeln!(out, "\nMONTHLY PROCESSING SUMMARY")?;
    writeln!(out, "{}", "=".repeat(40))?;
    if let Some(month) = stats.target_month {
        writeln!(out, "Target month: {month}")?;
    }
    writeln!(out, "New files found: {}", stats.new_files_found)?;
    writeln!(out, "Files processed: {}", stats.files_processed)?;
    writeln!(out, "Files failed: {}", stats.files_failed)?;
    writeln!(out, "Transactions processed: {}", stats.transactions_processed)?;
    if !stats.missing_accounts.is_empty() {
        writeln!(out, "Missing accounts: {}", stats.missing_accounts.join(", "))?;
    }
    if let Some(file) = &stats.output_file {
        writeln!(out, "Output file: {}", display_name(file))?;
    }
    if !stats.errors.is_empty() {
        writeln!(out, "\nErrors encountered:")?;
        for e in &stats.errors {
            writeln!(out, "  - {e}")?;
        }
    }
    Ok(())
}
