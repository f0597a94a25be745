use anyhow::{Context, Result};
use bankprep_core::{DateStyle, Transaction, ValidationWarning};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::discovery::display_name;

/// `<prefix><original name>` next to the input.
pub fn output_path(input: &Path, prefix: &str) -> PathBuf {
    input.with_file_name(format!("{prefix}{}", display_name(input)))
}

/// `<stem><suffix>_<YYYYMMDD_HHMMSS><ext>` next to `path`.
pub fn backup_path(path: &Path, suffix: &str, at: NaiveDateTime) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{suffix}_{}{ext}", at.format("%Y%m%d_%H%M%S")))
}

/// Copy an existing file aside before it is overwritten. `None` when there
/// was nothing to back up.
pub fn create_backup(path: &Path, suffix: &str, at: NaiveDateTime) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let backup = backup_path(path, suffix, at);
    std::fs::copy(path, &backup)
        .with_context(|| format!("backing up {}", display_name(path)))?;
    info!("Created backup: {}", display_name(&backup));
    Ok(Some(backup))
}

/// Write transactions as the six-column import CSV.
pub fn write_transactions(path: &Path, transactions: &[Transaction], style: DateStyle) -> Result<()> {
    let unbalanced = transactions
        .iter()
        .filter(|tx| tx.validate().contains(&ValidationWarning::NoAmountOnEitherSide))
        .count();
    if unbalanced > 0 {
        warn!(
            "{}: {unbalanced} transactions without debit or credit amounts",
            display_name(path)
        );
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", display_name(path)))?;
    for tx in transactions {
        writer.serialize(tx.to_output_row(style))?;
    }
    writer.flush()?;
    info!("Wrote output file: {}", display_name(path));
    Ok(())
}
