use bankprep_core::{Transaction, ValidationWarning};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::ParserConfig;
use crate::error::{ConfigError, ParseError};
use crate::header::{
    column_labels, detect_format, locate_header, AliasTable, FormatVariant, HeaderMapping,
    HeaderRules,
};
use crate::normalize::{normalize_row, RowDefect};
use crate::rows::filter_rows;
use crate::rules::TransferRuleEngine;
use crate::table::{self, RawTable};

/// Rows excluded from the output, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounts {
    pub date_unparseable: usize,
    pub amount_invalid: usize,
    pub no_amount: usize,
    pub description_missing: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.date_unparseable + self.amount_invalid + self.no_amount + self.description_missing
    }

    fn record(&mut self, defect: &RowDefect) {
        match defect {
            RowDefect::DateUnparseable(_) => self.date_unparseable += 1,
            RowDefect::AmountInvalid(_) => self.amount_invalid += 1,
            RowDefect::NoAmountOnEitherSide(_) => self.no_amount += 1,
            RowDefect::DescriptionMissing => self.description_missing += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWarning {
    /// Index into the decoded table.
    pub row: usize,
    pub warning: ValidationWarning,
}

/// Outcome of parsing one statement file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseReport {
    pub variant: FormatVariant,
    pub header_row: usize,
    pub transactions: Vec<Transaction>,
    pub dropped: DropCounts,
    /// Legacy rows kept with an invalid amount cell emptied.
    pub amounts_cleared: usize,
    /// Rows before the footer that did not look like transactions.
    pub rows_skipped: usize,
    /// Table index of the end-of-report row, if any.
    pub truncated_at: Option<usize>,
    pub warnings: Vec<RowWarning>,
}

/// Turns one statement file into canonical transactions.
///
/// Holds only immutable configuration, so one parser can serve many files
/// across threads.
#[derive(Debug)]
pub struct StatementParser {
    config: ParserConfig,
    aliases: AliasTable,
    rules: TransferRuleEngine,
}

impl Default for StatementParser {
    fn default() -> Self {
        let config = ParserConfig::default();
        let aliases = config.alias_table().unwrap_or_default();
        Self {
            config,
            aliases,
            rules: TransferRuleEngine::default(),
        }
    }
}

impl StatementParser {
    pub fn new(config: ParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let aliases = config.alias_table()?;
        let rules = TransferRuleEngine::new(config.transfer_rules.clone())?;
        for (first, second) in rules.overlaps() {
            warn!("Transfer rules '{first}' and '{second}' can match the same description; '{first}' wins");
        }
        Ok(Self {
            config,
            aliases,
            rules,
        })
    }

    pub fn parse_file(&self, path: &Path, account_type: &str) -> Result<ParseReport, ParseError> {
        let table = table::load(path, &self.config.encodings)?;
        self.parse_table(table, account_type)
    }

    /// `origin` is only used in log and error messages.
    pub fn parse_bytes(
        &self,
        data: &[u8],
        account_type: &str,
        origin: &Path,
    ) -> Result<ParseReport, ParseError> {
        let table = table::from_bytes(data, &self.config.encodings, origin)?;
        self.parse_table(table, account_type)
    }

    pub fn parse_table(
        &self,
        table: RawTable,
        account_type: &str,
    ) -> Result<ParseReport, ParseError> {
        let rules = HeaderRules {
            primary_date_label: &self.config.primary_date_label,
            min_cells: self.config.min_header_cells,
            min_matches: self.config.min_header_matches,
            aliases: &self.aliases,
            threshold: self.config.fuzzy_threshold,
        };
        let header_row = locate_header(&table, &rules)?;
        debug!("Header found at row {header_row}");

        let (header, body) = table
            .split_at_header(header_row)
            .ok_or(ParseError::HeaderNotFound)?;
        let labels = column_labels(&header);
        let variant = detect_format(&labels);
        info!("Detected {variant} statement format");

        let mapping = HeaderMapping::build(labels, &self.aliases, self.config.fuzzy_threshold);
        for field in mapping.fields() {
            if let (Some(label), Some(tier)) = (mapping.label(field), mapping.tier(field)) {
                debug!("Column '{label}' -> {field} ({tier:?})");
            }
        }
        let missing = mapping.missing_for(variant);
        if !missing.is_empty() {
            return Err(ParseError::UnresolvableSchema { variant, missing });
        }
        let date_column = mapping
            .first_column(&variant.date_fields())
            .ok_or_else(|| ParseError::UnresolvableSchema {
                variant,
                missing: vec![variant.date_fields()[0]],
            })?;

        let body_offset = header_row + 1;
        let filtered = filter_rows(body, date_column, variant, &self.config.end_markers);
        let account = self.config.accounts.resolve(account_type);

        let mut transactions = Vec::with_capacity(filtered.rows.len());
        let mut dropped = DropCounts::default();
        let mut amounts_cleared = 0;
        let mut warnings = Vec::new();

        for (idx, row) in &filtered.rows {
            let table_row = body_offset + idx;
            let normalized = match normalize_row(row, &mapping, variant) {
                Ok(n) => n,
                Err(defect) => {
                    warn!("Dropping row {table_row}: {defect}");
                    dropped.record(&defect);
                    continue;
                }
            };
            if normalized.cleared_amounts > 0 {
                warn!("Row {table_row}: cleared {} invalid amount cell(s)", normalized.cleared_amounts);
                amounts_cleared += normalized.cleared_amounts;
            }

            let transfer_account = self.rules.classify(&normalized.description);
            let tx = Transaction {
                date: normalized.date,
                description: normalized.description,
                debit: normalized.debit,
                credit: normalized.credit,
                account: account.clone(),
                transfer_account,
            };
            for warning in tx.validate() {
                warn!("Row {table_row}: {warning}");
                warnings.push(RowWarning {
                    row: table_row,
                    warning,
                });
            }
            transactions.push(tx);
        }

        info!(
            "Parsed {} transactions ({} dropped, {} warnings)",
            transactions.len(),
            dropped.total(),
            warnings.len()
        );

        Ok(ParseReport {
            variant,
            header_row,
            transactions,
            dropped,
            amounts_cleared,
            rows_skipped: filtered.skipped,
            truncated_at: filtered.truncated_at.map(|i| body_offset + i),
            warnings,
        })
    }
}
