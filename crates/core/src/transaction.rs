use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::LedgerPath;
use super::money::Money;

/// Column order of the canonical import file.
pub const OUTPUT_COLUMNS: [&str; 6] = [
    "Date",
    "Description",
    "Debit",
    "Credit",
    "Account",
    "Transfer Account",
];

/// One normalized statement line, ready for accounting import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub debit: Option<Money>,
    pub credit: Option<Money>,
    pub account: LedgerPath,
    pub transfer_account: Option<LedgerPath>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationWarning {
    NoAmountOnEitherSide,
    AmountOnBothSides,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::NoAmountOnEitherSide => {
                write!(f, "transaction has neither a debit nor a credit amount")
            }
            ValidationWarning::AmountOnBothSides => {
                write!(f, "transaction has both a debit and a credit amount")
            }
        }
    }
}

impl Transaction {
    /// Exactly one of debit/credit should be present. Violations are reported,
    /// never repaired.
    pub fn validate(&self) -> Vec<ValidationWarning> {
        match (&self.debit, &self.credit) {
            (None, None) => vec![ValidationWarning::NoAmountOnEitherSide],
            (Some(_), Some(_)) => vec![ValidationWarning::AmountOnBothSides],
            _ => Vec::new(),
        }
    }

    pub fn to_output_row(&self, style: DateStyle) -> OutputRow {
        OutputRow {
            date: style.format(self.date),
            description: self.description.clone(),
            debit: self.debit.map(|m| m.to_string()).unwrap_or_default(),
            credit: self.credit.map(|m| m.to_string()).unwrap_or_default(),
            account: self.account.to_string(),
            transfer_account: self
                .transfer_account
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateStyle {
    /// `YYYY-MM-DD`, the canonical contract.
    #[default]
    Iso,
    /// `M/D/YYYY`, expected by the monthly combined import.
    Us,
}

impl DateStyle {
    pub fn format(self, date: NaiveDate) -> String {
        match self {
            DateStyle::Iso => date.format("%Y-%m-%d").to_string(),
            DateStyle::Us => date.format("%-m/%-d/%Y").to_string(),
        }
    }
}

/// Flat, string-typed view of a [`Transaction`] as written to CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Debit")]
    pub debit: String,
    #[serde(rename = "Credit")]
    pub credit: String,
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "Transfer Account")]
    pub transfer_account: String,
}
