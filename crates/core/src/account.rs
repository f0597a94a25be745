use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Colon-delimited ledger account, e.g. `Assets:Current Assets:Banks Local:BDO Current`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerPath(String);

impl LedgerPath {
    pub fn new(path: &str) -> Result<Self, LedgerError> {
        let path = path.trim();
        if path.is_empty() || path.split(':').any(|segment| segment.trim().is_empty()) {
            return Err(LedgerError::InvalidPath(path.to_string()));
        }
        Ok(LedgerPath(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LedgerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LedgerPath {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LedgerPath::new(s)
    }
}

impl TryFrom<String> for LedgerPath {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        LedgerPath::new(&value)
    }
}

impl From<LedgerPath> for String {
    fn from(path: LedgerPath) -> Self {
        path.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Invalid ledger path: '{0}'")]
    InvalidPath(String),
    #[error("Invalid month: '{0}' (expected YYYY-MM)")]
    InvalidMonth(String),
}

pub const DEFAULT_ACCOUNTS: &[(&str, &str)] = &[
    ("Checking", "Assets:Current Assets:Banks Local:BDO Current"),
    ("Savings", "Assets:Current Assets:Banks Local:BDO Savings"),
];

/// Account-type tag (as carried in a statement file name) to ledger path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountMap(BTreeMap<String, LedgerPath>);

impl AccountMap {
    pub fn new(entries: BTreeMap<String, LedgerPath>) -> Self {
        AccountMap(entries)
    }

    /// Unknown tags resolve to `Unknown:<tag>` so the row still carries its origin.
    pub fn resolve(&self, account_type: &str) -> LedgerPath {
        if let Some(path) = self.0.get(account_type) {
            return path.clone();
        }
        let tag = account_type.trim().replace(':', " ");
        let tag = if tag.is_empty() { "Unspecified".to_string() } else { tag };
        LedgerPath(format!("Unknown:{tag}"))
    }
}

impl Default for AccountMap {
    fn default() -> Self {
        AccountMap(
            DEFAULT_ACCOUNTS
                .iter()
                .map(|(tag, path)| (tag.to_string(), LedgerPath(path.to_string())))
                .collect(),
        )
    }
}
