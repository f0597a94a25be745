use std::path::PathBuf;
use thiserror::Error;

use crate::header::{CanonicalField, FormatVariant};

/// File-level failures. Any of these aborts the file, never the batch.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unreadable file {path}: {reason}")]
    UnreadableFile { path: PathBuf, reason: String },
    #[error("No transaction header row found")]
    HeaderNotFound,
    #[error("{variant} statement is missing required columns: {}", format_fields(.missing))]
    UnresolvableSchema {
        variant: FormatVariant,
        missing: Vec<CanonicalField>,
    },
}

impl ParseError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ParseError::UnreadableFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid regex in transfer rule '{name}': {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

fn format_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}
