use bankprep_core::AccountMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;
use crate::header::{AliasTable, CanonicalField};
use crate::rules::{default_rules, TransferRule};
use crate::table::TextEncoding;

/// Static tables and thresholds the engine runs with. Passed into the parser
/// explicitly; nothing here is process-global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Minimum similarity for a fuzzy column match.
    pub fuzzy_threshold: f32,
    pub min_header_cells: usize,
    pub min_header_matches: usize,
    /// A row containing this text is the header, whatever else it holds.
    pub primary_date_label: String,
    /// Canonical label to accepted synonyms.
    pub aliases: BTreeMap<String, Vec<String>>,
    pub end_markers: Vec<String>,
    pub accounts: AccountMap,
    pub encodings: Vec<TextEncoding>,
    pub transfer_rules: Vec<TransferRule>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ParserConfig {
    fn default() -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert(
            "Posting Date".to_string(),
            strings(&["Date", "Transaction Date", "Post Date"]),
        );
        aliases.insert(
            "Description".to_string(),
            strings(&["Transaction Description", "Details", "Particulars"]),
        );
        aliases.insert(
            "Debit Amount".to_string(),
            strings(&["Debit", "Debit Amt", "Withdrawal"]),
        );
        aliases.insert(
            "Credit Amount".to_string(),
            strings(&["Credit", "Credit Amt", "Deposit"]),
        );
        aliases.insert(
            "Running Balance".to_string(),
            strings(&["Balance", "Account Balance", "Current Balance"]),
        );

        Self {
            fuzzy_threshold: 0.8,
            min_header_cells: 4,
            min_header_matches: 3,
            primary_date_label: CanonicalField::PostingDate.label().to_string(),
            aliases,
            end_markers: strings(&[
                "** End of Report **",
                "End of Report",
                "*** End of Report ***",
                "Page",
                "Generated on",
            ]),
            accounts: AccountMap::default(),
            encodings: TextEncoding::DEFAULT_ORDER.to_vec(),
            transfer_rules: default_rules(),
        }
    }
}

impl ParserConfig {
    /// Keys left out of the document keep their defaults.
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: ParserConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "fuzzy_threshold",
                reason: format!("{} is outside 0.0..=1.0", self.fuzzy_threshold),
            });
        }
        if self.encodings.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "encodings",
                reason: "at least one encoding is required".to_string(),
            });
        }
        if self.primary_date_label.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "primary_date_label",
                reason: "must not be blank".to_string(),
            });
        }
        self.alias_table().map(|_| ())
    }

    pub fn alias_table(&self) -> Result<AliasTable, ConfigError> {
        let mut entries = BTreeMap::new();
        for (label, aliases) in &self.aliases {
            let field =
                CanonicalField::from_label(label).ok_or_else(|| ConfigError::InvalidValue {
                    field: "aliases",
                    reason: format!("'{label}' is not a canonical column"),
                })?;
            entries.insert(field, aliases.clone());
        }
        Ok(AliasTable::new(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{resolve, MatchTier};

    #[test]
    fn default_is_valid() {
        assert!(ParserConfig::default().validate().is_ok());
    }

    #[test]
    fn default_aliases_resolve_balance() {
        let table = ParserConfig::default().alias_table().unwrap();
        let res = resolve("Balance", &CanonicalField::ALL, &table, 0.8).unwrap();
        assert_eq!(res.field, CanonicalField::RunningBalance);
        assert_eq!(res.tier, MatchTier::Alias);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ParserConfig::from_toml(
            r#"
            fuzzy_threshold = 0.9
            end_markers = ["-- END --"]

            [accounts]
            Checking = "Assets:Bank:Checking"
            "#,
        )
        .unwrap();
        assert_eq!(config.fuzzy_threshold, 0.9);
        assert_eq!(config.end_markers, vec!["-- END --".to_string()]);
        assert_eq!(config.accounts.resolve("Checking").as_str(), "Assets:Bank:Checking");
        assert_eq!(config.min_header_cells, 4);
        assert_eq!(config.transfer_rules.len(), 2);
        assert_eq!(config.encodings, TextEncoding::DEFAULT_ORDER.to_vec());
    }

    #[test]
    fn encodings_deserialize_by_name() {
        let config = ParserConfig::from_toml(r#"encodings = ["cp1252", "utf-8"]"#).unwrap();
        assert_eq!(
            config.encodings,
            vec![TextEncoding::Windows1252, TextEncoding::Utf8]
        );
    }

    #[test]
    fn unknown_alias_key_is_rejected() {
        let result = ParserConfig::from_toml(
            r#"
            [aliases]
            "Value Date" = ["VD"]
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "aliases", .. })
        ));
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        assert!(ParserConfig::from_toml("fuzzy_threshold = 1.5").is_err());
    }

    #[test]
    fn empty_encoding_list_is_rejected() {
        assert!(ParserConfig::from_toml("encodings = []").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parser.toml");
        std::fs::write(&path, "min_header_matches = 2\n").unwrap();
        assert_eq!(ParserConfig::load(&path).unwrap().min_header_matches, 2);
    }
}
