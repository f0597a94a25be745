use anyhow::{Context, Result};
use bankprep_import::ParserConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_FILE_PATTERN: &str =
    r"^My_Transactions BDO (Checking|Savings) (\d+) (\d{4}-\d{2}-\d{2})\.csv$";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub discovery: DiscoveryConfig,
    pub output: OutputConfig,
    pub parser: ParserConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub input_dir: PathBuf,
    /// Captures account type, account number and statement date, in that order.
    pub file_pattern: String,
    /// Statements dated before this are ignored.
    pub min_date: NaiveDate,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            min_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub prefix: String,
    pub backup_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: "for_import_".to_string(),
            backup_suffix: "_backup".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_content)?;
        config.parser.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing config {}", path.display()))
    }
}
