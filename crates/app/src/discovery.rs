use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;

/// What a statement's file name says about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub account_type: String,
    pub account_number: String,
    pub date: NaiveDate,
}

pub type Discovered = (PathBuf, FileMetadata);

#[derive(Debug)]
pub struct Discovery {
    input_dir: PathBuf,
    pattern: Regex,
    min_date: NaiveDate,
}

impl Discovery {
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let pattern = Regex::new(&config.file_pattern)
            .with_context(|| format!("invalid file_pattern '{}'", config.file_pattern))?;
        if pattern.captures_len() < 4 {
            bail!("file_pattern must capture account type, account number and date");
        }
        Ok(Self {
            input_dir: config.input_dir.clone(),
            pattern,
            min_date: config.min_date,
        })
    }

    pub fn with_input_dir(mut self, input_dir: PathBuf) -> Self {
        self.input_dir = input_dir;
        self
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// `None` when the name does not follow the export naming scheme.
    pub fn metadata(&self, path: &Path) -> Option<FileMetadata> {
        let name = path.file_name()?.to_str()?;
        let caps = self.pattern.captures(name)?;
        let date_str = caps.get(3)?.as_str();
        let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            warn!("Invalid date in file name: {name}");
            return None;
        };
        Some(FileMetadata {
            account_type: caps.get(1)?.as_str().to_string(),
            account_number: caps.get(2)?.as_str().to_string(),
            date,
        })
    }

    /// Statements in the input directory dated on or after `from_date`
    /// (the configured minimum when `None`), oldest first.
    pub fn discover(&self, from_date: Option<NaiveDate>) -> Result<Vec<Discovered>> {
        if !self.input_dir.is_dir() {
            bail!("input directory not found: {}", self.input_dir.display());
        }
        let from_date = from_date.unwrap_or(self.min_date);

        let mut files = Vec::new();
        let entries = std::fs::read_dir(&self.input_dir)
            .with_context(|| format!("reading {}", self.input_dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            match self.metadata(&path) {
                Some(meta) if meta.date >= from_date => {
                    info!("Found eligible file: {}", display_name(&path));
                    files.push((path, meta));
                }
                _ => debug!("Skipping file: {}", display_name(&path)),
            }
        }

        files.sort_by(|a, b| a.1.date.cmp(&b.1.date).then_with(|| a.0.cmp(&b.0)));
        info!("Discovered {} eligible files", files.len());
        Ok(files)
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub total: usize,
    pub by_account: BTreeMap<String, usize>,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

pub fn discovery_stats(files: &[Discovered]) -> DiscoveryStats {
    let mut stats = DiscoveryStats {
        total: files.len(),
        ..Default::default()
    };
    for (_, meta) in files {
        *stats.by_account.entry(meta.account_type.clone()).or_default() += 1;
        stats.earliest = Some(stats.earliest.map_or(meta.date, |d| d.min(meta.date)));
        stats.latest = Some(stats.latest.map_or(meta.date, |d| d.max(meta.date)));
    }
    stats
}
