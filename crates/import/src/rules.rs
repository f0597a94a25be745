use bankprep_core::LedgerPath;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maps a recurring description pattern to a counter-account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRule {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    pub transfer_account: LedgerPath,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Contains,
    Exact,
    Regex,
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(MatchType::Contains),
            "exact" => Ok(MatchType::Exact),
            "regex" => Ok(MatchType::Regex),
            other => Err(format!("Unknown match type: '{other}'")),
        }
    }
}

pub fn default_rules() -> Vec<TransferRule> {
    [
        ("interest withheld", "interest withheld", "Expenses:Banking Costs:Interest"),
        ("interest paid", "interest pay sys-gen", "Income:Interest Income"),
    ]
    .into_iter()
    .filter_map(|(name, pattern, account)| {
        Some(TransferRule {
            name: name.to_string(),
            pattern: pattern.to_string(),
            match_type: MatchType::Contains,
            transfer_account: LedgerPath::new(account).ok()?,
            priority: 0,
        })
    })
    .collect()
}

/// Internal pairing of a rule with its precompiled regex (if applicable).
#[derive(Debug)]
struct CompiledRule {
    rule: TransferRule,
    compiled_regex: Option<regex::Regex>,
}

/// First matching rule wins. Rules are ordered by descending priority and,
/// within a priority, by declaration order.
#[derive(Debug)]
pub struct TransferRuleEngine {
    rules: Vec<CompiledRule>,
}

impl TransferRuleEngine {
    pub fn new(rules: Vec<TransferRule>) -> Result<Self, ConfigError> {
        let mut compiled = rules
            .into_iter()
            .map(|rule| -> Result<CompiledRule, ConfigError> {
                let compiled_regex = match rule.match_type {
                    MatchType::Regex => Some(
                        regex::RegexBuilder::new(&rule.pattern)
                            .case_insensitive(true)
                            .build()
                            .map_err(|source| ConfigError::InvalidRegex {
                                name: rule.name.clone(),
                                source,
                            })?,
                    ),
                    _ => None,
                };
                Ok(CompiledRule {
                    rule,
                    compiled_regex,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        // Stable: equal priorities keep declaration order.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Ok(Self { rules: compiled })
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct RuleFile {
            #[serde(default)]
            rules: Vec<TransferRule>,
        }
        let file: RuleFile = toml::from_str(toml_content)?;
        Self::new(file.rules)
    }

    pub fn rules(&self) -> impl Iterator<Item = &TransferRule> {
        self.rules.iter().map(|cr| &cr.rule)
    }

    pub fn find_matching_rule(&self, description: &str) -> Option<&TransferRule> {
        let text = description.to_lowercase();
        self.rules
            .iter()
            .find(|cr| Self::rule_matches(cr, description, &text))
            .map(|cr| &cr.rule)
    }

    /// Counter-account for a normalized description; `None` leaves the
    /// transaction for manual coding.
    pub fn classify(&self, description: &str) -> Option<LedgerPath> {
        self.find_matching_rule(description)
            .map(|r| r.transfer_account.clone())
    }

    /// Pairs of rule names where one literal pattern subsumes the other, so a
    /// single description could satisfy both. Regex rules are not analysed.
    pub fn overlaps(&self) -> Vec<(String, String)> {
        let literal: Vec<(&TransferRule, String)> = self
            .rules
            .iter()
            .filter(|cr| cr.rule.match_type != MatchType::Regex)
            .map(|cr| (&cr.rule, cr.rule.pattern.to_lowercase()))
            .collect();

        let mut out = Vec::new();
        for (i, (a, pa)) in literal.iter().enumerate() {
            for (b, pb) in literal.iter().skip(i + 1) {
                let overlapping = match (&a.match_type, &b.match_type) {
                    (MatchType::Exact, MatchType::Exact) => pa == pb,
                    (MatchType::Contains, MatchType::Contains) => {
                        pa.contains(pb.as_str()) || pb.contains(pa.as_str())
                    }
                    (MatchType::Contains, MatchType::Exact) => pb.contains(pa.as_str()),
                    (MatchType::Exact, MatchType::Contains) => pa.contains(pb.as_str()),
                    _ => false,
                };
                if overlapping {
                    out.push((a.name.clone(), b.name.clone()));
                }
            }
        }
        out
    }

    fn rule_matches(cr: &CompiledRule, original: &str, lowered: &str) -> bool {
        let pattern = cr.rule.pattern.to_lowercase();
        match &cr.rule.match_type {
            MatchType::Contains => lowered.contains(&pattern),
            MatchType::Exact => lowered == pattern,
            MatchType::Regex => cr
                .compiled_regex
                .as_ref()
                .is_some_and(|re| re.is_match(original)),
        }
    }
}

impl Default for TransferRuleEngine {
    fn default() -> Self {
        // Built-in patterns are literal, so construction cannot fail.
        Self {
            rules: default_rules()
                .into_iter()
                .map(|rule| CompiledRule {
                    rule,
                    compiled_regex: None,
                })
                .collect(),
        }
    }
}
