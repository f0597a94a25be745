//! Header location, column resolution and format detection.
//!
//! Statement exports put account metadata and titles above the transaction
//! table, rename columns between revisions and sometimes misspell them. Every
//! label is resolved against the canonical field set in three tiers: exact
//! label, curated alias, then edit-distance similarity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ParseError;
use crate::table::RawTable;
use crate::util::{join_cells, similarity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CanonicalField {
    #[serde(rename = "Posting Date")]
    PostingDate,
    #[serde(rename = "Description")]
    Description,
    #[serde(rename = "Branch")]
    Branch,
    #[serde(rename = "Debit Amount")]
    DebitAmount,
    #[serde(rename = "Credit Amount")]
    CreditAmount,
    #[serde(rename = "Running Balance")]
    RunningBalance,
    #[serde(rename = "Currency")]
    Currency,
    #[serde(rename = "Check Number")]
    CheckNumber,
    #[serde(rename = "Book date")]
    BookDate,
    #[serde(rename = "Amount")]
    Amount,
    #[serde(rename = "Credit/debit indicator")]
    CreditDebitIndicator,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 11] = [
        CanonicalField::PostingDate,
        CanonicalField::Description,
        CanonicalField::Branch,
        CanonicalField::DebitAmount,
        CanonicalField::CreditAmount,
        CanonicalField::RunningBalance,
        CanonicalField::Currency,
        CanonicalField::CheckNumber,
        CanonicalField::BookDate,
        CanonicalField::Amount,
        CanonicalField::CreditDebitIndicator,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CanonicalField::PostingDate => "Posting Date",
            CanonicalField::Description => "Description",
            CanonicalField::Branch => "Branch",
            CanonicalField::DebitAmount => "Debit Amount",
            CanonicalField::CreditAmount => "Credit Amount",
            CanonicalField::RunningBalance => "Running Balance",
            CanonicalField::Currency => "Currency",
            CanonicalField::CheckNumber => "Check Number",
            CanonicalField::BookDate => "Book date",
            CanonicalField::Amount => "Amount",
            CanonicalField::CreditDebitIndicator => "Credit/debit indicator",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Schema revision of the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatVariant {
    /// Separate Debit Amount / Credit Amount columns.
    Legacy,
    /// Single Amount plus a Credit/debit indicator column.
    New,
}

impl FormatVariant {
    pub fn required_fields(self) -> [CanonicalField; 4] {
        match self {
            FormatVariant::Legacy => [
                CanonicalField::PostingDate,
                CanonicalField::Description,
                CanonicalField::DebitAmount,
                CanonicalField::CreditAmount,
            ],
            FormatVariant::New => [
                CanonicalField::BookDate,
                CanonicalField::Description,
                CanonicalField::Amount,
                CanonicalField::CreditDebitIndicator,
            ],
        }
    }

    /// Date column candidates, preferred first.
    pub fn date_fields(self) -> [CanonicalField; 2] {
        match self {
            FormatVariant::Legacy => [CanonicalField::PostingDate, CanonicalField::BookDate],
            FormatVariant::New => [CanonicalField::BookDate, CanonicalField::PostingDate],
        }
    }
}

impl fmt::Display for FormatVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatVariant::Legacy => write!(f, "legacy"),
            FormatVariant::New => write!(f, "new"),
        }
    }
}

// ── Resolution ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchTier {
    Exact,
    Alias,
    Fuzzy { score: f32 },
}

impl MatchTier {
    /// Lower is better.
    fn rank(self) -> u8 {
        match self {
            MatchTier::Exact => 0,
            MatchTier::Alias => 1,
            MatchTier::Fuzzy { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub field: CanonicalField,
    pub tier: MatchTier,
}

/// Curated synonyms per canonical field, consulted in field declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable(Vec<(CanonicalField, Vec<String>)>);

impl AliasTable {
    pub fn new(entries: BTreeMap<CanonicalField, Vec<String>>) -> Self {
        AliasTable(entries.into_iter().collect())
    }

    pub fn field_for(&self, label: &str) -> Option<CanonicalField> {
        self.0
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a == label))
            .map(|(field, _)| *field)
    }
}

/// Resolve one header label: exact canonical label, then alias, then the most
/// similar canonical label scoring at least `threshold`.
pub fn resolve(
    label: &str,
    fields: &[CanonicalField],
    aliases: &AliasTable,
    threshold: f32,
) -> Option<Resolution> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    if let Some(field) = fields.iter().copied().find(|f| f.label() == label) {
        return Some(Resolution {
            field,
            tier: MatchTier::Exact,
        });
    }

    if let Some(field) = aliases.field_for(label).filter(|f| fields.contains(f)) {
        return Some(Resolution {
            field,
            tier: MatchTier::Alias,
        });
    }

    let mut best: Option<(CanonicalField, f32)> = None;
    for &field in fields {
        let score = similarity(label, field.label());
        if score >= threshold && best.map_or(true, |(_, s)| score > s) {
            best = Some((field, score));
        }
    }
    best.map(|(field, score)| Resolution {
        field,
        tier: MatchTier::Fuzzy { score },
    })
}

// ── Header locator ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HeaderRules<'a> {
    pub primary_date_label: &'a str,
    pub min_cells: usize,
    pub min_matches: usize,
    pub aliases: &'a AliasTable,
    pub threshold: f32,
}

/// Index of the first row that is the transaction header.
///
/// A row qualifies when its text contains the primary date label, or when it
/// has at least `min_cells` non-blank cells of which `min_matches` resolve to a
/// canonical field.
pub fn locate_header(table: &RawTable, rules: &HeaderRules<'_>) -> Result<usize, ParseError> {
    for (idx, row) in table.rows().iter().enumerate() {
        if join_cells(row).contains(rules.primary_date_label) {
            return Ok(idx);
        }

        let cells: Vec<&str> = row
            .iter()
            .flatten()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if cells.len() < rules.min_cells {
            continue;
        }
        let matches = cells
            .iter()
            .filter(|c| resolve(c, &CanonicalField::ALL, rules.aliases, rules.threshold).is_some())
            .count();
        if matches >= rules.min_matches {
            return Ok(idx);
        }
    }
    Err(ParseError::HeaderNotFound)
}

// ── Column mapping ────────────────────────────────────────────────────────────

/// Header labels made addressable: trimmed, blanks replaced by
/// `empty_col_<i>`, repeats suffixed `_1`, `_2`, ...
pub fn column_labels(header: &[Option<String>]) -> Vec<String> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let base = match cell.as_deref().map(str::trim) {
                Some(label) if !label.is_empty() => label.to_string(),
                _ => format!("empty_col_{i}"),
            };
            match seen.get_mut(&base) {
                Some(count) => {
                    *count += 1;
                    format!("{base}_{count}")
                }
                None => {
                    seen.insert(base.clone(), 0);
                    base
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Binding {
    column: usize,
    tier: MatchTier,
}

/// Canonical field to column, built once per file.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMapping {
    labels: Vec<String>,
    bindings: BTreeMap<CanonicalField, Binding>,
}

impl HeaderMapping {
    /// Resolve every label. When several labels resolve to the same field the
    /// better tier wins, and on equal tiers the leftmost column.
    pub fn build(labels: Vec<String>, aliases: &AliasTable, threshold: f32) -> Self {
        let mut bindings: BTreeMap<CanonicalField, Binding> = BTreeMap::new();
        for (column, label) in labels.iter().enumerate() {
            let Some(res) = resolve(label, &CanonicalField::ALL, aliases, threshold) else {
                continue;
            };
            let candidate = Binding {
                column,
                tier: res.tier,
            };
            match bindings.get(&res.field) {
                Some(existing) if existing.tier.rank() <= candidate.tier.rank() => {}
                _ => {
                    bindings.insert(res.field, candidate);
                }
            }
        }
        Self { labels, bindings }
    }

    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.bindings.get(&field).map(|b| b.column)
    }

    pub fn label(&self, field: CanonicalField) -> Option<&str> {
        self.column(field).map(|c| self.labels[c].as_str())
    }

    pub fn tier(&self, field: CanonicalField) -> Option<MatchTier> {
        self.bindings.get(&field).map(|b| b.tier)
    }

    pub fn fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.bindings.keys().copied()
    }

    /// First resolved column among `candidates`.
    pub fn first_column(&self, candidates: &[CanonicalField]) -> Option<usize> {
        candidates.iter().find_map(|f| self.column(*f))
    }

    /// Fields `variant` needs that are not resolved. Either date field
    /// satisfies the date requirement.
    pub fn missing_for(&self, variant: FormatVariant) -> Vec<CanonicalField> {
        let date_fields = variant.date_fields();
        variant
            .required_fields()
            .into_iter()
            .filter(|f| {
                if date_fields.contains(f) {
                    self.first_column(&date_fields).is_none()
                } else {
                    self.column(*f).is_none()
                }
            })
            .collect()
    }
}

// ── Format detection ──────────────────────────────────────────────────────────

/// New when at least two of the new-export markers appear among the raw labels.
pub fn detect_format(labels: &[String]) -> FormatVariant {
    let indicators = [
        labels.iter().any(|l| l == CanonicalField::BookDate.label()),
        labels
            .iter()
            .any(|l| l == CanonicalField::CreditDebitIndicator.label()),
        labels
            .iter()
            .any(|l| l.to_lowercase().starts_with("account number")),
    ];
    if indicators.iter().filter(|hit| **hit).count() >= 2 {
        FormatVariant::New
    } else {
        FormatVariant::Legacy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> AliasTable {
        let mut map = BTreeMap::new();
        map.insert(
            CanonicalField::PostingDate,
            vec!["Date".to_string(), "Transaction Date".to_string()],
        );
        map.insert(
            CanonicalField::RunningBalance,
            vec!["Balance".to_string(), "Account Balance".to_string()],
        );
        map.insert(CanonicalField::DebitAmount, vec!["Debit".to_string()]);
        map.insert(CanonicalField::CreditAmount, vec!["Credit".to_string()]);
        AliasTable::new(map)
    }

    fn rules(aliases: &AliasTable) -> HeaderRules<'_> {
        HeaderRules {
            primary_date_label: "Posting Date",
            min_cells: 4,
            min_matches: 3,
            aliases,
            threshold: 0.8,
        }
    }

    fn row(cells: &[&str]) -> Vec<Option<String>> {
        cells
            .iter()
            .map(|c| (!c.is_empty()).then(|| c.to_string()))
            .collect()
    }

    fn labels(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    // ── resolve ───────────────────────────────────────────────────────────────

    #[test]
    fn exact_label_resolves_via_exact_tier() {
        let res = resolve("Running Balance", &CanonicalField::ALL, &aliases(), 0.8).unwrap();
        assert_eq!(res.field, CanonicalField::RunningBalance);
        assert_eq!(res.tier, MatchTier::Exact);
    }

    #[test]
    fn alias_resolves_via_alias_tier() {
        let res = resolve("Account Balance", &CanonicalField::ALL, &aliases(), 0.8).unwrap();
        assert_eq!(res.field, CanonicalField::RunningBalance);
        assert_eq!(res.tier, MatchTier::Alias);
    }

    #[test]
    fn exact_beats_alias_for_same_label() {
        // "Description" is canonical; an alias entry pointing elsewhere must not win.
        let mut map = BTreeMap::new();
        map.insert(CanonicalField::Branch, vec!["Description".to_string()]);
        let res = resolve("Description", &CanonicalField::ALL, &AliasTable::new(map), 0.8).unwrap();
        assert_eq!(res.field, CanonicalField::Description);
        assert_eq!(res.tier, MatchTier::Exact);
    }

    #[test]
    fn misspelling_resolves_via_fuzzy_tier() {
        let res = resolve("Postng Date", &CanonicalField::ALL, &aliases(), 0.8).unwrap();
        assert_eq!(res.field, CanonicalField::PostingDate);
        assert!(matches!(res.tier, MatchTier::Fuzzy { score } if score >= 0.8));
    }

    #[test]
    fn fuzzy_below_threshold_is_unresolved() {
        assert!(resolve("Reference No", &CanonicalField::ALL, &aliases(), 0.8).is_none());
        assert!(resolve("", &CanonicalField::ALL, &aliases(), 0.8).is_none());
    }

    #[test]
    fn labels_are_trimmed_before_resolving() {
        let res = resolve("  Branch ", &CanonicalField::ALL, &aliases(), 0.8).unwrap();
        assert_eq!(res.tier, MatchTier::Exact);
    }

    // ── locate_header ─────────────────────────────────────────────────────────

    #[test]
    fn finds_primary_date_label_after_preamble() {
        let table = RawTable::from_rows(vec![
            row(&["", "", "My Transactions"]),
            row(&["Account No:", "", "007310159087"]),
            row(&["Posting Date", "Description", "", "Branch", "Debit Amount"]),
        ]);
        let a = aliases();
        assert_eq!(locate_header(&table, &rules(&a)).unwrap(), 2);
    }

    #[test]
    fn returns_first_qualifying_row() {
        let table = RawTable::from_rows(vec![
            row(&["Posting Date", "Description"]),
            row(&["Posting Date", "Description", "Debit Amount", "Credit Amount"]),
        ]);
        let a = aliases();
        assert_eq!(locate_header(&table, &rules(&a)).unwrap(), 0);
    }

    #[test]
    fn renamed_date_column_found_by_field_matches() {
        let table = RawTable::from_rows(vec![
            row(&["Statement", "June 2025"]),
            row(&[
                "Account number(BBAN)",
                "Book date",
                "Description",
                "Amount",
                "Currency",
                "Credit/debit indicator",
            ]),
        ]);
        let a = aliases();
        assert_eq!(locate_header(&table, &rules(&a)).unwrap(), 1);
    }

    #[test]
    fn needs_enough_cells() {
        // Three matching cells but only three non-blank cells.
        let table = RawTable::from_rows(vec![row(&["Description", "Amount", "Currency"])]);
        let a = aliases();
        assert!(matches!(
            locate_header(&table, &rules(&a)),
            Err(ParseError::HeaderNotFound)
        ));
    }

    #[test]
    fn unrecognized_header_is_not_found() {
        let table = RawTable::from_rows(vec![
            row(&["Ref", "Memo", "Value", "Notes", "Tag"]),
            row(&["1", "x", "2.00", "", ""]),
        ]);
        let a = aliases();
        assert!(matches!(
            locate_header(&table, &rules(&a)),
            Err(ParseError::HeaderNotFound)
        ));
    }

    // ── column_labels / HeaderMapping ─────────────────────────────────────────

    #[test]
    fn blank_and_duplicate_labels_are_disambiguated() {
        let header = row(&["Posting Date", "", "Amount", " Amount ", "Amount"]);
        assert_eq!(
            column_labels(&header),
            labels(&["Posting Date", "empty_col_1", "Amount", "Amount_1", "Amount_2"])
        );
    }

    #[test]
    fn mapping_resolves_legacy_header() {
        let header = row(&[
            "Posting Date",
            "Description",
            "",
            "Branch",
            "Debit Amount",
            "",
            "Credit Amount",
            "",
            "Running Balance",
            "",
            "Currency",
            "Check Number",
        ]);
        let mapping = HeaderMapping::build(column_labels(&header), &aliases(), 0.8);
        assert_eq!(mapping.column(CanonicalField::PostingDate), Some(0));
        assert_eq!(mapping.column(CanonicalField::DebitAmount), Some(4));
        assert_eq!(mapping.column(CanonicalField::CreditAmount), Some(6));
        assert_eq!(mapping.label(CanonicalField::Currency), Some("Currency"));
        assert!(mapping.missing_for(FormatVariant::Legacy).is_empty());
    }

    #[test]
    fn better_tier_wins_across_columns() {
        let mapping = HeaderMapping::build(
            labels(&["Balance", "Running Balance"]),
            &aliases(),
            0.8,
        );
        assert_eq!(mapping.column(CanonicalField::RunningBalance), Some(1));
        assert_eq!(mapping.tier(CanonicalField::RunningBalance), Some(MatchTier::Exact));
    }

    #[test]
    fn equal_tier_keeps_leftmost() {
        let mapping = HeaderMapping::build(labels(&["Debit", "Debit Amount_x", "Debit"]), &aliases(), 0.8);
        assert_eq!(mapping.column(CanonicalField::DebitAmount), Some(0));
    }

    #[test]
    fn absent_fields_are_reported_missing() {
        let mapping = HeaderMapping::build(labels(&["Book date", "Description"]), &aliases(), 0.8);
        assert_eq!(
            mapping.missing_for(FormatVariant::New),
            vec![CanonicalField::Amount, CanonicalField::CreditDebitIndicator]
        );
        assert_eq!(mapping.column(CanonicalField::Branch), None);
    }

    #[test]
    fn book_date_satisfies_legacy_date_requirement() {
        let mapping = HeaderMapping::build(
            labels(&["Book date", "Description", "Debit", "Credit"]),
            &aliases(),
            0.8,
        );
        assert!(mapping.missing_for(FormatVariant::Legacy).is_empty());
    }

    // ── detect_format ─────────────────────────────────────────────────────────

    #[test]
    fn detects_new_format_with_two_indicators() {
        assert_eq!(
            detect_format(&labels(&["Book date", "Description", "Amount", "Credit/debit indicator"])),
            FormatVariant::New
        );
        assert_eq!(
            detect_format(&labels(&["Account number(BBAN)", "Book date", "Amount"])),
            FormatVariant::New
        );
    }

    #[test]
    fn one_indicator_is_legacy() {
        assert_eq!(
            detect_format(&labels(&["Book date", "Description", "Debit", "Credit"])),
            FormatVariant::Legacy
        );
        assert_eq!(
            detect_format(&labels(&["Posting Date", "Description", "Debit Amount"])),
            FormatVariant::Legacy
        );
    }
}
