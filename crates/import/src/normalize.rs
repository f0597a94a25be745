use bankprep_core::Money;
use chrono::NaiveDate;
use std::fmt;

use crate::header::{CanonicalField, FormatVariant, HeaderMapping};
use crate::util::re;

re!(re_plain_decimal, r"^[+-]?(\d+(\.\d*)?|\.\d+)$");

/// Tried in order; the first format that parses wins.
pub const LEGACY_DATE_FORMATS: &[&str] = &["%b %d, %Y", "%m/%d/%Y", "%Y-%m-%d", "%d/%m/%Y"];

pub const NEW_DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%d/%m/%Y",
];

pub fn date_formats(variant: FormatVariant) -> &'static [&'static str] {
    match variant {
        FormatVariant::Legacy => LEGACY_DATE_FORMATS,
        FormatVariant::New => NEW_DATE_FORMATS,
    }
}

pub fn parse_date(text: &str, formats: &[&str]) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Strip thousands separators and validate as a plain decimal (no exponent,
/// no digit grouping other than commas). Blank or invalid input yields `None`.
/// Cleaning an already-cleaned value is a no-op.
pub fn clean_amount(text: &str) -> Option<Money> {
    let cleaned = text.trim().replace(',', "");
    if !re_plain_decimal().is_match(&cleaned) {
        return None;
    }
    cleaned.parse::<Money>().ok()
}

/// Trim and collapse internal whitespace runs to a single space.
pub fn clean_description(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Debit,
    Credit,
}

impl Indicator {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "debit" => Some(Indicator::Debit),
            "credit" => Some(Indicator::Credit),
            _ => None,
        }
    }
}

/// Field values of one retained row after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub date: NaiveDate,
    pub description: String,
    pub debit: Option<Money>,
    pub credit: Option<Money>,
    /// Non-blank amount cells that failed validation and were emptied.
    pub cleared_amounts: usize,
}

/// Why a row was excluded from the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDefect {
    DateUnparseable(String),
    AmountInvalid(String),
    NoAmountOnEitherSide(String),
    DescriptionMissing,
}

impl fmt::Display for RowDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowDefect::DateUnparseable(v) => write!(f, "unparseable date '{v}'"),
            RowDefect::AmountInvalid(v) => write!(f, "invalid amount '{v}'"),
            RowDefect::NoAmountOnEitherSide(v) => {
                write!(f, "unknown credit/debit indicator '{v}'")
            }
            RowDefect::DescriptionMissing => write!(f, "blank description"),
        }
    }
}

fn cell<'a>(row: &'a [Option<String>], column: Option<usize>) -> &'a str {
    column
        .and_then(|c| row.get(c))
        .and_then(|v| v.as_deref())
        .unwrap_or("")
}

/// Extract and normalize one row according to the format variant.
pub fn normalize_row(
    row: &[Option<String>],
    mapping: &HeaderMapping,
    variant: FormatVariant,
) -> Result<NormalizedRow, RowDefect> {
    let raw_date = cell(row, mapping.first_column(&variant.date_fields()));
    let date = parse_date(raw_date, date_formats(variant))
        .ok_or_else(|| RowDefect::DateUnparseable(raw_date.trim().to_string()))?;
    let description = clean_description(cell(row, mapping.column(CanonicalField::Description)));

    match variant {
        FormatVariant::Legacy => {
            let mut cleared_amounts = 0;
            let mut side = |field: CanonicalField| {
                let raw = cell(row, mapping.column(field));
                let amount = clean_amount(raw);
                if amount.is_none() && !raw.trim().is_empty() {
                    cleared_amounts += 1;
                }
                amount
            };
            let debit = side(CanonicalField::DebitAmount);
            let credit = side(CanonicalField::CreditAmount);
            Ok(NormalizedRow {
                date,
                description,
                debit,
                credit,
                cleared_amounts,
            })
        }
        FormatVariant::New => {
            if description.is_empty() {
                return Err(RowDefect::DescriptionMissing);
            }
            let raw_amount = cell(row, mapping.column(CanonicalField::Amount));
            let amount = clean_amount(raw_amount)
                .ok_or_else(|| RowDefect::AmountInvalid(raw_amount.trim().to_string()))?;
            let raw_indicator = cell(row, mapping.column(CanonicalField::CreditDebitIndicator));
            let (debit, credit) = match Indicator::parse(raw_indicator) {
                Some(Indicator::Debit) => (Some(amount), None),
                Some(Indicator::Credit) => (None, Some(amount)),
                None => {
                    return Err(RowDefect::NoAmountOnEitherSide(
                        raw_indicator.trim().to_string(),
                    ))
                }
            };
            Ok(NormalizedRow {
                date,
                description,
                debit,
                credit,
                cleared_amounts: 0,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::AliasTable;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(cells: &[&str]) -> Vec<Option<String>> {
        cells
            .iter()
            .map(|c| (!c.is_empty()).then(|| c.to_string()))
            .collect()
    }

    fn mapping(labels: &[&str]) -> HeaderMapping {
        HeaderMapping::build(
            labels.iter().map(|l| l.to_string()).collect(),
            &AliasTable::default(),
            0.8,
        )
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn parse_date_legacy_shapes() {
        assert_eq!(parse_date("Feb 29, 2024", LEGACY_DATE_FORMATS), Some(date(2024, 2, 29)));
        assert_eq!(parse_date("Feb 1, 2024", LEGACY_DATE_FORMATS), Some(date(2024, 2, 1)));
        assert_eq!(parse_date("02/29/2024", LEGACY_DATE_FORMATS), Some(date(2024, 2, 29)));
        assert_eq!(parse_date("2024-02-29", LEGACY_DATE_FORMATS), Some(date(2024, 2, 29)));
    }

    #[test]
    fn parse_date_order_prefers_month_first() {
        // Both M/D and D/M would accept this; M/D is tried first.
        assert_eq!(parse_date("03/04/2024", LEGACY_DATE_FORMATS), Some(date(2024, 3, 4)));
        // Only D/M can accept a day above 12 in first position.
        assert_eq!(parse_date("29/02/2024", LEGACY_DATE_FORMATS), Some(date(2024, 2, 29)));
    }

    #[test]
    fn parse_date_new_formats() {
        assert_eq!(parse_date("30-06-2025", NEW_DATE_FORMATS), Some(date(2025, 6, 30)));
        assert_eq!(parse_date("March 31, 2025", NEW_DATE_FORMATS), Some(date(2025, 3, 31)));
        assert_eq!(parse_date("Mar 31, 2025", NEW_DATE_FORMATS), Some(date(2025, 3, 31)));
        assert_eq!(parse_date("30-06-2025", LEGACY_DATE_FORMATS), None);
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(parse_date("Invalid date", LEGACY_DATE_FORMATS), None);
        assert_eq!(parse_date("", LEGACY_DATE_FORMATS), None);
        assert_eq!(parse_date("Feb 30, 2024", LEGACY_DATE_FORMATS), None);
    }

    #[test]
    fn canonical_date_round_trips_through_parser() {
        for raw in ["Feb 29, 2024", "12/31/2023", "2024-01-05", "25/12/2024"] {
            let parsed = parse_date(raw, LEGACY_DATE_FORMATS).unwrap();
            let canonical = parsed.format("%Y-%m-%d").to_string();
            assert_eq!(parse_date(&canonical, LEGACY_DATE_FORMATS), Some(parsed), "{raw}");
        }
    }

    // ── clean_amount ──────────────────────────────────────────────────────────

    #[test]
    fn clean_amount_strips_commas() {
        assert_eq!(clean_amount("1,234.56").unwrap().to_string(), "1234.56");
        assert_eq!(clean_amount("55,677.05").unwrap().to_string(), "55677.05");
        assert_eq!(clean_amount(" 0.00 ").unwrap().to_string(), "0.00");
    }

    #[test]
    fn clean_amount_invalid_is_empty() {
        assert_eq!(clean_amount(""), None);
        assert_eq!(clean_amount("   "), None);
        assert_eq!(clean_amount("N/A"), None);
        assert_eq!(clean_amount("Not a number"), None);
    }

    #[test]
    fn clean_amount_keeps_written_form() {
        assert_eq!(clean_amount("-0.00").unwrap().to_string(), "-0.00");
        assert_eq!(clean_amount("+5.10").unwrap().to_string(), "5.10");
    }

    #[test]
    fn clean_amount_rejects_exponent_and_underscores() {
        assert_eq!(clean_amount("1_000"), None);
        assert_eq!(clean_amount("1e5"), None);
        assert_eq!(clean_amount("1E-2"), None);
        assert_eq!(clean_amount("12.5.1"), None);
        assert_eq!(clean_amount("1 000"), None);
    }

    #[test]
    fn clean_amount_is_idempotent() {
        for raw in ["1,234.56", "150.00", "0.55", "-12.5", "1,000,000"] {
            let once = clean_amount(raw).unwrap().to_string();
            let twice = clean_amount(&once).unwrap().to_string();
            assert_eq!(once, twice);
        }
    }

    // ── clean_description ─────────────────────────────────────────────────────

    #[test]
    fn clean_description_collapses_whitespace() {
        assert_eq!(clean_description("INTEREST PAY SYS-GEN"), "INTEREST PAY SYS-GEN");
        assert_eq!(clean_description("  MULTIPLE   SPACES  "), "MULTIPLE SPACES");
        assert_eq!(clean_description("TAB\tAND\nNEWLINE"), "TAB AND NEWLINE");
        assert_eq!(clean_description(""), "");
    }

    // ── normalize_row ─────────────────────────────────────────────────────────

    #[test]
    fn legacy_row_takes_both_sides_directly() {
        let m = mapping(&["Posting Date", "Description", "Debit Amount", "Credit Amount"]);
        let out = normalize_row(
            &row(&["Feb 29, 2024", "  INTEREST   WITHHELD ", "0.55", ""]),
            &m,
            FormatVariant::Legacy,
        )
        .unwrap();
        assert_eq!(out.date, date(2024, 2, 29));
        assert_eq!(out.description, "INTEREST WITHHELD");
        assert_eq!(out.debit.unwrap().to_string(), "0.55");
        assert_eq!(out.credit, None);
        assert_eq!(out.cleared_amounts, 0);
    }

    #[test]
    fn legacy_invalid_amount_is_cleared_not_dropped() {
        let m = mapping(&["Posting Date", "Description", "Debit Amount", "Credit Amount"]);
        let out = normalize_row(
            &row(&["Feb 29, 2024", "ODD", "N/A", ""]),
            &m,
            FormatVariant::Legacy,
        )
        .unwrap();
        assert_eq!(out.debit, None);
        assert_eq!(out.credit, None);
        assert_eq!(out.cleared_amounts, 1);
    }

    #[test]
    fn new_row_without_description_is_a_defect() {
        let m = mapping(&["Book date", "Description", "Amount", "Credit/debit indicator"]);
        let result = normalize_row(&row(&["30-06-2025", "   ", "5.00", "Debit"]), &m, FormatVariant::New);
        assert_eq!(result, Err(RowDefect::DescriptionMissing));
    }

    #[test]
    fn legacy_row_without_description_is_kept() {
        let m = mapping(&["Posting Date", "Description", "Debit Amount", "Credit Amount"]);
        let out = normalize_row(&row(&["Feb 29, 2024", "", "1.00", ""]), &m, FormatVariant::Legacy)
            .unwrap();
        assert_eq!(out.description, "");
    }

    #[test]
    fn unparseable_date_is_a_defect() {
        let m = mapping(&["Posting Date", "Description", "Debit Amount", "Credit Amount"]);
        let result = normalize_row(&row(&["Feb 30, 2024", "X", "1.00", ""]), &m, FormatVariant::Legacy);
        assert_eq!(result, Err(RowDefect::DateUnparseable("Feb 30, 2024".to_string())));
    }

    #[test]
    fn new_row_routes_amount_by_indicator() {
        let m = mapping(&["Book date", "Description", "Amount", "Credit/debit indicator"]);
        let debit = normalize_row(
            &row(&["30-06-2025", "ATM FEE", "150.00", "Debit"]),
            &m,
            FormatVariant::New,
        )
        .unwrap();
        assert_eq!(debit.debit.unwrap().to_string(), "150.00");
        assert_eq!(debit.credit, None);

        let credit = normalize_row(
            &row(&["30-06-2025", "SALARY", "1,000.00", "CREDIT"]),
            &m,
            FormatVariant::New,
        )
        .unwrap();
        assert_eq!(credit.debit, None);
        assert_eq!(credit.credit.unwrap().to_string(), "1000.00");
    }

    #[test]
    fn new_row_without_valid_amount_is_a_defect() {
        let m = mapping(&["Book date", "Description", "Amount", "Credit/debit indicator"]);
        assert_eq!(
            normalize_row(&row(&["30-06-2025", "X", "N/A", "Debit"]), &m, FormatVariant::New),
            Err(RowDefect::AmountInvalid("N/A".to_string()))
        );
        assert_eq!(
            normalize_row(&row(&["30-06-2025", "X", "", "Debit"]), &m, FormatVariant::New),
            Err(RowDefect::AmountInvalid(String::new()))
        );
    }

    #[test]
    fn new_row_with_unknown_indicator_is_a_defect() {
        let m = mapping(&["Book date", "Description", "Amount", "Credit/debit indicator"]);
        assert!(matches!(
            normalize_row(&row(&["30-06-2025", "X", "5.00", "Reversal"]), &m, FormatVariant::New),
            Err(RowDefect::NoAmountOnEitherSide(_))
        ));
    }

    #[test]
    fn indicator_is_case_insensitive() {
        assert_eq!(Indicator::parse(" debit "), Some(Indicator::Debit));
        assert_eq!(Indicator::parse("Credit"), Some(Indicator::Credit));
        assert_eq!(Indicator::parse("dr"), None);
    }
}
