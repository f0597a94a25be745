use crate::header::FormatVariant;
use crate::table::Row;
use crate::util::{join_cells, re};

re!(re_month_day_year, r"\w{3}\s+\d{1,2},\s+\d{4}");
re!(re_slash_date, r"\d{1,2}/\d{1,2}/\d{4}");
re!(re_iso_date, r"\d{4}-\d{2}-\d{2}");
re!(re_dash_day_first, r"\d{1,2}-\d{1,2}-\d{4}");

/// Loose shape check, run before any real date parsing. Matches anywhere in
/// the cell.
pub fn looks_like_date(text: &str, variant: FormatVariant) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    let shared = re_month_day_year().is_match(text)
        || re_slash_date().is_match(text)
        || re_iso_date().is_match(text);
    match variant {
        FormatVariant::Legacy => shared,
        FormatVariant::New => shared || re_dash_day_first().is_match(text),
    }
}

/// Rows that survived filtering, tagged with their index within the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredRows {
    pub rows: Vec<(usize, Row)>,
    /// Body index of the end-of-report row, if one was seen.
    pub truncated_at: Option<usize>,
    /// Rows before the boundary rejected for lacking a date-shaped cell.
    pub skipped: usize,
}

/// Stop at the first row containing an end-of-report marker, and keep only
/// rows whose date cell looks like a date.
pub fn filter_rows(
    body: Vec<Row>,
    date_column: usize,
    variant: FormatVariant,
    end_markers: &[String],
) -> FilteredRows {
    let mut out = FilteredRows::default();

    for (idx, row) in body.into_iter().enumerate() {
        let text = join_cells(&row);
        if end_markers.iter().any(|m| text.contains(m.as_str())) {
            out.truncated_at = Some(idx);
            break;
        }

        let is_transaction = row
            .get(date_column)
            .and_then(|cell| cell.as_deref())
            .is_some_and(|cell| looks_like_date(cell, variant));
        if is_transaction {
            out.rows.push((idx, row));
        } else {
            out.skipped += 1;
        }
    }

    out
}
