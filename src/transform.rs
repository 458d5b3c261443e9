//! Date normalization for the `YYYYMMDD` columns of the extract.

use crate::constants::DATE_COLUMNS;
use crate::table::{CellValue, Table};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

/// Convert a compact `YYYYMMDD` value to an ISO `YYYY-MM-DD` string.
///
/// Anything else (wrong length, non-digits, impossible calendar date, null)
/// becomes [`CellValue::Null`]; a malformed date is treated as missing.
pub fn format_date(value: &CellValue) -> CellValue {
    let Some(text) = value.as_text() else {
        return CellValue::Null;
    };
    let text = text.trim();
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return CellValue::Null;
    }
    match NaiveDate::parse_from_str(text, "%Y%m%d") {
        Ok(date) => CellValue::Text(date.format("%Y-%m-%d").to_string()),
        Err(_) => CellValue::Null,
    }
}

/// Per-column outcome of date formatting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DateReport {
    pub formatted: Vec<(&'static str, usize)>,
    pub invalid: Vec<(&'static str, usize)>,
    pub skipped: Vec<&'static str>,
}

impl DateReport {
    pub fn invalid_total(&self) -> usize {
        self.invalid.iter().map(|(_, n)| n).sum()
    }
}

/// Rewrite every date column present in `table`. Absent columns are skipped.
pub fn format_date_columns(table: &mut Table) -> DateReport {
    let mut report = DateReport::default();

    for column in DATE_COLUMNS {
        let mut formatted = 0;
        let mut invalid = 0;
        let present = table.map_column(column, |cell| {
            let out = format_date(cell);
            match (cell.is_null(), out.is_null()) {
                (false, true) => invalid += 1,
                (false, false) => formatted += 1,
                _ => {}
            }
            out
        });

        if !present {
            debug!("Date column {} not present, skipping", column);
            report.skipped.push(column);
            continue;
        }
        if invalid > 0 {
            warn!("⚠️ {} value(s) in `{}` were not valid YYYYMMDD dates and were set to null", invalid, column);
        }
        report.formatted.push((column, formatted));
        report.invalid.push((column, invalid));
    }

    report
}
