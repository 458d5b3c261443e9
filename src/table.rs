//! In-memory tabular view of the source extract.

use crate::constants::{is_date_column, is_missing_marker};
use crate::error::{IngestError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};

/// A single cell after missing-value normalization and type inference.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// Textual rendering used for date parsing and reporting.
    /// Integral floats render without a fractional part.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
                Some(format!("{}", *f as i64))
            }
            CellValue::Float(f) => Some(f.to_string()),
            CellValue::Text(s) => Some(s.clone()),
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => a.to_bits() == b.to_bits(),
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Null => {}
            CellValue::Int(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Text(s) => s.hash(state),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

/// One projected row: column name to cell, in stable column order.
pub type PropertyMap = BTreeMap<&'static str, CellValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ColumnType {
    Int,
    Float,
    Text,
}

fn is_digit_string(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Integers only count as such when they survive a round trip, so codes
/// with leading zeros or a `+` sign stay textual.
fn classify(raw: &str) -> ColumnType {
    if raw.parse::<i64>().map(|i| i.to_string() == raw).unwrap_or(false) {
        ColumnType::Int
    } else if is_digit_string(raw) {
        ColumnType::Text
    } else if raw.parse::<f64>().map(|f| f.is_finite()).unwrap_or(false) {
        ColumnType::Float
    } else {
        ColumnType::Text
    }
}

fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut inferred = ColumnType::Int;
    for raw in values {
        inferred = inferred.max(classify(raw));
        if inferred == ColumnType::Text {
            break;
        }
    }
    inferred
}

/// Numbers are parsed from the trimmed cell; text keeps the cell as written.
fn convert(raw: &str, column_type: ColumnType) -> CellValue {
    let trimmed = raw.trim();
    match column_type {
        ColumnType::Int => trimmed.parse().map(CellValue::Int).unwrap_or(CellValue::Null),
        ColumnType::Float => trimmed.parse().map(CellValue::Float).unwrap_or(CellValue::Null),
        ColumnType::Text => CellValue::Text(raw.to_string()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table from raw string cells: missing markers become
    /// [`CellValue::Null`] and each column gets a single inferred type.
    pub fn from_raw(headers: Vec<String>, raw_rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let column_types: Vec<ColumnType> = (0..width)
            .map(|col| {
                infer_column_type(
                    raw_rows
                        .iter()
                        .filter_map(|row| row.get(col))
                        .map(|raw| raw.trim())
                        .filter(|raw| !is_missing_marker(raw)),
                )
            })
            .collect();

        let rows = raw_rows
            .iter()
            .map(|row| {
                (0..width)
                    .map(|col| match row.get(col) {
                        Some(raw) if !is_missing_marker(raw) => convert(raw, column_types[col]),
                        _ => CellValue::Null,
                    })
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Fails with every absent column listed at once.
    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(IngestError::MissingColumn(missing))
        }
    }

    /// Project every row onto `columns`. Absent date columns are left out of
    /// the maps; any other absent column is an error.
    pub fn project(&self, columns: &[&'static str]) -> Result<Vec<PropertyMap>> {
        let required: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| !is_date_column(c))
            .collect();
        self.require_columns(&required)?;

        let indices: Vec<(&'static str, usize)> = columns
            .iter()
            .filter_map(|c| self.column_index(c).map(|idx| (*c, idx)))
            .collect();

        Ok(self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|(name, idx)| (*name, row[*idx].clone()))
                    .collect()
            })
            .collect())
    }

    /// Number of distinct non-null values in `column` (0 when absent).
    pub fn distinct_non_null(&self, column: &str) -> usize {
        let Some(idx) = self.column_index(column) else {
            return 0;
        };
        self.rows
            .iter()
            .map(|row| &row[idx])
            .filter(|cell| !cell.is_null())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Number of null cells in `column` (0 when absent).
    pub fn null_count(&self, column: &str) -> usize {
        let Some(idx) = self.column_index(column) else {
            return 0;
        };
        self.rows.iter().filter(|row| row[idx].is_null()).count()
    }

    /// Rewrite every cell of `column` in place. Returns false when the
    /// column does not exist.
    pub fn map_column<F>(&mut self, column: &str, mut f: F) -> bool
    where
        F: FnMut(&CellValue) -> CellValue,
    {
        let Some(idx) = self.column_index(column) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_missing_markers_become_null() {
        let table = Table::from_raw(
            headers(&["VendorCode", "VendorName"]),
            raw(&[&["V1", ""], &["NaN", "Acme"], &["V3", " N/A "], &["null", "None"]]),
        );
        assert_eq!(table.get(0, "VendorName"), Some(&CellValue::Null));
        assert_eq!(table.get(1, "VendorCode"), Some(&CellValue::Null));
        assert_eq!(table.get(2, "VendorName"), Some(&CellValue::Null));
        assert_eq!(table.get(3, "VendorCode"), Some(&CellValue::Null));
        assert_eq!(table.get(3, "VendorName"), Some(&CellValue::Null));
        assert_eq!(table.get(1, "VendorName"), Some(&CellValue::text("Acme")));
    }

    #[test]
    fn test_column_type_inference() {
        let table = Table::from_raw(
            headers(&["POQuantity", "POAmount", "VendorPostalCode", "VendorCode"]),
            raw(&[&["10", "1.5", "0560", "V1"], &["", "2", "560001", "42"]]),
        );
        assert_eq!(table.get(0, "POQuantity"), Some(&CellValue::Int(10)));
        assert_eq!(table.get(1, "POQuantity"), Some(&CellValue::Null));
        assert_eq!(table.get(0, "POAmount"), Some(&CellValue::Float(1.5)));
        assert_eq!(table.get(1, "POAmount"), Some(&CellValue::Float(2.0)));
        // leading zero keeps the whole column textual
        assert_eq!(table.get(0, "VendorPostalCode"), Some(&CellValue::text("0560")));
        assert_eq!(table.get(1, "VendorPostalCode"), Some(&CellValue::text("560001")));
        assert_eq!(table.get(1, "VendorCode"), Some(&CellValue::text("42")));
    }

    #[test]
    fn test_text_cells_keep_surrounding_whitespace() {
        let table = Table::from_raw(
            headers(&["VendorFullAddress", "POQuantity"]),
            raw(&[&["  12 MG Road, Pune ", " 7 "], &[" ", "3"]]),
        );
        assert_eq!(
            table.get(0, "VendorFullAddress"),
            Some(&CellValue::text("  12 MG Road, Pune "))
        );
        assert_eq!(table.get(1, "VendorFullAddress"), Some(&CellValue::Null));
        assert_eq!(table.get(0, "POQuantity"), Some(&CellValue::Int(7)));
        assert_eq!(table.null_count("VendorFullAddress"), 1);
        assert_eq!(table.null_count("Absent"), 0);
    }

    #[test]
    fn test_short_rows_pad_with_null() {
        let table = Table::from_raw(headers(&["A", "B"]), raw(&[&["x"]]));
        assert_eq!(table.get(0, "B"), Some(&CellValue::Null));
    }

    #[test]
    fn test_project_skips_absent_date_columns_only() {
        let table = Table::from_raw(headers(&["ID", "PONumber"]), raw(&[&["PO1", "100"]]));
        let rows = table.project(&["ID", "PODate", "PONumber"]).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].contains_key("PODate"));
        assert_eq!(rows[0]["PONumber"], CellValue::Int(100));

        let err = table.project(&["ID", "VendorCode"]).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn(cols) if cols == vec!["VendorCode"]));
    }

    #[test]
    fn test_distinct_non_null() {
        let table = Table::from_raw(
            headers(&["VendorCode"]),
            raw(&[&["V1"], &["V1"], &[""], &["V2"]]),
        );
        assert_eq!(table.distinct_non_null("VendorCode"), 2);
        assert_eq!(table.distinct_non_null("Absent"), 0);
    }

    #[test]
    fn test_as_text_for_integral_float() {
        assert_eq!(CellValue::Float(20230115.0).as_text().as_deref(), Some("20230115"));
        assert_eq!(CellValue::Float(1.25).as_text().as_deref(), Some("1.25"));
        assert_eq!(CellValue::Null.as_text(), None);
    }

    #[test]
    fn test_map_column() {
        let mut table = Table::from_raw(headers(&["A"]), raw(&[&["x"], &["y"]]));
        assert!(table.map_column("A", |_| CellValue::Null));
        assert_eq!(table.get(1, "A"), Some(&CellValue::Null));
        assert!(!table.map_column("B", |c| c.clone()));
    }
}
