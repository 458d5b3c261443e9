//! Reads the procurement extract into memory in one pass.

use crate::constants::is_date_column;
use crate::error::Result;
use crate::model::EntityKind;
use crate::table::Table;
use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Read a delimited file with a header row. Missing or unparsable input is
/// fatal; there is no partial load.
#[instrument]
pub fn load_csv(path: &Path) -> Result<Table> {
    let file = File::open(path)?;
    let table = read_table(BufReader::new(file))?;
    info!(
        rows = table.row_count(),
        columns = table.column_count(),
        "Read CSV extract"
    );
    Ok(table)
}

/// Parse CSV content from any reader. Rows must all have the header's width.
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut raw_rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        raw_rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    debug!("Parsed {} raw records", raw_rows.len());

    Ok(Table::from_raw(headers, raw_rows))
}

/// Every column a node projection needs, except the tolerated date columns.
pub fn required_columns() -> Vec<&'static str> {
    EntityKind::ALL
        .iter()
        .flat_map(|kind| kind.columns().iter().copied())
        .filter(|c| !is_date_column(c))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct non-null key counts per label, reported before any writes.
#[derive(Debug, Clone, Serialize)]
pub struct KeySummary {
    pub counts: Vec<(EntityKind, usize)>,
}

impl KeySummary {
    pub fn from_table(table: &Table) -> Self {
        Self {
            counts: EntityKind::ALL
                .iter()
                .map(|kind| (*kind, table.distinct_non_null(kind.key_field())))
                .collect(),
        }
    }

    pub fn get(&self, kind: EntityKind) -> usize {
        self.counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn print(&self) {
        println!("\n🔎 Unique ID counts per label:");
        for (kind, count) in &self.counts {
            println!("   {:<18}: {}", kind.key_field(), count);
            info!(label = %kind, distinct_keys = count, "Distinct key count");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::table::CellValue;
    use std::io::Write;

    #[test]
    fn test_read_table_normalizes_missing() {
        let data = "ID,VendorCode,POQuantity\nPO1,V1,5\nPO2,,NaN\n";
        let table = read_table(data.as_bytes()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.get(1, "VendorCode"), Some(&CellValue::Null));
        assert_eq!(table.get(1, "POQuantity"), Some(&CellValue::Null));
        assert_eq!(table.get(0, "POQuantity"), Some(&CellValue::Int(5)));
    }

    #[test]
    fn test_ragged_rows_are_fatal() {
        let data = "ID,VendorCode\nPO1,V1,extra\n";
        assert!(matches!(read_table(data.as_bytes()), Err(IngestError::Csv(_))));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = load_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
    }

    #[test]
    fn test_load_csv_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "VendorCode,VendorName").unwrap();
        writeln!(file, "V1,Acme").unwrap();
        writeln!(file, "V1,Acme Ltd").unwrap();
        let table = load_csv(file.path()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.distinct_non_null("VendorCode"), 1);
    }

    #[test]
    fn test_required_columns_exclude_dates() {
        let required = required_columns();
        assert!(required.contains(&"ID"));
        assert!(required.contains(&"BusinessUnitCode"));
        assert!(!required.contains(&"PODate"));
        // shared foreign keys appear once
        assert_eq!(required.iter().filter(|c| **c == "VendorCode").count(), 1);
    }

    #[test]
    fn test_key_summary() {
        let data = "ID,MaterialCode,WarehouseLocation,VendorCode,BusinessUnitCode\n\
                    PO1,M1,W1,V1,B1\n\
                    PO2,M1,,V1,B1\n";
        let table = read_table(data.as_bytes()).unwrap();
        let summary = KeySummary::from_table(&table);
        assert_eq!(summary.get(EntityKind::PurchaseOrder), 2);
        assert_eq!(summary.get(EntityKind::Material), 1);
        assert_eq!(summary.get(EntityKind::Warehouse), 1);
    }
}
