//! Defaults and fixed column vocabularies.

pub const DEFAULT_CSV_PATH: &str = "cleaned_data.csv";
pub const DEFAULT_CONFIG_PATH: &str = "ingest.toml";
pub const DEFAULT_NEO4J_URI: &str = "bolt://localhost:7687";
pub const DEFAULT_NEO4J_USER: &str = "neo4j";
pub const DEFAULT_BATCH_SIZE: usize = 20_000;

// Environment variable names
pub const ENV_CSV_PATH: &str = "CSV_PATH";
pub const ENV_NEO4J_URI: &str = "NEO4J_URI";
pub const ENV_NEO4J_USER: &str = "NEO4J_USER";
pub const ENV_NEO4J_PASSWORD: &str = "NEO4J_PASSWORD";
pub const ENV_NEO4J_DATABASE: &str = "NEO4J_DATABASE";
pub const ENV_BATCH_SIZE: &str = "INGEST_BATCH_SIZE";
pub const ENV_STRICT: &str = "INGEST_STRICT";

/// Columns holding `YYYYMMDD` dates that are rewritten to ISO form.
pub const DATE_COLUMNS: [&str; 5] = [
    "PODate",
    "ExpectedDeliveryStartDate",
    "ExpectedDeliveryEndDate",
    "ActualDeliveryDate",
    "ReceivedDate",
];

/// Cell contents treated as a missing value when reading the extract.
pub const NA_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_date_column(column: &str) -> bool {
    DATE_COLUMNS.contains(&column)
}

/// Empty cells and any of the [`NA_MARKERS`] count as missing.
pub fn is_missing_marker(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NA_MARKERS.contains(&trimmed)
}
