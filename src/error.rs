use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumn(Vec<String>),

    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Write to {target} failed at batch {batch}: {message}")]
    BatchWrite {
        target: String,
        batch: usize,
        message: String,
    },

    #[error("Database query failed: {0}")]
    Query(String),

    #[error("Strict mode: dropped {dropped} {label} row(s) with missing `{field}`")]
    StrictViolation {
        label: String,
        field: String,
        dropped: usize,
    },
}

/// How a failure relates to the run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Input or database unavailable before any write happened.
    Setup,
    /// A value-level problem; recovered locally unless strict mode is on.
    Data,
    /// A write transaction failed; batches committed earlier stay persisted.
    BatchWrite,
}

impl IngestError {
    pub fn class(&self) -> ErrorClass {
        match self {
            IngestError::StrictViolation { .. } => ErrorClass::Data,
            IngestError::BatchWrite { .. } | IngestError::Query(_) => ErrorClass::BatchWrite,
            _ => ErrorClass::Setup,
        }
    }
}

impl From<neo4rs::Error> for IngestError {
    fn from(err: neo4rs::Error) -> Self {
        IngestError::Query(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let strict = IngestError::StrictViolation {
            label: "Vendor".to_string(),
            field: "VendorCode".to_string(),
            dropped: 2,
        };
        assert_eq!(strict.class(), ErrorClass::Data);

        let write = IngestError::BatchWrite {
            target: "Material".to_string(),
            batch: 3,
            message: "deadlock".to_string(),
        };
        assert_eq!(write.class(), ErrorClass::BatchWrite);

        let missing = IngestError::MissingColumn(vec!["VendorCode".to_string()]);
        assert_eq!(missing.class(), ErrorClass::Setup);
        assert_eq!(missing.to_string(), "Missing required column(s): VendorCode");
    }
}
