//! Error types for the record store and tabular exporter.

/// Failure while rendering or writing the tabular artifact.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("failed to write tabular export: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Failure while mutating the record store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("failed to write record store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("record store document is not a list of records: {0}")]
    UnexpectedDocument(String),
    #[error("no record id left above the highest stored id")]
    IdSpaceExhausted,
}

impl StoreError {
    /// Whether the caller sent bad input, as opposed to the service failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoreError::InvalidRecord(_))
    }
}
