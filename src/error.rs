use crate::period::PeriodKey;
use thiserror::Error;

/// A single input row that could not be turned into a `SalesRecord`.
///
/// `index` is the zero-based position of the row in the input feed
/// (for a CSV file with a header, the file line is `index + 2`).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("row {index}: {reason} [{content}]")]
pub struct MalformedRecord {
    pub index: usize,
    pub reason: String,
    pub content: String,
}

#[derive(Error, Debug)]
pub enum SalesError {
    #[error("malformed record: {0}")]
    MalformedRecord(#[from] MalformedRecord),

    /// A reduction that needs at least one record was given none.
    #[error("cannot compute {operation} over an empty record set")]
    EmptyInput { operation: &'static str },

    #[error("period {0} has no records")]
    PeriodNotFound(PeriodKey),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SalesError>;
