use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Which input collection a record or column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Claims,
    Invoices,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claims => write!(f, "claims"),
            Self::Invoices => write!(f, "invoices"),
        }
    }
}

/// Required columns absent from one dataset's header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingColumns {
    pub dataset: Dataset,
    pub columns: Vec<String>,
}

impl fmt::Display for MissingColumns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} missing: {}", self.dataset, self.columns.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum ReconError {
    /// Required columns missing. The whole batch is rejected before any row is read.
    #[error("schema error: {}", join_missing(.0))]
    Schema(Vec<MissingColumns>),
    /// Malformed pagination request.
    #[error("invalid page request: {0}")]
    InvalidPage(String),
    /// CSV structure could not be read (bad header row, encoding).
    #[error("{dataset} CSV error: {message}")]
    Csv { dataset: Dataset, message: String },
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (zero bins, limits out of range).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Patient directory could not be loaded.
    #[error("patient directory error: {0}")]
    PatientDirectory(String),
    /// Background run panicked or was cancelled.
    #[error("reconciliation task failed: {0}")]
    Task(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReconError {
    /// Missing columns of a schema rejection, empty for every other error.
    pub fn missing_columns(&self) -> &[MissingColumns] {
        match self {
            Self::Schema(missing) => missing,
            _ => &[],
        }
    }
}

fn join_missing(missing: &[MissingColumns]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single row excluded from the batch. Non-fatal: collected into warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowParseError {
    pub dataset: Dataset,
    /// 1-based data row index (the header row is not counted).
    pub row: usize,
    pub field: String,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for RowParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} row {}: field '{}' {} (value '{}')",
            self.dataset, self.row, self.field, self.reason, self.value
        )
    }
}
