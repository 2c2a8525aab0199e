//! Error types for the screening pipeline.
//!
//! Only [`ScreenerError`] crosses the top-level boundary. Per-symbol
//! [`FetchError`]s and field-level [`AggregationError`]s are absorbed where
//! they occur and turned into absent values.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Fatal errors that abort a run with a non-zero outcome.
#[derive(Error, Debug)]
pub enum ScreenerError {
    #[error("Setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("Writing results failed: {0}")]
    Output(#[from] OutputError),
}

/// Problems detected before any fetch is attempted.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Header row {0} is not present in the input")]
    MissingHeaderRow(usize),

    #[error("Required column \"{column}\" not found in header row {row}")]
    MissingColumn { column: String, row: usize },

    #[error("Failed to read input table: {0}")]
    Table(#[from] csv::Error),

    #[error("Failed to download source table: {0}")]
    Download(String),

    #[error("Invalid configuration value for {key}: {value}")]
    Config { key: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to persist the run's result artifacts.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single failed attempt to retrieve data for one symbol.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Provider(err.to_string())
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::Provider(format!("invalid request URL: {}", err))
    }
}

/// A numeric field that could not be interpreted. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed numeric value: {0:?}")]
pub struct AggregationError(pub String);

/// Errors from delivering the finished report.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Attachment not found: {}", .0.display())]
    AttachmentNotFound(PathBuf),

    #[error("Attachment is too large ({size} bytes, limit {limit} bytes)")]
    AttachmentTooLarge { size: u64, limit: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Channel rejected the request: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
