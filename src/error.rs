//! Error handling for BDCN processing operations.
//!
//! Provides error types with context for structural parse failures,
//! value and date conversion, header field extraction, configuration,
//! output writing and station downloads.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BdcnError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Separator line not found: expected \"{separator}\"")]
    MissingSeparator { separator: &'static str },

    #[error("Malformed data row at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid value for {column} at line {line}: '{token}'")]
    ValueConversion {
        line: usize,
        column: &'static str,
        token: String,
    },

    #[error("Invalid date '{value}': expected DD/MM/YYYY")]
    DateFormat { value: String },

    #[error("Missing header field: {key}")]
    MissingField { key: String },

    #[error("Invalid header field {key} = '{value}': {reason}")]
    InvalidField {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Conversion failed for file: {path}")]
    Conversion {
        path: PathBuf,
        #[source]
        source: Box<BdcnError>,
    },

    #[error("Input directory not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to parse configuration file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown BDCN state number: {state}")]
    UnknownState { state: u32 },

    #[error("HTTP request failed for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl BdcnError {
    /// Attach the path of the file being converted
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::Conversion {
            path: path.into(),
            source: Box::new(self),
        }
    }

    pub fn missing_field(key: impl Into<String>) -> Self {
        Self::MissingField { key: key.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BdcnError>;
