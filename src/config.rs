//! Configuration management and validation.
//!
//! Conversion settings are read from a TOML file with a fixed set of
//! recognised keys. Unknown keys are rejected so that typos surface as
//! errors instead of silently falling back to defaults.

use crate::constants::{DEFAULT_ATTRIBUTION, INPUT_EXTENSION};
use crate::error::{BdcnError, Result};
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    #[default]
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    #[serde(alias = "none")]
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = BdcnError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "snappy" => Ok(CompressionAlgorithm::Snappy),
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            "lz4" => Ok(CompressionAlgorithm::Lz4),
            "none" | "uncompressed" => Ok(CompressionAlgorithm::Uncompressed),
            other => Err(BdcnError::configuration(format!(
                "unknown compression '{}' (expected snappy, zstd, lz4 or none)",
                other
            ))),
        }
    }
}

/// Settings for a batch conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BdcnConfig {
    /// Directory searched recursively for raw station files
    pub input_dir: PathBuf,

    /// Root under which converted datasets are written
    pub output_dir: PathBuf,

    /// Extension of raw station files
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Parquet compression
    #[serde(default)]
    pub compression: CompressionAlgorithm,

    /// Appended to the conversion comment of every dataset
    #[serde(default = "default_attribution")]
    pub attribution: String,
}

fn default_extension() -> String {
    INPUT_EXTENSION.to_string()
}

fn default_attribution() -> String {
    DEFAULT_ATTRIBUTION.to_string()
}

impl BdcnConfig {
    /// Create configuration with default optional settings
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            extension: default_extension(),
            compression: CompressionAlgorithm::default(),
            attribution: default_attribution(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BdcnError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            BdcnError::ConfigParse { source, .. } => BdcnError::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|source| BdcnError::ConfigParse {
            path: PathBuf::new(),
            source,
        })
    }

    /// Override the input directory
    pub fn with_input_dir(mut self, input_dir: impl Into<PathBuf>) -> Self {
        self.input_dir = input_dir.into();
        self
    }

    /// Override the output directory
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Set the parquet compression algorithm
    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }

    /// Set the attribution used in conversion comments
    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self
    }

    /// Check that both directories exist and the extension is usable
    pub fn validate(&self) -> Result<()> {
        if !self.input_dir.is_dir() {
            return Err(BdcnError::InputNotFound {
                path: self.input_dir.clone(),
            });
        }

        if !self.output_dir.is_dir() {
            return Err(BdcnError::configuration(format!(
                "output_dir is not a directory: {}",
                self.output_dir.display()
            )));
        }

        let extension = self.extension.trim_start_matches('.');
        if extension.is_empty() || extension.contains(['/', '*']) {
            return Err(BdcnError::configuration(format!(
                "invalid input extension '{}'",
                self.extension
            )));
        }

        Ok(())
    }
}
