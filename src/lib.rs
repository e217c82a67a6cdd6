//! BDCN Processor Library
//!
//! A Rust library for converting daily station records from Mexico's
//! National Climatological Database (BDCN) into Parquet datasets with
//! station metadata attached.
//!
//! This library provides tools for:
//! - Parsing BDCN station files (header block, separator, daily table)
//! - Removing duplicate days and filling calendar gaps with missing values
//! - Extracting normalized station metadata from the file header
//! - Writing Parquet files with a JSON attribute sidecar
//! - Converting whole directory trees with per-file error isolation
//! - Downloading raw station files from the public BDCN endpoint

pub mod cli;
pub mod clock;
pub mod config;
pub mod constants;
pub mod converter;
pub mod downloader;
pub mod error;
pub mod header;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod processor;
pub mod writer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BdcnConfig, CompressionAlgorithm};
pub use converter::BdcnConverter;
pub use error::{BdcnError, Result};
pub use models::{DailySeries, Operability, StationDataset, StationMetadata, Variable};
pub use processor::BatchProcessor;
