//! Station file conversion.
//!
//! Runs the parse, normalize and metadata stages over one in-memory
//! station file and assembles the resulting dataset.

use crate::clock::{Clock, SystemClock};
use crate::constants::DEFAULT_ATTRIBUTION;
use crate::error::{BdcnError, Result};
use crate::header::MetadataExtractor;
use crate::models::{StationDataset, Variable};
use crate::normalizer::normalize;
use crate::parser::{decode_latin1, parse_records, split_lines, split_sections};
use std::path::Path;
use tracing::debug;

/// Converts BDCN station text into a [`StationDataset`]
#[derive(Debug, Clone)]
pub struct BdcnConverter<C: Clock = SystemClock> {
    clock: C,
    attribution: String,
}

impl Default for BdcnConverter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl BdcnConverter<SystemClock> {
    pub fn new() -> Self {
        Self {
            clock: SystemClock,
            attribution: DEFAULT_ATTRIBUTION.to_string(),
        }
    }
}

impl<C: Clock> BdcnConverter<C> {
    /// Use a different time source for the conversion comment
    pub fn with_clock<T: Clock>(self, clock: T) -> BdcnConverter<T> {
        BdcnConverter {
            clock,
            attribution: self.attribution,
        }
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self
    }

    /// Convert already decoded file content
    pub fn convert_str(&self, content: &str) -> Result<StationDataset> {
        let lines = split_lines(content);
        let sections = split_sections(&lines)?;

        let parsed = parse_records(sections.data, sections.first_data_line)?;
        let (series, report) = normalize(parsed.records);
        debug!(
            "Series normalized: {} days, {} duplicates, {} gaps",
            series.len(),
            report.duplicates_dropped,
            report.gaps_filled
        );

        let metadata =
            MetadataExtractor::new(&self.clock, &self.attribution).extract(sections.header, &series)?;

        Ok(StationDataset {
            series,
            metadata,
            variables: Variable::ALL.iter().map(|v| v.attributes()).collect(),
            skipped_rows: parsed.skipped_rows,
        })
    }

    /// Convert raw Latin-1 encoded file bytes
    pub fn convert_bytes(&self, bytes: &[u8]) -> Result<StationDataset> {
        self.convert_str(&decode_latin1(bytes))
    }

    /// Read and convert a station file from disk
    pub fn convert_file(&self, path: &Path) -> Result<StationDataset> {
        let bytes = std::fs::read(path).map_err(|e| BdcnError::from(e).in_file(path))?;
        self.convert_bytes(&bytes).map_err(|e| e.in_file(path))
    }
}
