//! Parquet output for converted station datasets.
//!
//! Each dataset becomes a Parquet file holding the time axis and the four
//! daily variables, plus a JSON document with the global and per-variable
//! attributes. Both files are staged in the destination directory and
//! renamed into place only once fully written.

use crate::config::CompressionAlgorithm;
use crate::constants::{ATTRIBUTES_SUFFIX, OUTPUT_PREFIX, PARQUET_EXTENSION};
use crate::error::{BdcnError, Result};
use crate::models::{DatasetAttributes, StationDataset, Variable};
use polars::prelude::*;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Paths of the files produced for one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDataset {
    pub parquet_path: PathBuf,
    pub attributes_path: PathBuf,
    pub rows: usize,
}

/// Output stem for an input file: `bdc_100_<input stem>`
pub fn output_stem(input: &Path) -> String {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    format!("{}{}", OUTPUT_PREFIX, stem)
}

/// Build the columnar frame for a dataset
///
/// `time` is stored as a naive millisecond datetime; missing values are
/// nulls in the Float32 variable columns.
pub fn to_dataframe(dataset: &StationDataset) -> Result<DataFrame> {
    let series = &dataset.series;
    let millis: Vec<i64> = series
        .time()
        .iter()
        .map(|t| t.and_utc().timestamp_millis())
        .collect();

    let mut columns: Vec<Column> = Vec::with_capacity(Variable::ALL.len() + 1);
    columns.push(
        Series::new("time".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .into(),
    );
    for variable in Variable::ALL {
        columns.push(
            Series::new(
                variable.column_name().into(),
                series.values(variable).to_vec(),
            )
            .into(),
        );
    }

    Ok(DataFrame::new(columns)?)
}

/// Writes datasets as Parquet plus attribute sidecars
#[derive(Debug, Clone)]
pub struct DatasetWriter {
    compression: CompressionAlgorithm,
}

impl Default for DatasetWriter {
    fn default() -> Self {
        Self::new(CompressionAlgorithm::Snappy)
    }
}

impl DatasetWriter {
    pub fn new(compression: CompressionAlgorithm) -> Self {
        Self { compression }
    }

    /// Write `dataset` into `output_dir` under `stem`
    pub fn write(
        &self,
        dataset: &StationDataset,
        output_dir: &Path,
        stem: &str,
    ) -> Result<WrittenDataset> {
        let parquet_path = output_dir.join(format!("{}.{}", stem, PARQUET_EXTENSION));
        let attributes_path = output_dir.join(format!("{}.{}", stem, ATTRIBUTES_SUFFIX));

        let mut df = to_dataframe(dataset)?;
        let rows = df.height();

        let attributes = DatasetAttributes::from(dataset);
        let mut attributes_file = NamedTempFile::new_in(output_dir)?;
        {
            let mut writer = BufWriter::new(attributes_file.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &attributes)?;
            writer.flush()?;
        }

        let mut parquet_file = NamedTempFile::new_in(output_dir)?;
        ParquetWriter::new(parquet_file.as_file_mut())
            .with_compression(self.compression.to_polars_compression())
            .finish(&mut df)
            .map_err(|e| BdcnError::Conversion {
                path: parquet_path.clone(),
                source: Box::new(BdcnError::Polars(e)),
            })?;

        parquet_file
            .persist(&parquet_path)
            .map_err(|e| BdcnError::Io(e.error))?;
        if let Err(e) = attributes_file.persist(&attributes_path) {
            // A dataset without its attributes is not valid output
            if let Err(remove_error) = std::fs::remove_file(&parquet_path) {
                warn!(
                    "Failed to remove {} after error: {}",
                    parquet_path.display(),
                    remove_error
                );
            }
            return Err(BdcnError::Io(e.error));
        }

        debug!("Wrote {} rows to {}", rows, parquet_path.display());

        Ok(WrittenDataset {
            parquet_path,
            attributes_path,
            rows,
        })
    }
}
