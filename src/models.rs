//! Core data structures and types for BDCN processing.
//!
//! Defines the daily variables carried by station files, the parsed and
//! normalized series, station metadata and processing statistics.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Daily variables recorded by BDCN stations, in file column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    Precipitation,
    Evaporation,
    MaxTemperature,
    MinTemperature,
}

impl Variable {
    pub const ALL: [Variable; 4] = [
        Variable::Precipitation,
        Variable::Evaporation,
        Variable::MaxTemperature,
        Variable::MinTemperature,
    ];

    /// Position of the variable among the value columns
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name in converted datasets
    pub fn column_name(self) -> &'static str {
        match self {
            Variable::Precipitation => "prec",
            Variable::Evaporation => "evap",
            Variable::MaxTemperature => "tmax",
            Variable::MinTemperature => "tmin",
        }
    }

    pub fn long_name(self) -> &'static str {
        match self {
            Variable::Precipitation => "Total_precipitation",
            Variable::Evaporation => "Total_evaporation",
            Variable::MaxTemperature => "Maximum_temperature_in_the_last_24_hours",
            Variable::MinTemperature => "Minimum_temperature_in_the_last_24_hours",
        }
    }

    pub fn units(self) -> &'static str {
        match self {
            Variable::Precipitation | Variable::Evaporation => "mm",
            Variable::MaxTemperature | Variable::MinTemperature => "°C",
        }
    }

    pub fn attributes(self) -> VariableAttributes {
        VariableAttributes {
            name: self.column_name().to_string(),
            long_name: self.long_name().to_string(),
            units: self.units().to_string(),
        }
    }
}

/// One data row as read from a station file
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub time: NaiveDateTime,
    pub values: [Option<f32>; 4],
}

impl DailyRecord {
    /// Record with every variable missing
    pub fn missing(time: NaiveDateTime) -> Self {
        Self {
            time,
            values: [None; 4],
        }
    }

    pub fn value(&self, variable: Variable) -> Option<f32> {
        self.values[variable.index()]
    }
}

/// Data rows in file order, before deduplication
#[derive(Debug, Clone, Default)]
pub struct ParsedRecords {
    pub records: Vec<DailyRecord>,
    /// Non-blank rows dropped for not having the expected field count
    pub skipped_rows: usize,
}

/// Time axis with four aligned value series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    time: Vec<NaiveDateTime>,
    values: [Vec<Option<f32>>; 4],
}

impl DailySeries {
    /// Build a series from records already in the desired axis order
    pub fn from_records(records: impl IntoIterator<Item = DailyRecord>) -> Self {
        let mut series = Self::default();
        for record in records {
            series.time.push(record.time);
            for variable in Variable::ALL {
                series.values[variable.index()].push(record.value(variable));
            }
        }
        series
    }

    pub fn time(&self) -> &[NaiveDateTime] {
        &self.time
    }

    pub fn values(&self, variable: Variable) -> &[Option<f32>] {
        &self.values[variable.index()]
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Earliest and latest timestamps, if any
    pub fn bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.time.iter().min()?;
        let last = self.time.iter().max()?;
        Some((*first, *last))
    }

    /// Value of a variable at a timestamp; `None` when the timestamp is not on the axis
    pub fn value_at(&self, variable: Variable, time: NaiveDateTime) -> Option<Option<f32>> {
        let position = self.time.iter().position(|t| *t == time)?;
        Some(self.values[variable.index()][position])
    }
}

/// Operational status of a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operability {
    #[serde(rename = "Working")]
    Working,
    #[serde(rename = "Not working")]
    NotWorking,
}

impl Operability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operability::Working => "Working",
            Operability::NotWorking => "Not working",
        }
    }
}

impl fmt::Display for Operability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global attributes of a converted station dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StationMetadata {
    pub title: String,
    pub author: String,
    #[serde(rename = "StationID")]
    pub station_id: String,
    pub station_name: String,
    pub state: String,
    pub municipality: String,
    pub operability: Operability,
    pub owner: String,
    #[serde(rename = "WMOID")]
    pub wmo_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub temporal_range: String,
    pub temporal_resolution: String,
    pub production_date_time: String,
    pub comment: String,
    pub format: String,
    pub version: String,
}

/// Descriptive attributes of one variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableAttributes {
    pub name: String,
    pub long_name: String,
    pub units: String,
}

/// Fully assembled conversion result for one station file
#[derive(Debug, Clone, PartialEq)]
pub struct StationDataset {
    pub series: DailySeries,
    pub metadata: StationMetadata,
    pub variables: Vec<VariableAttributes>,
    /// Rows skipped by the parser
    pub skipped_rows: usize,
}

/// Attribute document written next to each Parquet file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetAttributes {
    pub global: StationMetadata,
    pub variables: Vec<VariableAttributes>,
}

impl From<&StationDataset> for DatasetAttributes {
    fn from(dataset: &StationDataset) -> Self {
        Self {
            global: dataset.metadata.clone(),
            variables: dataset.variables.clone(),
        }
    }
}

/// Processing statistics for a batch conversion
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub total_rows: usize,
    pub rows_skipped: usize,
    pub output_path: PathBuf,
    pub processing_time_ms: u128,
    pub failures: Vec<(PathBuf, String)>,
}
