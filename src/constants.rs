//! Application constants for the BDCN processor
//!
//! This module contains the fixed layout markers of BDCN station files,
//! the header labels consumed by metadata extraction, the descriptive
//! attributes attached to converted datasets and the defaults used by
//! the station downloader.

// =============================================================================
// File Layout
// =============================================================================

/// Line separating the header block from the daily record table
pub const SEPARATOR: &str = "---------- ------ ------ ------ ------";

/// Sentinel token marking a missing measurement
pub const MISSING_TOKEN: &str = "Nulo";

/// Number of whitespace-separated fields in a data row
pub const DATA_ROW_FIELDS: usize = 5;

/// Hour of day assigned to daily records (end of the 24h measurement window)
pub const MEASUREMENT_HOUR: u32 = 8;

/// Hour of day assigned to the header issue date
pub const ISSUE_HOUR: u32 = 0;

/// Latest year accepted in a record or issue date
pub const MAX_RECORD_YEAR: i32 = 9999;

/// Default extension of raw station files
pub const INPUT_EXTENSION: &str = "txt";

// =============================================================================
// Header Labels
// =============================================================================

/// Header labels as they appear in BDCN files (accents included)
pub mod header_keys {
    pub const STATION: &str = "ESTACIÓN";
    pub const NAME: &str = "NOMBRE";
    pub const STATE: &str = "ESTADO";
    pub const MUNICIPALITY: &str = "MUNICIPIO";
    pub const STATUS: &str = "SITUACIÓN";
    pub const ORGANIZATION: &str = "ORGANISMO";
    pub const WMO_ID: &str = "CVE-OMM";
    pub const LATITUDE: &str = "LATITUD";
    pub const LONGITUDE: &str = "LONGITUD";
    pub const ELEVATION: &str = "ALTITUD";
    pub const ISSUED: &str = "EMISIÓN";

    /// Status value of a station still in operation
    pub const STATUS_OPERATING: &str = "OPERANDO";
}

// =============================================================================
// Dataset Attributes
// =============================================================================

/// Width of zero-padded station identifiers
pub const STATION_ID_WIDTH: usize = 5;

pub const TEMPORAL_RANGE_EMPTY: &str = "Empty dataset";

pub const TEMPORAL_RESOLUTION: &str =
    "Daily (08:00 of the past day - 08:00 of the current day; local time)";

pub const DATASET_FORMAT: &str = "Apache Parquet";

pub const DATASET_VERSION: &str = "1.0.0";

/// Default attribution appended to the conversion comment
pub const DEFAULT_ATTRIBUTION: &str = "bdcn_processor";

/// Timestamp rendering used in derived metadata strings
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

// =============================================================================
// Output Naming
// =============================================================================

/// Prefix of converted dataset file stems
pub const OUTPUT_PREFIX: &str = "bdc_100_";

pub const PARQUET_EXTENSION: &str = "parquet";

/// Suffix of the JSON file carrying dataset attributes
pub const ATTRIBUTES_SUFFIX: &str = "attrs.json";

// =============================================================================
// Station Downloader
// =============================================================================

/// Public endpoint serving raw daily station files
pub const DEFAULT_BASE_URL: &str = "https://smn.cna.gob.mx/tools/RESOURCES/Diarios";

/// Highest sequence number probed within a state
pub const MAX_STATION_SEQUENCE: u32 = 998;

/// ISO 3166-2 subdivision codes indexed by BDCN state number (alphabetical)
pub const STATE_ISO_CODES: [&str; 32] = [
    "agu", "bcn", "bcs", "cam", "coa", "col", "chp", "chh", "cmx", "dur", "gua", "gro", "hid",
    "jal", "mex", "mic", "mor", "nay", "nle", "oax", "pue", "que", "roo", "slp", "sin", "son",
    "tab", "tam", "tla", "ver", "yuc", "zac",
];
