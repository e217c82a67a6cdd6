//! BDCN header parsing and metadata extraction.
//!
//! Parses the `key : value` lines of a station file header into a lookup
//! table and derives the normalized station metadata (identity, location,
//! status, provenance and temporal coverage) attached to converted
//! datasets.

use crate::clock::Clock;
use crate::constants::{
    DATASET_FORMAT, DATASET_VERSION, ISSUE_HOUR, STATION_ID_WIDTH, TEMPORAL_RANGE_EMPTY,
    TEMPORAL_RESOLUTION, TIMESTAMP_FORMAT, header_keys,
};
use crate::error::{BdcnError, Result};
use crate::models::{DailySeries, Operability, StationMetadata};
use crate::parser::parse_date;
use chrono::{NaiveDateTime, Timelike};
use std::collections::HashMap;
use tracing::debug;

/// Key/value lookup built from header lines
#[derive(Debug, Clone, Default)]
pub struct HeaderFields {
    fields: HashMap<String, String>,
}

impl HeaderFields {
    /// Collect every line that splits on ':' into exactly two parts
    ///
    /// Lines with no colon or with several colons are ignored. A repeated
    /// key takes the value of its last occurrence.
    pub fn parse(lines: &[&str]) -> Self {
        let mut fields = HashMap::new();

        for line in lines {
            let parts: Vec<&str> = line.split(':').collect();
            if parts.len() != 2 {
                continue;
            }
            fields.insert(parts[0].trim().to_string(), parts[1].trim().to_string());
        }

        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Value of a field the conversion cannot do without
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| BdcnError::missing_field(key))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builds station metadata from a header block
pub struct MetadataExtractor<'a, C: Clock> {
    clock: &'a C,
    attribution: &'a str,
}

impl<'a, C: Clock> MetadataExtractor<'a, C> {
    pub fn new(clock: &'a C, attribution: &'a str) -> Self {
        Self { clock, attribution }
    }

    /// Derive the full metadata record for a normalized series
    pub fn extract(&self, header: &[&str], series: &DailySeries) -> Result<StationMetadata> {
        let fields = HeaderFields::parse(header);
        debug!("Header carries {} key/value fields", fields.len());

        let author = header
            .first()
            .map(|line| line.trim().to_string())
            .ok_or_else(|| BdcnError::missing_field("Author"))?;
        let title = header
            .get(1)
            .map(|line| title_case(line.trim()))
            .ok_or_else(|| BdcnError::missing_field("Title"))?;

        let issued = parse_date(fields.require(header_keys::ISSUED)?, ISSUE_HOUR)?;

        let metadata = StationMetadata {
            title,
            author,
            station_id: zero_pad(fields.require(header_keys::STATION)?, STATION_ID_WIDTH),
            station_name: title_case(fields.require(header_keys::NAME)?),
            state: title_case(fields.require(header_keys::STATE)?),
            municipality: title_case(fields.require(header_keys::MUNICIPALITY)?),
            operability: operability(fields.require(header_keys::STATUS)?),
            owner: fields.require(header_keys::ORGANIZATION)?.to_string(),
            wmo_id: wmo_id(fields.require(header_keys::WMO_ID)?),
            latitude: parse_coordinate(
                header_keys::LATITUDE,
                fields.require(header_keys::LATITUDE)?,
            )?,
            longitude: parse_coordinate(
                header_keys::LONGITUDE,
                fields.require(header_keys::LONGITUDE)?,
            )?,
            elevation: parse_elevation(fields.require(header_keys::ELEVATION)?)?,
            temporal_range: temporal_range(series),
            temporal_resolution: TEMPORAL_RESOLUTION.to_string(),
            production_date_time: format!(
                "Original file generated on {}",
                issued.format(TIMESTAMP_FORMAT)
            ),
            comment: format!(
                "Converted to Parquet format on {} by {}",
                iso_timestamp(self.clock.now()),
                self.attribution
            ),
            format: DATASET_FORMAT.to_string(),
            version: DATASET_VERSION.to_string(),
        };

        debug!(
            "Extracted metadata for station {} ({})",
            metadata.station_id, metadata.station_name
        );

        Ok(metadata)
    }
}

/// ISO 8601 timestamp with microseconds only when they are non-zero
pub fn iso_timestamp(time: NaiveDateTime) -> String {
    if time.nanosecond() / 1_000 == 0 {
        time.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Capitalize the first letter of every word and lowercase the rest
///
/// A word is any run of alphabetic characters, so "(CENTRAL)" becomes
/// "(Central)".
pub fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut in_word = false;

    for c in value.chars() {
        if c.is_alphabetic() {
            if in_word {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            result.push(c);
            in_word = false;
        }
    }

    result
}

/// Left-pad with zeros to the given width
pub fn zero_pad(value: &str, width: usize) -> String {
    format!("{:0>width$}", value, width = width)
}

fn operability(status: &str) -> Operability {
    if status == header_keys::STATUS_OPERATING {
        Operability::Working
    } else {
        Operability::NotWorking
    }
}

fn wmo_id(value: &str) -> String {
    if value == crate::constants::MISSING_TOKEN {
        String::new()
    } else {
        value.to_string()
    }
}

/// Parse "19.403°" style coordinates by dropping the trailing unit character
fn parse_coordinate(key: &'static str, value: &str) -> Result<f64> {
    let mut number = value.to_string();
    number.pop();

    number
        .trim()
        .parse::<f64>()
        .map_err(|e| BdcnError::InvalidField {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Parse "2,280 msnm" style elevations
fn parse_elevation(value: &str) -> Result<f64> {
    let number = value.split(' ').next().unwrap_or_default().replace(',', "");

    number.parse::<f64>().map_err(|e| BdcnError::InvalidField {
        key: header_keys::ELEVATION,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn temporal_range(series: &DailySeries) -> String {
    match series.bounds() {
        Some((first, last)) => format!(
            "{} -> {}",
            first.format(TIMESTAMP_FORMAT),
            last.format(TIMESTAMP_FORMAT)
        ),
        None => TEMPORAL_RANGE_EMPTY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::DailyRecord;
    use chrono::NaiveDate;

    const HEADER: &[&str] = &[
        "COMISIÓN NACIONAL DEL AGUA",
        "SERVICIO METEOROLÓGICO NACIONAL",
        "ESTACIÓN     : 9048",
        "NOMBRE       : TACUBAYA (CENTRAL)",
        "ESTADO       : CIUDAD DE MÉXICO",
        "MUNICIPIO    : MIGUEL HIDALGO",
        "SITUACIÓN    : OPERANDO",
        "ORGANISMO    : CONAGUA-SMN",
        "CVE-OMM      : 76680",
        "LATITUD      : 19.403°",
        "LONGITUD     : -99.196°",
        "ALTITUD      : 2,280 msnm",
        "EMISIÓN      : 09/08/2018",
        "",
        "                   PRECIP  EVAP   TMAX   TMIN",
    ];

    fn clock() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_micro_opt(10, 30, 0, 125)
                .unwrap(),
        )
    }

    fn at_eight(year: i32, month: u32, day: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn header_with(key: &str, value: &str) -> Vec<String> {
        HEADER
            .iter()
            .map(|line| {
                if line.starts_with(key) {
                    format!("{} : {}", key, value)
                } else {
                    line.to_string()
                }
            })
            .collect()
    }

    fn extract(header: &[&str], series: &DailySeries) -> Result<StationMetadata> {
        let clock = clock();
        MetadataExtractor::new(&clock, "test suite").extract(header, series)
    }

    #[test]
    fn test_header_fields() {
        let fields = HeaderFields::parse(&[
            "ESTACIÓN : 9048",
            "no colon here",
            "HORA : 12:00:00",
            "  NOMBRE   :   TACUBAYA  ",
        ]);

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("ESTACIÓN"), Some("9048"));
        assert_eq!(fields.get("NOMBRE"), Some("TACUBAYA"));
        assert_eq!(fields.get("HORA"), None);
    }

    #[test]
    fn test_header_fields_last_occurrence_wins() {
        let fields = HeaderFields::parse(&["ESTADO : SONORA", "ESTADO : JALISCO"]);
        assert_eq!(fields.get("ESTADO"), Some("JALISCO"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("TACUBAYA (CENTRAL)"), "Tacubaya (Central)");
        assert_eq!(title_case("CIUDAD DE MÉXICO"), "Ciudad De México");
        assert_eq!(title_case("SAN JOSÉ DEL CABO-2"), "San José Del Cabo-2");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_iso_timestamp() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        assert_eq!(
            iso_timestamp(date.and_hms_opt(10, 30, 0).unwrap()),
            "2024-05-17T10:30:00"
        );
        assert_eq!(
            iso_timestamp(date.and_hms_micro_opt(10, 30, 0, 500_000).unwrap()),
            "2024-05-17T10:30:00.500000"
        );
    }

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad("9048", 5), "09048");
        assert_eq!(zero_pad("19001", 5), "19001");
        assert_eq!(zero_pad("123456", 5), "123456");
    }

    #[test]
    fn test_extract_metadata() {
        let series = DailySeries::from_records(vec![
            DailyRecord::missing(at_eight(1921, 1, 1)),
            DailyRecord::missing(at_eight(1921, 1, 2)),
        ]);

        let metadata = extract(HEADER, &series).unwrap();

        assert_eq!(metadata.author, "COMISIÓN NACIONAL DEL AGUA");
        assert_eq!(metadata.title, "Servicio Meteorológico Nacional");
        assert_eq!(metadata.station_id, "09048");
        assert_eq!(metadata.station_name, "Tacubaya (Central)");
        assert_eq!(metadata.state, "Ciudad De México");
        assert_eq!(metadata.municipality, "Miguel Hidalgo");
        assert_eq!(metadata.operability, Operability::Working);
        assert_eq!(metadata.owner, "CONAGUA-SMN");
        assert_eq!(metadata.wmo_id, "76680");
        assert_eq!(metadata.latitude, 19.403);
        assert_eq!(metadata.longitude, -99.196);
        assert_eq!(metadata.elevation, 2280.0);
        assert_eq!(
            metadata.temporal_range,
            "1921-01-01T08:00 -> 1921-01-02T08:00"
        );
        assert_eq!(metadata.temporal_resolution, TEMPORAL_RESOLUTION);
        assert_eq!(
            metadata.production_date_time,
            "Original file generated on 2018-08-09T00:00"
        );
        assert_eq!(
            metadata.comment,
            "Converted to Parquet format on 2024-05-17T10:30:00.000125 by test suite"
        );
        assert_eq!(metadata.format, "Apache Parquet");
        assert_eq!(metadata.version, "1.0.0");
    }

    #[test]
    fn test_empty_series_temporal_range() {
        let metadata = extract(HEADER, &DailySeries::default()).unwrap();
        assert_eq!(metadata.temporal_range, "Empty dataset");
    }

    #[test]
    fn test_operability_mapping() {
        for (status, expected) in [
            ("OPERANDO", Operability::Working),
            ("SUSPENDIDA", Operability::NotWorking),
            ("operando", Operability::NotWorking),
        ] {
            let header = header_with("SITUACIÓN", status);
            let lines: Vec<&str> = header.iter().map(String::as_str).collect();
            let metadata = extract(&lines, &DailySeries::default()).unwrap();
            assert_eq!(metadata.operability, expected);
        }
        assert_eq!(Operability::NotWorking.to_string(), "Not working");
    }

    #[test]
    fn test_missing_wmo_id() {
        let header = header_with("CVE-OMM", "Nulo");
        let lines: Vec<&str> = header.iter().map(String::as_str).collect();
        let metadata = extract(&lines, &DailySeries::default()).unwrap();
        assert_eq!(metadata.wmo_id, "");
    }

    #[test]
    fn test_missing_required_field() {
        let lines: Vec<&str> = HEADER
            .iter()
            .copied()
            .filter(|line| !line.starts_with("ORGANISMO"))
            .collect();

        match extract(&lines, &DailySeries::default()) {
            Err(BdcnError::MissingField { key }) => assert_eq!(key, "ORGANISMO"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_issue_date_with_time_is_missing() {
        // "12:00:00" style values split into several parts and are not fields
        let header = header_with("EMISIÓN", "12:00:00");
        let lines: Vec<&str> = header.iter().map(String::as_str).collect();
        assert!(matches!(
            extract(&lines, &DailySeries::default()),
            Err(BdcnError::MissingField { .. })
        ));
    }

    #[test]
    fn test_issue_date_not_a_date() {
        let header = header_with("EMISIÓN", "desconocida");
        let lines: Vec<&str> = header.iter().map(String::as_str).collect();
        assert!(matches!(
            extract(&lines, &DailySeries::default()),
            Err(BdcnError::DateFormat { .. })
        ));
    }

    #[test]
    fn test_invalid_coordinate() {
        let header = header_with("LATITUD", "norte°");
        let lines: Vec<&str> = header.iter().map(String::as_str).collect();
        match extract(&lines, &DailySeries::default()) {
            Err(BdcnError::InvalidField { key, .. }) => assert_eq!(key, "LATITUD"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_short_header() {
        let lines = ["ONLY ONE LINE"];
        assert!(matches!(
            extract(&lines, &DailySeries::default()),
            Err(BdcnError::MissingField { .. })
        ));
    }
}
