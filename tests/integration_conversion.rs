//! Integration tests for batch conversion of BDCN station files
//!
//! Builds a small input tree of Latin-1 encoded station files, runs the
//! batch processor over it and reads the written Parquet and attribute
//! files back.

use bdcn_processor::clock::FixedClock;
use bdcn_processor::models::DatasetAttributes;
use bdcn_processor::{BatchProcessor, BdcnConfig, BdcnConverter, Variable};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn at_eight(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

/// Station file text with the standard BDCN header layout
fn station_text(station: &str, status: &str, rows: &[&str]) -> String {
    let station_line = format!("ESTACIÓN     : {}", station);
    let status_line = format!("SITUACIÓN    : {}", status);
    let mut lines = vec![
        "COMISIÓN NACIONAL DEL AGUA",
        "SERVICIO METEOROLÓGICO NACIONAL",
        station_line.as_str(),
        "NOMBRE       : TACUBAYA (CENTRAL)",
        "ESTADO       : CIUDAD DE MÉXICO",
        "MUNICIPIO    : MIGUEL HIDALGO",
        status_line.as_str(),
        "ORGANISMO    : CONAGUA-SMN",
        "CVE-OMM      : 76680",
        "LATITUD      : 19.403°",
        "LONGITUD     : -99.196°",
        "ALTITUD      : 2,280 msnm",
        "EMISIÓN      : 09/08/2018",
        "",
        "                   PRECIP  EVAP   TMAX   TMIN",
        "FECHA              (MM)   (MM)   (°C)   (°C)",
        "---------- ------ ------ ------ ------",
    ];
    lines.extend_from_slice(rows);
    lines.push("-------------------------------------");
    lines.join("\r\n")
}

fn write_latin1(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let bytes: Vec<u8> = text.chars().map(|c| c as u8).collect();
    fs::write(path, bytes).unwrap();
}

fn fixed_processor(input: &Path, output: &Path) -> BatchProcessor<FixedClock> {
    let config = BdcnConfig::new(input, output);
    let converter = BdcnConverter::new().with_clock(FixedClock(at_eight(2024, 1, 1)));
    BatchProcessor::with_converter(config, converter).quiet()
}

fn read_parquet(path: &Path) -> DataFrame {
    ParquetReader::new(File::open(path).unwrap()).finish().unwrap()
}

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("raw");
    let output = temp_dir.path().join("parquet");
    fs::create_dir_all(&input).unwrap();
    fs::create_dir_all(&output).unwrap();
    (temp_dir, input, output)
}

#[tokio::test]
async fn test_batch_conversion_end_to_end() {
    let (_temp_dir, input, output) = setup();

    write_latin1(
        &input.join("09_cmx").join("09048.txt"),
        &station_text(
            "9048",
            "OPERANDO",
            &[
                "01/01/2020   1.5   4.0  25.0  10.0",
                "03/01/2020  Nulo   4.2  26.0  11.0",
                "01/01/2020  99.0  99.0  99.0  99.0",
                "01/02/2020 Nulo 5.2 30.1 Nulo",
            ],
        ),
    );
    write_latin1(
        &input.join("19_nle").join("19001.txt"),
        &station_text("19001", "SUSPENDIDA", &[]),
    );

    let stats = fixed_processor(&input, &output).process().await.unwrap();

    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.files_failed, 0);
    // 2020-01-01 .. 2020-02-01 inclusive
    assert_eq!(stats.total_rows, 32);

    let parquet = output.join("09_cmx").join("bdc_100_09048.parquet");
    let attributes = output.join("09_cmx").join("bdc_100_09048.attrs.json");
    assert!(parquet.exists());
    assert!(attributes.exists());

    let df = read_parquet(&parquet);
    assert_eq!(df.height(), 32);

    let prec = df.column("prec").unwrap().as_materialized_series().f32().unwrap();
    let evap = df.column("evap").unwrap().as_materialized_series().f32().unwrap();
    let tmax = df.column("tmax").unwrap().as_materialized_series().f32().unwrap();
    let tmin = df.column("tmin").unwrap().as_materialized_series().f32().unwrap();

    // First occurrence of the repeated day wins
    assert_eq!(prec.get(0), Some(1.5));
    // Gap day is entirely missing
    assert_eq!(prec.get(1), None);
    assert_eq!(evap.get(1), None);
    assert_eq!(tmax.get(1), None);
    assert_eq!(tmin.get(1), None);
    // Last row is 2020-02-01
    assert_eq!(prec.get(31), None);
    assert_eq!(evap.get(31), Some(5.2f32));
    assert_eq!(tmax.get(31), Some(30.1f32));
    assert_eq!(tmin.get(31), None);

    let attrs: DatasetAttributes =
        serde_json::from_reader(File::open(&attributes).unwrap()).unwrap();
    assert_eq!(attrs.global.station_id, "09048");
    assert_eq!(attrs.global.operability.as_str(), "Working");
    assert_eq!(
        attrs.global.temporal_range,
        "2020-01-01T08:00 -> 2020-02-01T08:00"
    );
    assert_eq!(attrs.variables.len(), 4);

    let empty = output.join("19_nle").join("bdc_100_19001.parquet");
    assert_eq!(read_parquet(&empty).height(), 0);
    let empty_attrs: DatasetAttributes = serde_json::from_reader(
        File::open(output.join("19_nle").join("bdc_100_19001.attrs.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(empty_attrs.global.temporal_range, "Empty dataset");
    assert_eq!(empty_attrs.global.operability.as_str(), "Not working");
}

#[tokio::test]
async fn test_failing_file_does_not_stop_batch() {
    let (_temp_dir, input, output) = setup();

    write_latin1(
        &input.join("09_cmx").join("09001.txt"),
        "COMISIÓN NACIONAL DEL AGUA\r\nno separator here\r\n",
    );
    write_latin1(
        &input.join("09_cmx").join("09002.txt"),
        &station_text("9002", "OPERANDO", &["12:00:00 0.0 0.0 0.0 0.0"]),
    );
    write_latin1(
        &input.join("09_cmx").join("09048.txt"),
        &station_text("9048", "OPERANDO", &["01/01/2020 0.0 1.0 20.0 5.0"]),
    );

    let stats = fixed_processor(&input, &output).process().await.unwrap();

    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.files_failed, 2);
    assert_eq!(stats.failures.len(), 2);
    assert!(stats.failures[0].0.ends_with("09001.txt"));
    assert!(stats.failures[0].1.contains("Separator line not found"));
    assert!(stats.failures[1].1.contains("Invalid date '12:00:00'"));

    // Nothing is written for failed files
    assert!(!output.join("09_cmx").join("bdc_100_09001.parquet").exists());
    assert!(!output.join("09_cmx").join("bdc_100_09002.parquet").exists());
    assert!(output.join("09_cmx").join("bdc_100_09048.parquet").exists());
}

#[tokio::test]
async fn test_malformed_rows_are_counted() {
    let (_temp_dir, input, output) = setup();

    write_latin1(
        &input.join("09_cmx").join("09048.txt"),
        &station_text(
            "9048",
            "OPERANDO",
            &[
                "01/01/2020 0.0 1.0 20.0 5.0",
                "02/01/2020 0.0 1.0",
                "03/01/2020 0.0 1.0 20.0 5.0",
            ],
        ),
    );

    let stats = fixed_processor(&input, &output).process().await.unwrap();

    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.rows_skipped, 1);
    assert_eq!(stats.total_rows, 3);
}

#[tokio::test]
async fn test_missing_input_dir_is_an_error() {
    let (temp_dir, _input, output) = setup();
    let result = fixed_processor(&temp_dir.path().join("missing"), &output)
        .process()
        .await;
    assert!(result.is_err());
}

#[test]
fn test_conversion_idempotent_except_comment() {
    let text = station_text(
        "9048",
        "OPERANDO",
        &["01/01/2020 1.0 2.0 3.0 4.0", "04/01/2020 5.0 Nulo 7.0 8.0"],
    );

    let first = BdcnConverter::new().convert_str(&text).unwrap();
    let second = BdcnConverter::new().convert_str(&text).unwrap();

    assert_eq!(first.series, second.series);
    let mut first_meta = first.metadata.clone();
    first_meta.comment = second.metadata.comment.clone();
    assert_eq!(first_meta, second.metadata);
}

#[test]
fn test_values_round_trip_as_f32() {
    let text = station_text(
        "9048",
        "OPERANDO",
        &["01/01/2020 0.1 12.345 -3.3 1e2", "02/01/2020 Nulo 0 0.0 -0.5"],
    );

    let dataset = BdcnConverter::new().convert_str(&text).unwrap();
    let series = &dataset.series;

    assert_eq!(
        series.value_at(Variable::Precipitation, at_eight(2020, 1, 1)),
        Some(Some("0.1".parse::<f32>().unwrap()))
    );
    assert_eq!(
        series.value_at(Variable::Evaporation, at_eight(2020, 1, 1)),
        Some(Some(12.345f32))
    );
    assert_eq!(
        series.value_at(Variable::MinTemperature, at_eight(2020, 1, 1)),
        Some(Some(100.0))
    );
    assert_eq!(
        series.value_at(Variable::Precipitation, at_eight(2020, 1, 2)),
        Some(None)
    );
    assert_eq!(
        series.value_at(Variable::Evaporation, at_eight(2020, 1, 2)),
        Some(Some(0.0))
    );
}
