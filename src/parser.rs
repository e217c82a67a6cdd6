//! BDCN station file parsing.
//!
//! Splits raw station text into its header block and daily record table
//! and converts each data row into a timestamped record. Rows are kept in
//! file order; deduplication and calendar alignment happen later in the
//! normalizer.

use crate::constants::{
    DATA_ROW_FIELDS, MAX_RECORD_YEAR, MEASUREMENT_HOUR, MISSING_TOKEN, SEPARATOR,
};
use crate::error::{BdcnError, Result};
use crate::models::{DailyRecord, ParsedRecords, Variable};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)/(\d+)/(\d+)$").expect("date pattern is valid"));

/// Split text into lines on `\r\n`, `\n` or a bare `\r`
///
/// A trailing line terminator does not produce an empty final line.
pub fn split_lines(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = content;

    while let Some(end) = rest.find(['\n', '\r']) {
        lines.push(&rest[..end]);
        let terminator = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[end + terminator..];
    }
    if !rest.is_empty() {
        lines.push(rest);
    }

    lines
}

/// Header block and record table of a station file
#[derive(Debug, Clone, Copy)]
pub struct Sections<'a> {
    pub header: &'a [&'a str],
    pub data: &'a [&'a str],
    /// 1-based line number of the first data row
    pub first_data_line: usize,
}

/// Decode ISO-8859-1 bytes, the encoding BDCN files are published in
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

/// Locate the separator line and split the file around it
///
/// The last line of the file is a footer and never part of the data.
pub fn split_sections<'a>(lines: &'a [&'a str]) -> Result<Sections<'a>> {
    let separator = lines
        .iter()
        .position(|line| *line == SEPARATOR)
        .ok_or(BdcnError::MissingSeparator {
            separator: SEPARATOR,
        })?;

    let data_end = lines.len().saturating_sub(1).max(separator + 1);

    Ok(Sections {
        header: &lines[..separator],
        data: &lines[separator + 1..data_end],
        first_data_line: separator + 2,
    })
}

/// Parse a `DD/MM/YYYY` date and place it at the given hour
pub fn parse_date(value: &str, hour: u32) -> Result<NaiveDateTime> {
    let invalid = || BdcnError::DateFormat {
        value: value.to_string(),
    };

    let captures = DATE_PATTERN.captures(value).ok_or_else(invalid)?;
    let day: u32 = captures[1].parse().map_err(|_| invalid())?;
    let month: u32 = captures[2].parse().map_err(|_| invalid())?;
    let year: i32 = captures[3].parse().map_err(|_| invalid())?;
    if !(1..=MAX_RECORD_YEAR).contains(&year) {
        return Err(invalid());
    }

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .ok_or_else(invalid)
}

/// Parse one measurement token; the missing sentinel maps to `None`
pub fn parse_value(token: &str, line: usize, variable: Variable) -> Result<Option<f32>> {
    if token == MISSING_TOKEN {
        return Ok(None);
    }

    token
        .parse::<f32>()
        .map(Some)
        .map_err(|_| BdcnError::ValueConversion {
            line,
            column: variable.column_name(),
            token: token.to_string(),
        })
}

/// Parse the record table into timestamped rows
///
/// Rows without exactly five fields are skipped with a warning. Bad dates
/// and bad values abort the parse.
pub fn parse_records(data: &[&str], first_line: usize) -> Result<ParsedRecords> {
    let mut parsed = ParsedRecords {
        records: Vec::with_capacity(data.len()),
        skipped_rows: 0,
    };

    for (offset, line) in data.iter().enumerate() {
        let line_number = first_line + offset;
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if tokens.is_empty() {
            debug!("Ignoring blank line {}", line_number);
            continue;
        }

        if tokens.len() != DATA_ROW_FIELDS {
            let error = BdcnError::MalformedRow {
                line: line_number,
                expected: DATA_ROW_FIELDS,
                found: tokens.len(),
            };
            warn!("Skipping row: {}", error);
            parsed.skipped_rows += 1;
            continue;
        }

        let time = parse_date(tokens[0], MEASUREMENT_HOUR)
            .inspect_err(|e| warn!("Line {}: {}", line_number, e))?;

        let mut values = [None; 4];
        for variable in Variable::ALL {
            values[variable.index()] =
                parse_value(tokens[variable.index() + 1], line_number, variable)?;
        }

        parsed.records.push(DailyRecord { time, values });
    }

    debug!(
        "Parsed {} records ({} skipped)",
        parsed.records.len(),
        parsed.skipped_rows
    );

    Ok(parsed)
}
