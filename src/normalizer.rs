//! Daily series normalization.
//!
//! Removes repeated timestamps and aligns the remaining records onto a
//! contiguous daily calendar spanning the observed period.

use crate::models::{DailyRecord, DailySeries};
use chrono::{Duration, NaiveDateTime};
use std::collections::BTreeMap;
use tracing::debug;

/// Counts of adjustments made while normalizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub duplicates_dropped: usize,
    pub gaps_filled: usize,
}

/// Keep the first record seen for each timestamp, ordered by time
pub fn deduplicate(records: Vec<DailyRecord>) -> (BTreeMap<NaiveDateTime, DailyRecord>, usize) {
    let mut unique = BTreeMap::new();
    let mut dropped = 0;

    for record in records {
        if unique.contains_key(&record.time) {
            dropped += 1;
            continue;
        }
        unique.insert(record.time, record);
    }

    (unique, dropped)
}

/// Deduplicate and reindex records onto a gap-free daily axis
pub fn normalize(records: Vec<DailyRecord>) -> (DailySeries, NormalizeReport) {
    let (unique, duplicates_dropped) = deduplicate(records);

    let (first, last) = match (unique.keys().next(), unique.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return (
                DailySeries::default(),
                NormalizeReport {
                    duplicates_dropped,
                    gaps_filled: 0,
                },
            );
        }
    };

    let mut aligned = Vec::with_capacity(unique.len());
    let mut gaps_filled = 0;
    let mut time = first;

    while time <= last {
        match unique.get(&time) {
            Some(record) => aligned.push(record.clone()),
            None => {
                aligned.push(DailyRecord::missing(time));
                gaps_filled += 1;
            }
        }
        match time.checked_add_signed(Duration::days(1)) {
            Some(next) => time = next,
            None => break,
        }
    }

    let report = NormalizeReport {
        duplicates_dropped,
        gaps_filled,
    };

    debug!(
        "Normalized {} days ({} duplicates dropped, {} gaps filled)",
        aligned.len(),
        report.duplicates_dropped,
        report.gaps_filled
    );

    (DailySeries::from_records(aligned), report)
}
