//! Raw station file downloader.
//!
//! The BDCN endpoint has no listing, so station files are found by probing
//! every candidate identifier of a state (`<state:02><sequence:03>`). Each
//! probe yields a [`FetchOutcome`] that separates stations that do not
//! exist from requests that failed, leaving retry decisions to the caller.

use crate::constants::{DEFAULT_BASE_URL, MAX_STATION_SEQUENCE, STATE_ISO_CODES};
use crate::error::{BdcnError, Result};
use reqwest::StatusCode;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// ISO 3166-2 code of a BDCN state number (1-based)
pub fn state_iso(state: u32) -> Option<&'static str> {
    let index = usize::try_from(state).ok()?.checked_sub(1)?;
    STATE_ISO_CODES.get(index).copied()
}

/// Candidate station identifiers of a state, in probing order
pub fn station_ids(state: u32, max_sequence: u32) -> impl Iterator<Item = String> {
    (1..=max_sequence).map(move |sequence| format!("{:02}{:03}", state, sequence))
}

/// URL of a station file; the endpoint names files without leading zeros
pub fn build_url(base_url: &str, station_id: &str) -> String {
    let name = station_id
        .parse::<u32>()
        .map(|number| number.to_string())
        .unwrap_or_else(|_| station_id.to_string());
    format!("{}/{}.txt", base_url.trim_end_matches('/'), name)
}

/// Result of probing one station
#[derive(Debug)]
pub enum FetchOutcome {
    /// File downloaded to the given path
    Saved(PathBuf),
    /// The endpoint has no file for this station
    NotFound,
    /// Transport error or unexpected status
    Failed(BdcnError),
}

/// Outcome counts for one state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub state: u32,
    pub directory: PathBuf,
    pub saved: Vec<String>,
    pub not_found: usize,
    pub failed: Vec<String>,
}

/// Downloads raw station files into per-state directories
#[derive(Debug, Clone)]
pub struct StationFetcher {
    client: reqwest::Client,
    base_url: String,
    output_root: PathBuf,
    max_sequence: u32,
}

impl StationFetcher {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            output_root: output_root.into(),
            max_sequence: MAX_STATION_SEQUENCE,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Limit how many sequence numbers are probed per state
    pub fn with_max_sequence(mut self, max_sequence: u32) -> Self {
        self.max_sequence = max_sequence;
        self
    }

    /// Directory holding the files of a state: `<root>/<state:02>_<iso>`
    pub fn state_dir(&self, state: u32) -> Result<PathBuf> {
        let iso = state_iso(state).ok_or(BdcnError::UnknownState { state })?;
        Ok(self.output_root.join(format!("{:02}_{}", state, iso)))
    }

    /// Probe one station and store its file in `directory`
    pub async fn fetch_station(&self, station_id: &str, directory: &Path) -> FetchOutcome {
        let url = build_url(&self.base_url, station_id);
        debug!("Trying to retrieve station {}", station_id);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(source) => return FetchOutcome::Failed(BdcnError::Http { url, source }),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return FetchOutcome::NotFound;
        }

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(source) => return FetchOutcome::Failed(BdcnError::Http { url, source }),
        };

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(source) => return FetchOutcome::Failed(BdcnError::Http { url, source }),
        };

        let path = directory.join(format!("{}.txt", station_id));
        match write_file(&path, &body).await {
            Ok(()) => FetchOutcome::Saved(path),
            Err(e) => FetchOutcome::Failed(e),
        }
    }

    /// Probe every candidate station of a state
    pub async fn fetch_state(&self, state: u32) -> Result<FetchSummary> {
        let directory = self.state_dir(state)?;
        fs::create_dir_all(&directory).await?;

        let mut summary = FetchSummary {
            state,
            directory: directory.clone(),
            ..Default::default()
        };

        for station_id in station_ids(state, self.max_sequence) {
            match self.fetch_station(&station_id, &directory).await {
                FetchOutcome::Saved(path) => {
                    debug!("Saved {}", path.display());
                    summary.saved.push(station_id);
                }
                FetchOutcome::NotFound => summary.not_found += 1,
                FetchOutcome::Failed(e) => {
                    warn!("Station {}: {}", station_id, e);
                    summary.failed.push(station_id);
                }
            }
        }

        info!(
            "State {:02}: {} saved, {} not found, {} failed",
            state,
            summary.saved.len(),
            summary.not_found,
            summary.failed.len()
        );

        Ok(summary)
    }

    /// Probe every state in `states`, one after another
    pub async fn fetch_states(&self, states: RangeInclusive<u32>) -> Result<Vec<FetchSummary>> {
        let mut summaries = Vec::new();
        for state in states {
            summaries.push(self.fetch_state(state).await?);
        }
        Ok(summaries)
    }
}

/// Write through a temporary name so interrupted downloads leave no file
async fn write_file(path: &Path, body: &[u8]) -> Result<()> {
    let partial = path.with_extension("txt.part");
    fs::write(&partial, body).await?;
    fs::rename(&partial, path).await?;
    Ok(())
}
