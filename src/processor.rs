//! Batch conversion of BDCN station files.
//!
//! Discovers raw station files below the configured input directory and
//! converts them one at a time, writing each dataset under a directory
//! named after the input file's parent. A failing file is logged and
//! counted; the remaining files are still processed.

use crate::clock::{Clock, SystemClock};
use crate::config::BdcnConfig;
use crate::converter::BdcnConverter;
use crate::error::{BdcnError, Result};
use crate::models::ProcessingStats;
use crate::writer::{DatasetWriter, WrittenDataset, output_stem};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::{fs, task};
use tracing::{debug, error, info, warn};

/// Sorted list of station files below `input_dir` with the given extension
pub fn discover_inputs(input_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(BdcnError::InputNotFound {
            path: input_dir.to_path_buf(),
        });
    }

    // Escape the directory so brackets and wildcards in its name match literally
    let pattern = Path::new(&glob::Pattern::escape(&input_dir.to_string_lossy()))
        .join("**")
        .join(format!("*.{}", extension.trim_start_matches('.')));
    let pattern = pattern.to_string_lossy();
    debug!("Searching for station files with pattern: {}", pattern);

    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| BdcnError::configuration(format!("invalid input pattern: {}", e)))?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                None
            }
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Output directory for an input file: `<output_root>/<parent dir name>`
pub fn output_dir_for(input: &Path, output_root: &Path) -> PathBuf {
    match input.parent().and_then(|p| p.file_name()) {
        Some(parent) => output_root.join(parent),
        None => output_root.to_path_buf(),
    }
}

/// Main processor for BDCN batch conversion
pub struct BatchProcessor<C: Clock = SystemClock> {
    config: BdcnConfig,
    converter: BdcnConverter<C>,
    writer: DatasetWriter,
    show_progress: bool,
}

impl BatchProcessor<SystemClock> {
    /// Create a processor that stamps datasets with the system clock
    pub fn new(config: BdcnConfig) -> Self {
        let converter = BdcnConverter::new().with_attribution(config.attribution.clone());
        Self::with_converter(config, converter)
    }
}

impl<C: Clock> BatchProcessor<C> {
    pub fn with_converter(config: BdcnConfig, converter: BdcnConverter<C>) -> Self {
        let writer = DatasetWriter::new(config.compression);
        Self {
            config,
            converter,
            writer,
            show_progress: true,
        }
    }

    /// Disable the terminal progress bar and summary
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Convert every discovered station file
    pub async fn process(&self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        self.config.validate()?;

        let inputs = discover_inputs(&self.config.input_dir, &self.config.extension)?;
        info!(
            "Found {} station files in {}",
            inputs.len(),
            self.config.input_dir.display()
        );

        let mut stats = ProcessingStats {
            output_path: self.config.output_dir.clone(),
            ..Default::default()
        };

        let pb = if self.show_progress {
            println!(
                "{} {} station files",
                "Converting".bright_green().bold(),
                inputs.len().to_string().bright_white().bold()
            );
            let pb = ProgressBar::new(inputs.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        for input in &inputs {
            pb.set_message(input.file_name().unwrap_or_default().to_string_lossy().to_string());

            match self.process_file(input).await {
                Ok((written, skipped)) => {
                    stats.files_processed += 1;
                    stats.total_rows += written.rows;
                    stats.rows_skipped += skipped;
                }
                Err(e) => {
                    error!("Failed to convert {}: {}", input.display(), source_chain(&e));
                    stats.files_failed += 1;
                    stats.failures.push((input.clone(), source_chain(&e)));
                }
            }

            pb.inc(1);
        }

        pb.finish_and_clear();
        stats.processing_time_ms = start_time.elapsed().as_millis();

        if self.show_progress {
            print_summary(&stats);
        }

        Ok(stats)
    }

    /// Convert and write a single station file
    pub async fn process_file(&self, input: &Path) -> Result<(WrittenDataset, usize)> {
        let bytes = fs::read(input)
            .await
            .map_err(|e| BdcnError::from(e).in_file(input))?;

        let dataset = self
            .converter
            .convert_bytes(&bytes)
            .map_err(|e| e.in_file(input))?;

        if dataset.skipped_rows > 0 {
            warn!(
                "{}: skipped {} malformed rows",
                input.display(),
                dataset.skipped_rows
            );
        }

        let output_dir = output_dir_for(input, &self.config.output_dir);
        fs::create_dir_all(&output_dir).await?;

        let stem = output_stem(input);
        let writer = self.writer.clone();
        let skipped = dataset.skipped_rows;
        let written = task::spawn_blocking(move || writer.write(&dataset, &output_dir, &stem))
            .await??;

        debug!(
            "Converted {} -> {}",
            input.display(),
            written.parquet_path.display()
        );

        Ok((written, skipped))
    }
}

/// Render an error with its sources, outermost first
fn source_chain(error: &BdcnError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn print_summary(stats: &ProcessingStats) {
    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time_ms.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Files processed:".bright_cyan(),
        stats.files_processed.to_string().bright_white()
    );
    if stats.files_failed > 0 {
        println!(
            "  {} {}",
            "Files failed:".bright_red(),
            stats.files_failed.to_string().bright_red().bold()
        );
        for (path, reason) in &stats.failures {
            println!("    {} {}", path.display().to_string().bright_black(), reason);
        }
    }
    if stats.rows_skipped > 0 {
        println!(
            "  {} {}",
            "Rows skipped:".bright_yellow(),
            stats.rows_skipped.to_string().bright_yellow()
        );
    }
    println!(
        "  {} {}",
        "Total rows:".bright_cyan(),
        stats.total_rows.to_string().bright_white().bold()
    );
    println!(
        "  {} {}",
        "Output:".bright_cyan(),
        stats.output_path.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_output_dir_for() {
        assert_eq!(
            output_dir_for(Path::new("/raw/09_cmx/09048.txt"), Path::new("/out")),
            PathBuf::from("/out/09_cmx")
        );
        assert_eq!(
            output_dir_for(Path::new("09048.txt"), Path::new("/out")),
            PathBuf::from("/out")
        );
    }

    #[test]
    fn test_discover_inputs_sorted_and_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("19_nle")).unwrap();
        fs::create_dir_all(root.join("09_cmx")).unwrap();
        fs::write(root.join("19_nle").join("19001.txt"), "x").unwrap();
        fs::write(root.join("09_cmx").join("09048.txt"), "x").unwrap();
        fs::write(root.join("09_cmx").join("09001.txt"), "x").unwrap();
        fs::write(root.join("09_cmx").join("notes.md"), "x").unwrap();

        let files = discover_inputs(root, "txt").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["09001.txt", "09048.txt", "19001.txt"]);
        assert_eq!(discover_inputs(root, ".txt").unwrap().len(), 3);
    }

    #[test]
    fn test_discover_inputs_with_glob_characters_in_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("raw[2018]*?");
        fs::create_dir_all(root.join("09_cmx")).unwrap();
        fs::write(root.join("09_cmx").join("09048.txt"), "x").unwrap();

        let files = discover_inputs(&root, "txt").unwrap();
        assert_eq!(files, vec![root.join("09_cmx").join("09048.txt")]);
    }

    #[test]
    fn test_discover_inputs_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            discover_inputs(&temp_dir.path().join("missing"), "txt"),
            Err(BdcnError::InputNotFound { .. })
        ));
    }

    #[test]
    fn test_source_chain() {
        let error = BdcnError::missing_field("NOMBRE").in_file("/raw/09048.txt");
        assert_eq!(
            source_chain(&error),
            "Conversion failed for file: /raw/09048.txt: Missing header field: NOMBRE"
        );
    }
}
