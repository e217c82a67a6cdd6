//! Command-line interface components.

use crate::config::{BdcnConfig, CompressionAlgorithm};
use crate::constants::DEFAULT_BASE_URL;
use crate::downloader::StationFetcher;
use crate::processor::BatchProcessor;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bdcn")]
#[command(about = "Convert BDCN daily station records to Parquet and download raw station files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert raw station files to Parquet datasets
    Convert {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory with raw station files (overrides the configuration)
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Output root directory (overrides the configuration)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Parquet compression algorithm (snappy, zstd, lz4, none)
        #[arg(long)]
        compression: Option<String>,
    },

    /// Download raw station files by probing station identifiers
    Fetch {
        /// First BDCN state number to probe
        #[arg(long, default_value_t = 1)]
        first_state: u32,

        /// Last BDCN state number to probe (inclusive)
        #[arg(long, default_value_t = 32)]
        last_state: u32,

        /// Root directory for downloaded files
        #[arg(short, long)]
        output: PathBuf,

        /// Endpoint serving station files
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
    },
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

/// Install the tracing subscriber; `RUST_LOG` takes precedence
pub fn init_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bdcn_processor={}", args.get_log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// Resolve the conversion configuration from a file and CLI overrides
pub fn resolve_config(
    config: Option<PathBuf>,
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    compression: Option<String>,
) -> Result<BdcnConfig> {
    let mut resolved = match (config, input_dir.clone(), output_dir.clone()) {
        (Some(path), _, _) => BdcnConfig::from_file(&path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        (None, Some(input), Some(output)) => BdcnConfig::new(input, output),
        (None, _, _) => {
            bail!("Either --config or both --input-dir and --output-dir are required")
        }
    };

    if let Some(input) = input_dir {
        resolved = resolved.with_input_dir(input);
    }
    if let Some(output) = output_dir {
        resolved = resolved.with_output_dir(output);
    }
    if let Some(compression) = compression {
        resolved = resolved.with_compression(compression.parse::<CompressionAlgorithm>()?);
    }

    Ok(resolved)
}

/// Execute the selected command
pub async fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Convert {
            config,
            input_dir,
            output_dir,
            compression,
        } => {
            let config = resolve_config(config, input_dir, output_dir, compression)?;
            let stats = BatchProcessor::new(config)
                .process()
                .await
                .context("Conversion failed")?;

            if stats.files_failed > 0 {
                bail!(
                    "{} of {} files failed to convert",
                    stats.files_failed,
                    stats.files_failed + stats.files_processed
                );
            }
        }
        Command::Fetch {
            first_state,
            last_state,
            output,
            base_url,
        } => {
            if first_state > last_state {
                bail!("--first-state must not exceed --last-state");
            }

            let fetcher = StationFetcher::new(output).with_base_url(base_url);
            let summaries = fetcher
                .fetch_states(first_state..=last_state)
                .await
                .context("Download failed")?;

            println!("\n{}", "Download Summary".bright_green().bold());
            for summary in &summaries {
                println!(
                    "  {} {} saved, {} not found, {} failed",
                    summary.directory.display().to_string().bright_cyan(),
                    summary.saved.len().to_string().bright_white().bold(),
                    summary.not_found,
                    summary.failed.len()
                );
            }
        }
    }

    Ok(())
}
