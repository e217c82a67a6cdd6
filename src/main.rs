use bdcn_processor::cli::{self, Args};
use clap::Parser;
use std::process;

fn main() {
    let args = Args::parse();
    cli::init_logging(&args);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = cli::run(args) => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nReceived CTRL+C, stopping...");
                Err(anyhow::anyhow!("Processing interrupted by user"))
            }
        }
    });

    // Let in-flight blocking writes finish and clean up their staging files
    drop(runtime);

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}
