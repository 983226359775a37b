//! pcapreduce CLI entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use pcapreduce::cli::Args;
use pcapreduce::discovery::discover;
use pcapreduce::progress::Progress;
use pcapreduce::store::schema::SCHEMA;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    if args.show_schema {
        println!("{}", SCHEMA.trim());
        return Ok(());
    }

    let config = args
        .to_config()
        .context("Run name required. Use --help for usage.")?;
    let config = Arc::new(config);

    let files = discover(&config.data_dir, &config.run_name)
        .with_context(|| format!("Failed to search data directory: {}", config.data_dir.display()))?;

    println!("Total files: {:3}", files.total());
    if files.is_empty() {
        println!("No files found for parsing");
        return Ok(());
    }

    let progress = Progress::new(files.total(), args.progress);
    match pcapreduce::reduce(Arc::clone(&config), &files, &progress).await {
        Ok(report) => {
            let summary = report.summary;
            eprintln!(
                "Run {}: {} file(s) reduced, {} skipped, {} rows written, {} rows rejected",
                report.run_id, summary.succeeded, summary.failed, summary.rows_written, summary.rows_failed
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "run aborted");
            Err(e).with_context(|| format!("Reduction of run '{}' failed", config.run_name))
        }
    }
}
