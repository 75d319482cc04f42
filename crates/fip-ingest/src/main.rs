//! FIP Ingest - food-inspection ETL tool

use anyhow::Result;
use clap::Parser;
use fip_common::logging::{init_logging, LogConfig, LogLevel};
use fip_ingest::{config::IngestConfig, pipeline::Pipeline, staging};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fip-ingest")]
#[command(author, version, about = "Food-inspection data ingestion tool")]
struct Cli {
    /// Pipeline stage to run
    #[command(subcommand)]
    stage: Stage,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Stage {
    /// Run the full pipeline: fetch, transform, and load
    Run,

    /// Fetch all pages and write the raw staging file
    Fetch,

    /// Clean a previously fetched raw staging file
    Transform,

    /// Load a previously cleaned dataset into the database
    Load,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("fip-ingest".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    let config = IngestConfig::load()?;
    let pipeline = Pipeline::new(config.clone());

    match cli.stage {
        Stage::Run => {
            info!("running full pipeline");
            let summary = pipeline.run().await?;
            info!(
                pages = summary.pages_fetched,
                fetched = summary.records_fetched,
                truncated = summary.fetch_truncated,
                cleaned = summary.clean.output_rows,
                facilities = summary.facilities,
                inspections = summary.inspections,
                "done"
            );
        },
        Stage::Fetch => {
            info!("fetching raw data");
            let stage = pipeline.fetch().await?;
            info!(pages = stage.pages, records = stage.records.len(), "done");
        },
        Stage::Transform => {
            info!(path = %config.raw_path, "transforming staged raw data");
            let raw = staging::read_raw(&config.raw_path)?;
            let stage = pipeline.transform(&raw)?;
            info!(rows = stage.records.len(), "done");
        },
        Stage::Load => {
            info!(path = %config.cleaned_path, "loading staged cleaned data");
            let cleaned = staging::read_cleaned(&config.cleaned_path)?;
            let stage = pipeline.load(&cleaned).await?;
            info!(
                facilities = stage.facilities,
                inspections = stage.inspections,
                "done"
            );
        },
    }

    info!("ingestion complete");
    Ok(())
}
