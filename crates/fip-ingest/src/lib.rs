//! FIP Ingest Library
//!
//! ETL pipeline for public food-inspection records: paginated retrieval from
//! a Socrata-style HTTP endpoint, schema flattening, type coercion and
//! deduplication, entity splitting, and an idempotent load into Postgres.
//!
//! # Pipeline
//!
//! Fetch → Flatten → Clean → Split → Load, strictly sequential; each stage
//! fully materializes its output before the next begins.
//!
//! # Example
//!
//! ```no_run
//! use fip_ingest::{config::IngestConfig, pipeline::Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::load()?;
//!     let summary = Pipeline::new(config).run().await?;
//!     tracing::info!(?summary, "run complete");
//!     Ok(())
//! }
//! ```

pub mod clean;
pub mod config;
pub mod fetch;
pub mod flatten;
pub mod load;
pub mod pipeline;
pub mod record;
pub mod split;
pub mod staging;
