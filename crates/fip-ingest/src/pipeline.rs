//! Pipeline orchestration
//!
//! One run owns its dataset end-to-end and moves through the stages
//! strictly in order: FETCH → FLATTEN → CLEAN → SPLIT → LOAD. Every stage
//! fully materializes its output before the next begins, and every stage
//! boundary logs summary counts. A fetch failure is soft (the run continues
//! with partial data); a load failure aborts the run.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clean::{clean, CleanReport};
use crate::config::IngestConfig;
use crate::fetch::PageFetcher;
use crate::flatten::flatten;
use crate::load::{LoadSummary, Loader};
use crate::record::FlatRecord;
use crate::split::split;
use crate::staging;

/// Counts reported at the end of a full pipeline run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub pages_fetched: usize,
    pub records_fetched: usize,
    pub fetch_truncated: bool,
    pub clean: CleanReport,
    pub facilities: usize,
    pub inspections: usize,
    pub load: LoadSummary,
}

/// A single end-to-end pipeline run.
pub struct Pipeline {
    config: IngestConfig,
}

impl Pipeline {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline, staging the raw and cleaned artifacts along
    /// the way so a later invocation can resume at transform or load.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        // FETCH
        let raw = self.fetch().await?;
        summary.pages_fetched = raw.pages;
        summary.records_fetched = raw.records.len();
        summary.fetch_truncated = raw.truncated;
        if raw.records.is_empty() {
            info!("no records fetched, nothing to load");
            return Ok(summary);
        }

        // FLATTEN + CLEAN
        let cleaned = self.transform(&raw.records)?;
        summary.clean = cleaned.report;
        if cleaned.records.is_empty() {
            info!("cleaning produced no records, nothing to load");
            return Ok(summary);
        }

        // SPLIT + LOAD
        let load = self.load(&cleaned.records).await?;
        summary.facilities = load.facilities;
        summary.inspections = load.inspections;
        summary.load = load.summary;

        info!(
            records = summary.records_fetched,
            facilities = summary.facilities,
            inspections = summary.inspections,
            "pipeline run complete"
        );
        Ok(summary)
    }

    /// Fetch all pages and stage the raw accumulation.
    pub async fn fetch(&self) -> Result<RawStage> {
        info!(url = %self.config.api_url, page_size = self.config.page_size, "fetch starting");
        let fetcher = PageFetcher::new(&self.config.api_url, self.config.page_size);
        let outcome = fetcher.fetch_all().await;

        if let Some(ref failure) = outcome.failure {
            warn!(failure = %failure, "fetch truncated, continuing with partial data");
        }
        if outcome.records.is_empty() {
            info!("source returned no data");
        } else {
            staging::write_raw(&outcome.records, &self.config.raw_path)
                .context("failed to stage raw data")?;
        }

        Ok(RawStage {
            pages: outcome.pages,
            truncated: outcome.failure.is_some(),
            records: outcome.records,
        })
    }

    /// Flatten and clean raw records, staging the cleaned dataset.
    pub fn transform(&self, raw: &[serde_json::Value]) -> Result<CleanedStage> {
        info!(records = raw.len(), "transform starting");
        let flat: Vec<FlatRecord> = raw.iter().map(flatten).collect();
        info!(records = flat.len(), "flatten complete");

        let (records, report) = clean(flat);
        if !records.is_empty() {
            staging::write_cleaned(&records, &self.config.cleaned_path)
                .context("failed to stage cleaned data")?;
        }

        Ok(CleanedStage { records, report })
    }

    /// Split cleaned records and load both entity streams.
    pub async fn load(&self, cleaned: &[FlatRecord]) -> Result<LoadStage> {
        let outcome = split(cleaned);
        if outcome.facilities.is_empty() && outcome.inspections.is_empty() {
            info!("split produced no entities, skipping load");
            return Ok(LoadStage::default());
        }

        let loader = Loader::connect(&self.config.database)
            .await
            .context("failed to connect to database")?;
        loader.migrate().await.context("migration failed")?;

        let result = loader.load(&outcome.facilities, &outcome.inspections).await;
        // Release the pool on the abort path as well.
        loader.close().await;
        let summary = result.context("load failed, aborting run")?;

        Ok(LoadStage {
            facilities: outcome.facilities.len(),
            inspections: outcome.inspections.len(),
            summary,
        })
    }
}

/// Output of the fetch stage.
pub struct RawStage {
    pub records: Vec<serde_json::Value>,
    pub pages: usize,
    pub truncated: bool,
}

/// Output of the transform stage.
pub struct CleanedStage {
    pub records: Vec<FlatRecord>,
    pub report: CleanReport,
}

/// Output of the load stage.
#[derive(Debug, Default)]
pub struct LoadStage {
    pub facilities: usize,
    pub inspections: usize,
    pub summary: LoadSummary,
}
