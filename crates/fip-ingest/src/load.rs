//! Relational load
//!
//! Appends the two entity streams into Postgres, facilities first so live
//! queries can resolve the facility→inspection join. Inserts are keyed on
//! the identity columns with `ON CONFLICT DO NOTHING`, so re-running the
//! pipeline against an already-loaded store is a no-op for existing rows and
//! first-occurrence-wins holds across runs. A facility insert failure aborts
//! before inspections are attempted.
//!
//! The pool is scoped to one run: acquired by [`Loader::connect`], released
//! by [`Loader::close`] on both the normal and abort paths.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::split::{Facility, Inspection};

/// Rows per INSERT statement, kept well below the Postgres bind limit
/// (65535 parameters; facilities bind 12 per row).
const INSERT_CHUNK: usize = 1000;

/// Load failures are fatal; the run aborts with no compensation beyond the
/// store's own transaction semantics.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Counts of rows actually inserted (conflicts excluded).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub facilities_inserted: u64,
    pub inspections_inserted: u64,
}

/// Postgres loader with a run-scoped connection pool.
pub struct Loader {
    pool: PgPool,
}

impl Loader {
    /// Acquire a connection pool for this run.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, LoadError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        info!("database connection pool established");
        Ok(Self { pool })
    }

    /// Apply schema migrations.
    pub async fn migrate(&self) -> Result<(), LoadError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("database migrations completed");
        Ok(())
    }

    /// Insert facilities, then inspections, fail-fast in that order.
    pub async fn load(
        &self,
        facilities: &[Facility],
        inspections: &[Inspection],
    ) -> Result<LoadSummary, LoadError> {
        let mut summary = LoadSummary::default();

        for chunk in facilities.chunks(INSERT_CHUNK) {
            let mut builder = facility_insert(chunk);
            let result = builder.build().execute(&self.pool).await?;
            summary.facilities_inserted += result.rows_affected();
        }
        info!(
            rows = facilities.len(),
            inserted = summary.facilities_inserted,
            "facilities loaded"
        );

        for chunk in inspections.chunks(INSERT_CHUNK) {
            let mut builder = inspection_insert(chunk);
            let result = builder.build().execute(&self.pool).await?;
            summary.inspections_inserted += result.rows_affected();
        }
        info!(
            rows = inspections.len(),
            inserted = summary.inspections_inserted,
            "inspections loaded"
        );

        Ok(summary)
    }

    /// Release the pool at run end.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn facility_insert(chunk: &[Facility]) -> QueryBuilder<'_, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO facilities (license_number, dba_name, aka_name, facility_type, risk, \
         address, city, state, zip, latitude, longitude, location) ",
    );
    builder.push_values(chunk, |mut row, f| {
        row.push_bind(f.license_number)
            .push_bind(&f.dba_name)
            .push_bind(&f.aka_name)
            .push_bind(&f.facility_type)
            .push_bind(&f.risk)
            .push_bind(&f.address)
            .push_bind(&f.city)
            .push_bind(&f.state)
            .push_bind(f.zip)
            .push_bind(f.latitude)
            .push_bind(f.longitude)
            .push_bind(&f.location);
    });
    builder.push(" ON CONFLICT (license_number) DO NOTHING");
    builder
}

fn inspection_insert(chunk: &[Inspection]) -> QueryBuilder<'_, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO inspections (inspection_id, license_number, inspection_date, \
         inspection_type, risk, results, violations) ",
    );
    builder.push_values(chunk, |mut row, i| {
        row.push_bind(i.inspection_id)
            .push_bind(i.license_number)
            .push_bind(i.inspection_date)
            .push_bind(&i.inspection_type)
            .push_bind(&i.risk)
            .push_bind(&i.results)
            .push_bind(&i.violations);
    });
    builder.push(" ON CONFLICT (inspection_id) DO NOTHING");
    builder
}
