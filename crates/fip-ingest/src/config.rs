//! Configuration management
//!
//! Everything is env-first with named defaults, loaded once at startup and
//! passed explicitly into the components that need it. The database settings
//! accept either a full `DATABASE_URL` or the individual `DB_*` parts the
//! original deployment used.

use serde::{Deserialize, Serialize};

use fip_common::{FipError, Result};

// ============================================================================
// Ingest Configuration Constants
// ============================================================================

/// Maximum batch size the source API accepts per page.
pub const DEFAULT_PAGE_SIZE: usize = 50_000;

/// Default path for the raw-record staging artifact.
pub const DEFAULT_RAW_PATH: &str = "data/raw_data.json";

/// Default path for the cleaned-dataset staging artifact.
pub const DEFAULT_CLEANED_PATH: &str = "data/cleaned_data.csv";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Base URL of the paginated inspection feed.
    pub api_url: String,
    /// Records requested per page.
    pub page_size: usize,
    /// Staging path for the raw JSON accumulation.
    pub raw_path: String,
    /// Staging path for the cleaned CSV dataset.
    pub cleaned_path: String,
    pub database: DatabaseConfig,
}

/// Database configuration, passed explicitly into the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl IngestConfig {
    /// Load configuration from the environment and defaults.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = IngestConfig {
            api_url: std::env::var("API_URL")
                .map_err(|_| FipError::Config("API_URL is missing from the environment".into()))?,
            page_size: std::env::var("PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PAGE_SIZE),
            raw_path: std::env::var("RAW_PATH").unwrap_or_else(|_| DEFAULT_RAW_PATH.to_string()),
            cleaned_path: std::env::var("CLEANED_PATH")
                .unwrap_or_else(|_| DEFAULT_CLEANED_PATH.to_string()),
            database: DatabaseConfig::from_env()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(FipError::Config("API URL cannot be empty".into()));
        }
        if self.page_size == 0 {
            return Err(FipError::Config("Page size must be greater than 0".into()));
        }
        self.database.validate()
    }
}

impl DatabaseConfig {
    /// Build from `DATABASE_URL`, or from the `DB_USER`/`DB_PASSWORD`/
    /// `DB_HOST`/`DB_PORT`/`DB_NAME` parts when no full URL is set.
    pub fn from_env() -> Result<Self> {
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let user = require("DB_USER")?;
                let password = require("DB_PASSWORD")?;
                let host = require("DB_HOST")?;
                let port = require("DB_PORT")?;
                let name = require("DB_NAME")?;
                format!("postgresql://{}:{}@{}:{}/{}", user, password, host, port, name)
            },
        };

        Ok(DatabaseConfig {
            url,
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
            connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(FipError::Config("Database URL cannot be empty".into()));
        }
        if self.max_connections == 0 {
            return Err(FipError::Config(
                "Database max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| FipError::Config(format!("{} is missing from the environment", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> IngestConfig {
        IngestConfig {
            api_url: "https://data.example.org/resource/inspections.json".into(),
            page_size: DEFAULT_PAGE_SIZE,
            raw_path: DEFAULT_RAW_PATH.into(),
            cleaned_path: DEFAULT_CLEANED_PATH.into(),
            database: DatabaseConfig {
                url: "postgresql://localhost/fip".into(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn empty_api_url_is_rejected() {
        let mut config = sample_config();
        config.api_url.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut config = sample_config();
        config.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_connections_is_rejected() {
        let mut config = sample_config();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }
}
