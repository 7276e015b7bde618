//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Read an optional, non-empty string variable.
pub fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Read and parse an optional variable.
///
/// A value that is present but does not parse is an error rather than
/// silently falling back to a default.
pub fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL (PostgreSQL)
    pub database_url: String,

    /// Deployment environment name (`development`, `staging`, `production`)
    pub app_env: String,

    /// Runtime configuration
    pub rust_log: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            database_url: env_string("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?,
            app_env: env_string("APP_ENV").unwrap_or_else(|| "development".to_string()),
            rust_log: env_string("RUST_LOG").unwrap_or_else(|| "warden=debug".to_string()),
            port: env_parse("PORT")?.unwrap_or(3000),
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
