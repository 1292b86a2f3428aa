use obs_core::mask_sensitive;
use obs_database::PoolSettings;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://obs.sqlite?mode=rwc";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {details}")]
    InvalidConfiguration { details: String },
}

/// Resolved settings of the ingestion gateway
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    // Required fields
    pub address: SocketAddr,
    pub database_url: String,

    /// Shared secret expected in the `X-OBS-Key` header. When unset every
    /// ingestion request is answered with a server error.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    // Connection pool settings (all optional with defaults)
    pub db_max_connections: Option<u32>,
    pub db_min_connections: Option<u32>,
    pub db_connect_timeout_secs: Option<u64>,
}

impl ServerConfig {
    /// Create a new configuration, reading pool settings from the process environment
    pub fn new(
        address: &str,
        database_url: String,
        api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::with_env(address, database_url, api_key, |name| std::env::var(name).ok())
    }

    /// Create a new configuration, reading pool settings through `lookup`
    pub fn with_env<F>(
        address: &str,
        database_url: String,
        api_key: Option<String>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = address
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidConfiguration {
                details: format!("address '{}': {}", address, e),
            })?;

        if database_url.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration {
                details: "database URL must not be empty".to_string(),
            });
        }

        // An empty secret is treated as not configured
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let config = ServerConfig {
            address,
            database_url,
            api_key,
            db_max_connections: parse_env(&lookup, "OBS_DB_MAX_CONNECTIONS")?,
            db_min_connections: parse_env(&lookup, "OBS_DB_MIN_CONNECTIONS")?,
            db_connect_timeout_secs: parse_env(&lookup, "OBS_DB_CONNECT_TIMEOUT")?,
        };

        match &config.api_key {
            Some(key) => tracing::debug!("Ingestion secret configured ({})", mask_sensitive(key)),
            None => tracing::warn!("OBS_API_KEY is not set, ingestion requests will be rejected"),
        }

        Ok(config)
    }

    /// Pool settings with defaults applied
    pub fn pool_settings(&self) -> PoolSettings {
        let defaults = PoolSettings::default();
        PoolSettings {
            max_connections: self.db_max_connections.unwrap_or(defaults.max_connections),
            min_connections: self.db_min_connections.unwrap_or(defaults.min_connections),
            connect_timeout: self
                .db_connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
        }
    }
}

fn parse_env<F, T>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidConfiguration {
                details: format!("{}='{}': {}", name, raw, e),
            }),
    }
}
