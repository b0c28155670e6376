//! Environment-backed configuration.
//!
//! ## Environment Variables
//! - `DATABASE_URL` - Postgres connection string (required)
//! - `LISTEN_ADDR` - bind address (default: `0.0.0.0:8080`)
//! - `DB_MAX_CONNECTIONS` - pool size ceiling (default: `10`)
//! - `DB_MIN_CONNECTIONS` - connections kept warm (default: `0`)
//! - `DB_ACQUIRE_TIMEOUT_SECS` - pool acquire timeout (default: `30`)

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} is invalid: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_addr = lookup("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        if url.trim().is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let max_connections = parse_or("DB_MAX_CONNECTIONS", &lookup, 10)?;
        let min_connections = parse_or("DB_MIN_CONNECTIONS", &lookup, 0)?;
        if min_connections > max_connections {
            return Err(ConfigError::Invalid(
                "DB_MIN_CONNECTIONS",
                "must not exceed DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        let acquire_timeout =
            Duration::from_secs(parse_or("DB_ACQUIRE_TIMEOUT_SECS", &lookup, 30)?);

        Ok(Self {
            listen_addr,
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections,
                acquire_timeout,
            },
        })
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
    }
}
