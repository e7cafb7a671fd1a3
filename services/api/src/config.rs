//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Origin of the chat UI, allowed through CORS.
    pub allowed_origin: String,
    pub max_upload_bytes: usize,
    pub session_capacity: usize,
    pub session_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub history_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 5000)),
            log_level: Level::INFO,
            allowed_origin: "http://localhost:3000".to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
            session_capacity: 1000,
            session_ttl: Duration::from_secs(60 * 60),
            session_sweep_interval: Duration::from_secs(60),
            history_window: 10,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Unset keys take
    /// the defaults from [`Config::default`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Server Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", defaults.bind_address)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin = lookup("ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin);
        let max_upload_bytes = parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?;

        // --- Conversation Store Settings ---
        let session_capacity = parse_or(&lookup, "SESSION_CAPACITY", defaults.session_capacity)?;
        if session_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_CAPACITY".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let session_ttl = parse_or(&lookup, "SESSION_TTL_SECS", defaults.session_ttl.as_secs())
            .map(Duration::from_secs)?;
        if session_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let session_sweep_interval = parse_or(
            &lookup,
            "SESSION_SWEEP_INTERVAL_SECS",
            defaults.session_sweep_interval.as_secs(),
        )
        .map(Duration::from_secs)?;
        if session_sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "SESSION_SWEEP_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let history_window = parse_or(&lookup, "HISTORY_WINDOW", defaults.history_window)?;

        Ok(Self {
            bind_address,
            log_level,
            allowed_origin,
            max_upload_bytes,
            session_capacity,
            session_ttl,
            session_sweep_interval,
            history_window,
        })
    }
}

/// Parses `key` if it is set, otherwise returns `default`.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
