//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use emitter_core::DEFAULT_PREFIX;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub env: Environment,
    pub redis: RedisConfig,
    pub emitter: EmitterSettings,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
    /// How long a publish may wait for a pooled connection
    #[serde(default = "default_pool_timeout_ms")]
    pub pool_timeout_ms: u64,
    /// Delay before the subscriber reconnects after losing Redis
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl RedisConfig {
    #[must_use]
    pub fn pool_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_timeout_ms)
    }
}

/// Emitter protocol settings
#[derive(Debug, Clone, Deserialize)]
pub struct EmitterSettings {
    /// Channel prefix shared with the gateways
    #[serde(default = "default_key")]
    pub key: String,
    /// Default window for fetch-sockets, join, leave, disconnect and server-side emit
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Default window for emit-with-ack
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            key: default_key(),
            request_timeout_ms: default_request_timeout_ms(),
            ack_timeout_ms: default_ack_timeout_ms(),
        }
    }
}

impl EmitterSettings {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

// Default value functions
fn default_key() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_pool_timeout_ms() -> u64 {
    1000
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_ack_timeout_ms() -> u64 {
    10_000
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `REDIS_URL` is missing or a numeric variable does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            env: lookup("APP_ENV")
                .and_then(|s| match s.to_lowercase().as_str() {
                    "production" => Some(Environment::Production),
                    "staging" => Some(Environment::Staging),
                    "development" => Some(Environment::Development),
                    _ => None,
                })
                .unwrap_or_default(),
            redis: RedisConfig {
                url: lookup("REDIS_URL").ok_or(ConfigError::MissingVar("REDIS_URL"))?,
                max_connections: parse_or(
                    &lookup,
                    "REDIS_MAX_CONNECTIONS",
                    default_redis_max_connections,
                )?,
                pool_timeout_ms: parse_or(&lookup, "REDIS_POOL_TIMEOUT_MS", default_pool_timeout_ms)?,
                reconnect_delay_ms: parse_or(
                    &lookup,
                    "EMITTER_SUBSCRIBER_RECONNECT_MS",
                    default_reconnect_delay_ms,
                )?,
            },
            emitter: EmitterSettings {
                key: lookup("EMITTER_KEY")
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(default_key),
                request_timeout_ms: parse_or(
                    &lookup,
                    "EMITTER_REQUEST_TIMEOUT_MS",
                    default_request_timeout_ms,
                )?,
                ack_timeout_ms: parse_or(&lookup, "EMITTER_ACK_TIMEOUT_MS", default_ack_timeout_ms)?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: fn() -> T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(default()),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
