//! # emitter-common
//!
//! Shared utilities: configuration loaded from the environment and tracing setup.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{AppConfig, ConfigError, EmitterSettings, Environment, RedisConfig};
pub use telemetry::{init_tracing, try_init_tracing, TracingConfig, TracingError};
