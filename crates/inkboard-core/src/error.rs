//! Core error types for inkboard-core.
//!
//! Each collaborator boundary has its own error enum so the coordinating
//! flows can decide locally what a failure means: adapter failures skip a
//! refresh tick, render failures are retried once, configuration errors are
//! fatal at startup only.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for inkboard-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Data source failures (calendar, tasks)
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// Display sink failures
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A background task panicked or was aborted
    #[error("Task '{task}' failed to join: {message}")]
    Join { task: &'static str, message: String },
}

/// Failure of a remote data adapter.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Transport-level failure (DNS, TLS, timeout)
    #[error("HTTP request to {service} failed: {message}")]
    Http { service: String, message: String },

    /// Server answered with a non-success status
    #[error("{service} returned status {status}")]
    Status { service: String, status: u16 },

    /// Response body did not match the expected shape
    #[error("Failed to decode {service} response: {message}")]
    Decode { service: String, message: String },

    /// The source cannot be reached at all right now
    #[error("{0} unavailable")]
    Unavailable(String),
}

/// The sensor could not produce a reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Sensor unavailable: {reason}")]
pub struct SensorUnavailable {
    pub reason: String,
}

impl SensorUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Display sink failures.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Writing the frame failed
    #[error("Failed to write frame: {0}")]
    Io(#[from] std::io::Error),

    /// Device refused or timed out
    #[error("Display device error: {0}")]
    Device(String),

    /// The blocking render worker did not complete
    #[error("Render worker failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<tokio::task::JoinError> for RenderError {
    fn from(err: tokio::task::JoinError) -> Self {
        RenderError::Worker(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_error_converts_into_core_error() {
        let err: CoreError = AdapterError::Unavailable("calendar".into()).into();
        assert_eq!(err.to_string(), "Adapter error: calendar unavailable");
    }

    #[test]
    fn config_error_messages_name_the_key() {
        let err = ConfigError::InvalidValue {
            key: "intervals.refresh_secs".into(),
            message: "must be greater than zero".into(),
        };
        assert!(err.to_string().contains("intervals.refresh_secs"));
    }
}
