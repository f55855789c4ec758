//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur during telemetry initialization.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize metrics.
    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),

    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Failed to parse an address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
