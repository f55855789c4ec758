//! Observability for Stoa.
//!
//! - **Logging**: structured JSON or pretty output via `tracing-subscriber`
//! - **Metrics**: Prometheus counters for served, declined and failed requests
//!
//! # Example
//!
//! ```rust,ignore
//! use stoa_telemetry::{init_telemetry, LogConfig, MetricsConfig};
//!
//! init_telemetry(&LogConfig::production(), &MetricsConfig::default())?;
//! ```

#![doc(html_root_url = "https://docs.rs/stoa-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use crate::error::TelemetryError;
pub use crate::logging::{init_logging, LogConfig};
pub use crate::metrics::{init_metrics, render_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns the first subsystem failure.
pub fn init_telemetry(logging: &LogConfig, metrics: &MetricsConfig) -> TelemetryResult<()> {
    init_logging(logging)?;
    init_metrics(metrics)
}
