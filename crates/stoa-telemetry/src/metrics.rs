//! Prometheus metrics for static file serving.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `stoa_files_served_total` | Counter | `encoding` | Files served |
//! | `stoa_bytes_served_total` | Counter | `encoding` | Bytes of served files |
//! | `stoa_requests_declined_total` | Counter | `reason` | Requests passed downstream |
//! | `stoa_resolve_errors_total` | Counter | `status` | Requests failed with an error |
//!
//! Recording functions are no-ops until a recorder is installed, so the
//! middleware calls them unconditionally.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address the host serves scrapes on (e.g. `"0.0.0.0:9090"`). Validated
    /// but never bound here.
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Installs the Prometheus recorder.
///
/// No listener is started and nothing binds `addr`; it is only checked to be
/// a socket address. The host exposes [`render_metrics`] on its own scrape
/// endpoint at that address.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidAddress`] for an unparsable address and
/// [`TelemetryError::MetricsInit`] if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    config
        .addr
        .parse::<SocketAddr>()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus text format, if initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!("stoa_files_served_total", "Files served from the root directory");
    describe_counter!("stoa_bytes_served_total", "Bytes of files served");
    describe_counter!(
        "stoa_requests_declined_total",
        "Requests passed to downstream handlers"
    );
    describe_counter!(
        "stoa_resolve_errors_total",
        "Requests that failed with a resolution error"
    );
}

/// Records a served file. `encoding` is `identity` for uncompressed files.
pub fn record_file_served(encoding: &'static str, size_bytes: u64) {
    counter!("stoa_files_served_total", "encoding" => encoding).increment(1);
    counter!("stoa_bytes_served_total", "encoding" => encoding).increment(size_bytes);
}

/// Records a request passed downstream (`not_found`, `declined`, `method`).
pub fn record_declined(reason: &'static str) {
    counter!("stoa_requests_declined_total", "reason" => reason).increment(1);
}

/// Records a resolution error by status code.
pub fn record_resolve_error(status_code: u16) {
    counter!("stoa_resolve_errors_total", "status" => status_code.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
    }

    #[test]
    fn test_disabled_metrics_is_noop() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not an address".to_string(),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_enabled_metrics_render_without_listener() {
        let config = MetricsConfig {
            enabled: true,
            addr: "127.0.0.1:1".to_string(),
        };
        init_metrics(&config).unwrap();

        record_file_served("gzip", 48);
        let rendered = render_metrics().unwrap();
        assert!(rendered.contains("stoa_files_served_total"));
    }

    #[test]
    fn test_record_functions_dont_panic() {
        record_file_served("br", 22);
        record_declined("not_found");
        record_resolve_error(403);
    }
}
