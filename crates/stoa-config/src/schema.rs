//! Configuration schema types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stoa_static::{ServeOptions, DEFAULT_INDEX};
use stoa_telemetry::{LogConfig, MetricsConfig as TelemetryMetricsConfig};

use crate::ConfigError;

/// Static file serving configuration.
///
/// Mirrors [`ServeOptions`] field for field, in a form that can be read from
/// TOML, JSON or the environment.
///
/// # Example
///
/// ```
/// use stoa_config::StaticConfig;
///
/// let config: StaticConfig = toml::from_str(r#"
///     root = "public"
///     index = false
///     max_age = 86400000
///     extensions = ["html"]
/// "#).unwrap();
///
/// assert!(config.index.file_name().is_none());
/// assert_eq!(config.extensions.list(), Some(&["html".to_string()][..]));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StaticConfig {
    /// Root directory. Relative paths resolve against the working directory.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Let downstream handlers respond first.
    #[serde(default)]
    pub defer: bool,

    /// Index file name, or `false` to disable.
    #[serde(default)]
    pub index: IndexFile,

    /// `Cache-Control` max age in milliseconds.
    #[serde(default)]
    pub max_age: u64,

    /// Add `immutable` to `Cache-Control`.
    #[serde(default)]
    pub immutable: bool,

    /// Serve dot-files.
    #[serde(default)]
    pub hidden: bool,

    /// Serve `dir/index` for `dir` requested without a trailing slash.
    #[serde(default)]
    pub format: bool,

    /// Fallback extensions, or `false` to disable.
    #[serde(default)]
    pub extensions: Extensions,

    /// Serve `.br` siblings to clients that accept brotli.
    #[serde(default = "default_true")]
    pub brotli: bool,

    /// Serve `.gz` siblings to clients that accept gzip.
    #[serde(default = "default_true")]
    pub gzip: bool,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            defer: false,
            index: IndexFile::default(),
            max_age: 0,
            immutable: false,
            hidden: false,
            format: false,
            extensions: Extensions::default(),
            brotli: true,
            gzip: true,
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl StaticConfig {
    /// Defaults with human-readable debug logging.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                ..LoggingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Defaults with JSON logging at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Checks values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value("root", "must not be empty"));
        }

        if let Some(name) = self.index.file_name() {
            if name.contains(['/', '\\']) {
                return Err(ConfigError::invalid_value(
                    "index",
                    "must be a file name, not a path",
                ));
            }
        }

        match &self.extensions {
            Extensions::Enabled(true) => {
                return Err(ConfigError::invalid_value(
                    "extensions",
                    "expected a list of extensions or false",
                ));
            }
            Extensions::List(list) => {
                if list.iter().any(|ext| ext.trim_start_matches('.').is_empty()) {
                    return Err(ConfigError::invalid_value(
                        "extensions",
                        "entries must not be empty",
                    ));
                }
            }
            Extensions::Enabled(false) => {}
        }

        self.logging.validate()?;
        self.metrics.validate()
    }

    /// Builds [`ServeOptions`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Options`] if the root cannot be resolved.
    pub fn to_options(&self) -> Result<ServeOptions, ConfigError> {
        let mut builder = ServeOptions::builder()
            .root(&self.root)
            .defer(self.defer)
            .max_age(Duration::from_millis(self.max_age))
            .immutable(self.immutable)
            .hidden(self.hidden)
            .format(self.format)
            .brotli(self.brotli)
            .gzip(self.gzip);

        builder = match self.index.file_name() {
            Some(name) => builder.index(name),
            None => builder.no_index(),
        };
        builder = match self.extensions.list() {
            Some(list) => builder.extensions(list),
            None => builder.no_extensions(),
        };

        Ok(builder.build()?)
    }

    /// Returns the logging settings for [`stoa_telemetry::init_logging`].
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        self.logging.to_log_config()
    }

    /// Returns the metrics settings for [`stoa_telemetry::init_metrics`].
    #[must_use]
    pub fn to_metrics_config(&self) -> TelemetryMetricsConfig {
        TelemetryMetricsConfig {
            enabled: self.metrics.enabled,
            addr: self.metrics.addr.clone(),
        }
    }
}

/// The `index` setting: a file name, or a boolean.
///
/// `true` means [`DEFAULT_INDEX`]; `false` and `""` disable index files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IndexFile {
    /// Enabled or disabled without naming a file.
    Enabled(bool),
    /// A specific file name.
    Name(String),
}

impl Default for IndexFile {
    fn default() -> Self {
        Self::Name(DEFAULT_INDEX.to_string())
    }
}

impl IndexFile {
    /// Returns the index file name, if index files are enabled.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Enabled(true) => Some(DEFAULT_INDEX),
            Self::Enabled(false) => None,
            Self::Name(name) if name.is_empty() => None,
            Self::Name(name) => Some(name),
        }
    }
}

/// The `extensions` setting: a list, or `false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Extensions {
    /// `false` disables the fallback; `true` is rejected by validation.
    Enabled(bool),
    /// Extensions tried in order, with or without a leading dot.
    List(Vec<String>),
}

impl Default for Extensions {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl Extensions {
    /// Returns the list, if the fallback is enabled and non-empty.
    #[must_use]
    pub fn list(&self) -> Option<&[String]> {
        match self {
            Self::List(list) if !list.is_empty() => Some(list),
            _ => None,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `"info"` or `"stoa_static=debug,warn"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.level.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }
        Ok(())
    }

    fn to_log_config(&self) -> LogConfig {
        let base = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            ..base
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable, multi-line.
    Pretty,
}

/// Metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder.
    #[serde(default)]
    pub enabled: bool,

    /// Address the host serves scrapes on. Validated, never bound.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

impl MetricsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "metrics.addr",
                format!("invalid socket address: {}", self.addr),
            ));
        }
        Ok(())
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}
