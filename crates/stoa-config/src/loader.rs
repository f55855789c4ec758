//! Layered configuration loading.
//!
//! Later layers override earlier ones:
//!
//! 1. Defaults (or a development/production preset)
//! 2. A TOML or JSON file
//! 3. Environment variables under a prefix

use std::env;
use std::fs;
use std::path::Path;

use crate::schema::{Extensions, IndexFile, LogFormat};
use crate::{ConfigError, StaticConfig};

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use stoa_config::ConfigLoader;
///
/// # fn main() -> Result<(), stoa_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("stoa.toml")?
///     .with_env_prefix("STOA")
///     .load()?;
///
/// let options = config.to_options()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: StaticConfig,
    env_prefix: Option<String>,
    file_loaded: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: StaticConfig::default(),
            env_prefix: None,
            file_loaded: false,
        }
    }

    /// Reset to default values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = StaticConfig::default();
        self
    }

    /// Start from the development preset.
    ///
    /// ```
    /// use stoa_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = StaticConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = StaticConfig::production();
        self
    }

    /// Load a file. The format follows the extension (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let file_config = Self::parse_file(&content, path)?;
        self.merge_config(file_config);
        self.file_loaded = true;

        Ok(self)
    }

    /// Load a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the named format.
    ///
    /// ```
    /// use stoa_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(r#"root = "public""#, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.root, std::path::PathBuf::from("public"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::UnsupportedFormat(format.to_string())),
        };

        self.merge_config(config);
        Ok(self)
    }

    /// Apply environment overrides of the form `PREFIX__KEY` and
    /// `PREFIX__SECTION__KEY`, e.g. `STOA__MAX_AGE=60000` or
    /// `STOA__LOGGING__LEVEL=debug`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load variables from a `.env` file into the process environment, if
    /// one exists.
    ///
    /// # Errors
    ///
    /// Never fails today; a missing `.env` file is ignored.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Ok(self)
    }

    /// Returns true if a configuration file has been loaded.
    #[must_use]
    pub fn file_loaded(&self) -> bool {
        self.file_loaded
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation
    /// fails.
    pub fn load(mut self) -> Result<StaticConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Return the configuration without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> StaticConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<StaticConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    // Files replace the whole configuration; serde defaults fill unset fields.
    fn merge_config(&mut self, file_config: StaticConfig) {
        self.config = file_config;
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> = env::vars()
            .filter(|(key, _)| key.starts_with(&marker))
            .collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["ROOT"] => config.root = value.into(),
            ["DEFER"] => config.defer = parse_bool_var(key, value)?,
            ["INDEX"] => {
                config.index = match parse_bool(value) {
                    Some(enabled) => IndexFile::Enabled(enabled),
                    None => IndexFile::Name(value.to_string()),
                };
            }
            ["MAX_AGE"] => {
                config.max_age = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected milliseconds"))?;
            }
            ["IMMUTABLE"] => config.immutable = parse_bool_var(key, value)?,
            ["HIDDEN"] => config.hidden = parse_bool_var(key, value)?,
            ["FORMAT"] => config.format = parse_bool_var(key, value)?,
            ["EXTENSIONS"] => {
                config.extensions = match parse_bool(value) {
                    Some(enabled) => Extensions::Enabled(enabled),
                    None => Extensions::List(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|ext| !ext.is_empty())
                            .map(str::to_string)
                            .collect(),
                    ),
                };
            }
            ["BROTLI"] => config.brotli = parse_bool_var(key, value)?,
            ["GZIP"] => config.gzip = parse_bool_var(key, value)?,

            ["LOGGING", "ENABLED"] => config.logging.enabled = parse_bool_var(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }

            ["METRICS", "ENABLED"] => config.metrics.enabled = parse_bool_var(key, value)?,
            ["METRICS", "ADDR"] => config.metrics.addr = value.to_string(),

            _ => {}
        }
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}
