//! Typed configuration for Stoa.
//!
//! Loads a [`StaticConfig`] in layers:
//!
//! - defaults (or a development/production preset)
//! - a TOML or JSON file, with unknown fields rejected
//! - environment variable overrides
//!
//! and turns it into [`stoa_static::ServeOptions`] plus logging settings.
//!
//! # Example
//!
//! ```no_run
//! use stoa_config::ConfigLoader;
//!
//! # fn main() -> Result<(), stoa_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("stoa.toml")?
//!     .with_env_prefix("STOA")
//!     .load()?;
//!
//! let options = config.to_options()?;
//! stoa_telemetry::init_logging(&config.to_log_config()).ok();
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! root = "public"
//! defer = false
//! index = "index.html"      # or false
//! max_age = 86400000        # milliseconds
//! immutable = false
//! hidden = false
//! format = true
//! extensions = ["html"]     # or false
//! brotli = true
//! gzip = true
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = false
//! addr = "0.0.0.0:9090"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Keys use the form `PREFIX__KEY` or `PREFIX__SECTION__KEY`:
//!
//! - `STOA__ROOT=/srv/www`
//! - `STOA__INDEX=false`
//! - `STOA__EXTENSIONS=html,htm`
//! - `STOA__LOGGING__LEVEL=debug`

#![doc(html_root_url = "https://docs.rs/stoa-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
