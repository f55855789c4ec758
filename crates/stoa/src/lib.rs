//! # Stoa
//!
//! **Static file serving middleware for async HTTP pipelines**
//!
//! Stoa maps request paths onto files under a root directory and serves
//! them with correct headers:
//!
//! - **Safe paths**: strict percent-decoding, NUL and absolute path
//!   rejection, and containment under the root
//! - **Pre-compressed variants**: `.br` and `.gz` siblings picked from
//!   `Accept-Encoding`
//! - **Fallbacks**: index files, directory formatting, extension lists
//! - **Caching headers**: `Last-Modified` and `Cache-Control` with
//!   `max-age`/`immutable`
//! - **Two modes**: answer before downstream handlers, or only when they
//!   left the request unhandled
//!
//! ## Quick Start
//!
//! ```no_run
//! use stoa::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::builder()
//!     .stage(ErrorNormalizationMiddleware::new())
//!     .stage(stoa::serve("public", ServeOptions::builder().max_age(Duration::from_secs(3600)))?)
//!     .build();
//!
//! let request = http::Request::builder()
//!     .uri("/index.html")
//!     .body(Full::new(Bytes::new()))?;
//! let response = pipeline.respond(request).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → ServeStatic ──resolve──▶ root/…/file(.br|.gz)
//!               │  not found / declined
//!               ▼
//!           downstream handler
//! ```

#![doc(html_root_url = "https://docs.rs/stoa/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::path::PathBuf;

/// File resolution: options, path safety, negotiation, headers.
pub use stoa_static as files;

/// Middleware pipeline and the serving stage.
pub use stoa_middleware as middleware;

/// Layered configuration.
pub use stoa_config as config;

/// Logging and metrics.
pub use stoa_telemetry as telemetry;

use stoa_config::{ConfigError, StaticConfig};
use stoa_middleware::ServeStatic;
use stoa_static::{ServeError, ServeOptions, ServeOptionsBuilder};

/// Creates the serving stage for `root`, with the remaining options from
/// `options`.
///
/// The root is resolved to an absolute path once, here.
///
/// # Errors
///
/// Returns [`ServeError::InvalidRoot`] if the root cannot be made absolute.
pub fn serve(
    root: impl Into<PathBuf>,
    options: ServeOptionsBuilder,
) -> Result<ServeStatic, ServeError> {
    Ok(ServeStatic::new(options.root(root).build()?))
}

/// Creates the serving stage for the current working directory with default
/// options.
///
/// # Errors
///
/// Returns [`ServeError::InvalidRoot`] if the working directory cannot be
/// determined.
pub fn serve_default() -> Result<ServeStatic, ServeError> {
    serve(".", ServeOptions::builder())
}

/// Creates the serving stage from loaded configuration.
///
/// # Errors
///
/// Returns [`ConfigError`] if the configuration is invalid.
pub fn from_config(config: &StaticConfig) -> Result<ServeStatic, ConfigError> {
    config.validate()?;
    Ok(ServeStatic::new(config.to_options()?))
}

/// Prelude module for convenient imports.
///
/// ```
/// use stoa::prelude::*;
/// ```
pub mod prelude {
    pub use std::time::Duration;

    pub use bytes::Bytes;
    pub use http_body_util::Full;

    pub use stoa_static::{
        resolve, AcceptEncoding, ContentCoding, RequestView, ResolvedFile, ResolvedTarget,
        ServeError, ServeOptions, ServeOptionsBuilder,
    };

    pub use stoa_middleware::{
        send, Body, ErrorNormalizationMiddleware, Middleware, MiddlewareContext,
        MiddlewareResult, Next, Pipeline, PipelineError, Request, RequestIdMiddleware, Response,
        ResponseExt, ServeStatic, ServedFile,
    };

    pub use stoa_config::{ConfigLoader, StaticConfig};

    pub use stoa_telemetry::{init_telemetry, LogConfig, MetricsConfig};
}
