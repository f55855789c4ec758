//! # Stoa Middleware
//!
//! Middleware pipeline and the static file serving stage for Stoa.
//!
//! A [`Pipeline`] is an ordered list of [`Middleware`] stages. Each stage
//! receives the request and a [`Next`] for the rest of the chain, and
//! returns a [`MiddlewareResult`]. Errors propagate outwards until a stage
//! such as [`ErrorNormalizationMiddleware`] turns them into responses.
//!
//! ```text
//! Request → RequestId → ErrorNormalization → ServeStatic → handler
//!                                                             ↓
//! Response ←──────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use stoa_middleware::{ErrorNormalizationMiddleware, Pipeline, RequestIdMiddleware, ServeStatic};
//! use stoa_static::ServeOptions;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::builder()
//!     .stage(RequestIdMiddleware::new())
//!     .stage(ErrorNormalizationMiddleware::new())
//!     .stage(ServeStatic::new(ServeOptions::new("public")?))
//!     .build();
//!
//! let request = http::Request::builder()
//!     .uri("/index.html")
//!     .body(Full::new(Bytes::new()))?;
//! let response = pipeline.respond(request).await;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/stoa-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod body;
pub mod context;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use body::Body;
pub use context::MiddlewareContext;
pub use error::PipelineError;
pub use middleware::{BoxFuture, Middleware, MiddlewareResult, Next};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use stages::{
    send, ErrorNormalizationMiddleware, NormalizedError, RequestIdMiddleware, ServeStatic,
    ServedFile, REQUEST_ID_HEADER,
};
pub use types::{Request, Response, ResponseExt};
