//! # Stoa Static
//!
//! File resolution for the Stoa static-file middleware.
//!
//! Given a request path, this crate decides which file under a configured
//! root should be served, or why none should:
//!
//! - **Path safety**: strict percent-decoding, NUL/absolute rejection and
//!   lexical containment against the root (both `/` and `\` separate)
//! - **Encoding negotiation**: `.br`/`.gz` siblings chosen from
//!   `Accept-Encoding`
//! - **Fallbacks**: index files, directory formatting and extension lists
//! - **Headers**: `Content-Type`, `Content-Length`, `Last-Modified` and
//!   `Cache-Control` derived from the selected file
//!
//! The HTTP plumbing (streaming the body, middleware modes) lives in
//! `stoa-middleware`.
//!
//! ## Example
//!
//! ```no_run
//! use http::Method;
//! use stoa_static::{resolve, AcceptEncoding, RequestView, ResolvedTarget, ServeOptions};
//!
//! # async fn example() -> Result<(), stoa_static::ServeError> {
//! let options = ServeOptions::builder().root("./public").build()?;
//!
//! let method = Method::GET;
//! let view = RequestView::new("/index.html", &method, AcceptEncoding::parse(Some("br, gzip")));
//!
//! match resolve(&view, &options).await? {
//!     ResolvedTarget::Serve(file) => println!("serving {}", file.path().display()),
//!     ResolvedTarget::NotApplicable | ResolvedTarget::NotFound => println!("not handled"),
//! }
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/stoa-static/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod encoding;
mod error;
pub mod headers;
mod options;
pub mod path;
mod resolve;

pub use encoding::{AcceptEncoding, ContentCoding};
pub use error::ServeError;
pub use headers::apply_file_headers;
pub use options::{ServeOptions, ServeOptionsBuilder, SetHeaders, DEFAULT_INDEX};
pub use resolve::{resolve, RequestView, ResolvedFile, ResolvedTarget};
