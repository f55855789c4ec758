//! Built-in middleware stages.
//!
//! - [`request_id`]: assign and echo a request ID
//! - [`error_normalization`]: render propagated errors as JSON envelopes
//! - [`serve_static`]: serve files from a root directory

pub mod error_normalization;
pub mod request_id;
pub mod serve_static;

pub use error_normalization::{ErrorNormalizationMiddleware, NormalizedError};
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
pub use serve_static::{send, ServeStatic, ServedFile};
