//! Errors propagated through the pipeline.

use crate::types::{Response, ResponseExt};
use http::StatusCode;
use std::error::Error as StdError;
use stoa_static::ServeError;
use thiserror::Error;

/// An error raised by a middleware stage or handler.
///
/// Carries the HTTP status the error maps to and a message that is safe to
/// show a client. The underlying cause, if any, is kept as the source.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PipelineError {
    status: StatusCode,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl PipelineError {
    /// Creates an error with a status and client-facing message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the HTTP status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the resolution error this was created from, if any.
    #[must_use]
    pub fn serve_error(&self) -> Option<&ServeError> {
        self.source.as_deref().and_then(|e| e.downcast_ref())
    }

    /// Renders the error as a plain text response.
    #[must_use]
    pub fn into_response(self) -> Response {
        Response::error(self.status, &self.message)
    }
}

impl From<ServeError> for PipelineError {
    fn from(err: ServeError) -> Self {
        let status = err.status_code();
        let message = if err.is_exposable() {
            err.to_string()
        } else {
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        };
        Self::new(status, message).with_source(err)
    }
}
