//! Error normalization middleware.
//!
//! Converts errors propagated from later stages into responses with a
//! standard JSON envelope:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "FORBIDDEN",
//!     "message": "path escapes the root directory",
//!     "request_id": "0192c1d5-…"
//!   }
//! }
//! ```
//!
//! Server errors get a generic message unless
//! [`expose_internal_errors`](ErrorNormalizationMiddleware::expose_internal_errors)
//! is enabled. Without this stage, errors reach the caller of
//! [`Pipeline::process`](crate::Pipeline::process) unchanged.

use crate::context::MiddlewareContext;
use crate::error::PipelineError;
use crate::middleware::{BoxFuture, Middleware, MiddlewareResult, Next};
use crate::types::{Request, Response, ResponseExt};
use http::StatusCode;
use std::error::Error as _;
use tracing::{error, warn};

/// Error normalization middleware.
#[derive(Debug, Clone)]
pub struct ErrorNormalizationMiddleware {
    expose_internal_errors: bool,
    internal_error_message: String,
}

/// Details of the last normalized error, stored in the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    /// The error code.
    pub code: String,
    /// The message sent to the client.
    pub message: String,
    /// The HTTP status code.
    pub status_code: u16,
    /// Whether the error was a server error.
    pub was_internal: bool,
}

impl Default for ErrorNormalizationMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorNormalizationMiddleware {
    /// Creates the middleware with internal errors hidden.
    #[must_use]
    pub fn new() -> Self {
        Self {
            expose_internal_errors: false,
            internal_error_message: "An internal error occurred".to_string(),
        }
    }

    /// Sets whether server error messages are sent to clients.
    ///
    /// **Warning**: server errors can carry filesystem paths. Only enable this
    /// in development.
    #[must_use]
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Sets the message sent for hidden server errors.
    #[must_use]
    pub fn internal_error_message(mut self, message: &str) -> Self {
        self.internal_error_message = message.to_string();
        self
    }

    fn normalize(&self, ctx: &mut MiddlewareContext, err: &PipelineError) -> Response {
        let status = err.status();
        let code = status_to_code(status);
        let was_internal = status.is_server_error();

        let message = if was_internal && !self.expose_internal_errors {
            self.internal_error_message.clone()
        } else if was_internal {
            err.source()
                .map_or_else(|| err.message().to_string(), |source| source.to_string())
        } else {
            err.message().to_string()
        };

        if was_internal {
            error!(request_id = %ctx.request_id(), http.status = status.as_u16(), error = ?err, "request failed");
        } else {
            warn!(request_id = %ctx.request_id(), http.status = status.as_u16(), error = %err, "request rejected");
        }

        let response =
            Response::json_error(status, &code, &message, &ctx.request_id().to_string());

        ctx.set_extension(NormalizedError {
            code,
            message,
            status_code: status.as_u16(),
            was_internal,
        });

        response
    }
}

/// Maps an HTTP status to an error code.
fn status_to_code(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "BAD_REQUEST".to_string(),
        403 => "FORBIDDEN".to_string(),
        404 => "NOT_FOUND".to_string(),
        405 => "METHOD_NOT_ALLOWED".to_string(),
        500 => "INTERNAL_ERROR".to_string(),
        503 => "SERVICE_UNAVAILABLE".to_string(),
        other => format!("HTTP_{other}"),
    }
}

impl Middleware for ErrorNormalizationMiddleware {
    fn name(&self) -> &'static str {
        "error_normalization"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            match next.run(ctx, request).await {
                Ok(response) => Ok(response),
                Err(err) => Ok(self.normalize(ctx, &err)),
            }
        })
    }
}
