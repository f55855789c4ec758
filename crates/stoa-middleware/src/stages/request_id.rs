//! Request ID middleware.
//!
//! Assigns every request a UUID v7, optionally taken from an incoming
//! `X-Request-ID` header, stores it in the context for log correlation, and
//! echoes it on the response.
//!
//! Place it ahead of [`ErrorNormalizationMiddleware`](super::ErrorNormalizationMiddleware)
//! so error envelopes carry the same ID as the response header.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, MiddlewareResult, Next};
use crate::types::Request;
use http::HeaderValue;
use uuid::Uuid;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that generates or extracts request IDs.
#[derive(Debug, Clone, Default)]
pub struct RequestIdMiddleware {
    /// Whether incoming `X-Request-ID` headers are trusted.
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Creates the middleware. Incoming IDs are ignored.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a middleware that reuses valid incoming `X-Request-ID` values.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn extract_request_id(&self, request: &Request) -> Option<Uuid> {
        if !self.trust_incoming {
            return None;
        }

        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            let request_id = self
                .extract_request_id(&request)
                .unwrap_or_else(Uuid::now_v7);
            ctx.set_request_id(request_id);

            let mut response = next.run(ctx, request).await?;

            // A hyphenated UUID is always a valid header value.
            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}
