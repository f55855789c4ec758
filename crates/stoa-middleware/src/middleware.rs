//! Core middleware trait and chain types.
//!
//! A [`Middleware`] receives the context, the request, and a [`Next`] that
//! runs the rest of the chain. It may answer the request itself, delegate
//! and return the downstream response, or delegate first and adjust the
//! response afterwards.
//!
//! # Example
//!
//! ```
//! use stoa_middleware::{BoxFuture, Middleware, MiddlewareContext, MiddlewareResult, Next, Request};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, MiddlewareResult> {
//!         Box::pin(async move {
//!             let response = next.run(ctx, request).await?;
//!             tracing::debug!(elapsed = ?ctx.elapsed(), "request finished");
//!             Ok(response)
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::error::PipelineError;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The outcome of running a middleware or handler.
pub type MiddlewareResult = Result<Response, PipelineError>;

type Handler<'a> =
    Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult> + Send + 'a>;

/// A stage in the request pipeline.
///
/// Errors returned from downstream must be propagated, not swallowed, unless
/// the stage exists to convert them into responses.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this stage, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult>;
}

/// The rest of the chain after the current middleware.
///
/// Consumed by [`Next::run`], so downstream runs at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Handler<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that runs `middleware` followed by `next`.
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes a handler.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Runs the next middleware or handler.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> MiddlewareResult {
        match self.inner {
            NextInner::Chain { middleware, next } => {
                middleware.process(ctx, request, *next).await
            }
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}
