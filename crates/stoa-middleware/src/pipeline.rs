//! Ordered middleware pipeline.
//!
//! Stages run in the order they were added. When every stage delegates, the
//! request reaches the terminal handler; [`Pipeline::process`] uses one that
//! answers `404 Not Found` with no body, which is what deferred static
//! serving looks for.
//!
//! ```text
//! Request → stage 1 → stage 2 → … → handler
//!                                      ↓
//! Response ← stage 1 ← stage 2 ← … ←───┘
//! ```

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, MiddlewareResult, Next};
use crate::types::{Request, Response, ResponseExt};
use std::sync::Arc;

/// A composed chain of middleware stages.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Middleware>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs the request through every stage, ending at a handler that
    /// answers with an empty `404 Not Found`.
    pub async fn process(&self, ctx: &mut MiddlewareContext, request: Request) -> MiddlewareResult {
        self.process_with(ctx, request, |_ctx, _req| {
            Box::pin(async { Ok(Response::unhandled()) })
        })
        .await
    }

    /// Runs the request through every stage, ending at `handler`.
    pub async fn process_with<H>(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        handler: H,
    ) -> MiddlewareResult
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult>
            + Send
            + 'static,
    {
        self.build_chain(handler).run(ctx, request).await
    }

    /// Runs the request with a fresh context and renders any error as a
    /// plain text response.
    pub async fn respond(&self, request: Request) -> Response {
        let mut ctx = MiddlewareContext::new();
        match self.process(&mut ctx, request).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult> + Send + 'a,
    {
        self.stages
            .iter()
            .rev()
            .fold(Next::handler(handler), |next, stage| {
                Next::new(stage.as_ref(), next)
            })
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Middleware>>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared stage.
    #[must_use]
    pub fn shared_stage(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::error::PipelineError;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct OrderTrackingMiddleware {
        name: &'static str,
        counter: Arc<AtomicUsize>,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for OrderTrackingMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, MiddlewareResult> {
            Box::pin(async move {
                self.counter.fetch_add(1, Ordering::SeqCst);
                self.order.lock().unwrap().push(self.name);
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_executes_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));
        let tracker = |name| OrderTrackingMiddleware {
            name,
            counter: counter.clone(),
            order: order.clone(),
        };

        let pipeline = Pipeline::builder()
            .stage(tracker("first"))
            .stage(tracker("second"))
            .stage(tracker("third"))
            .build();

        let mut ctx = MiddlewareContext::new();
        let response = pipeline
            .process_with(&mut ctx, request(), |_ctx, _req| {
                Box::pin(async { Ok(Response::new(Body::from("OK"))) })
            })
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(pipeline.stage_names(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_unhandled() {
        let pipeline = Pipeline::builder().build();
        assert_eq!(pipeline.stage_count(), 0);

        let mut ctx = MiddlewareContext::new();
        let response = pipeline.process(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.body().is_empty());
    }

    struct Failing;

    impl Middleware for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut MiddlewareContext,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, MiddlewareResult> {
            Box::pin(async { Err(PipelineError::new(StatusCode::FORBIDDEN, "nope")) })
        }
    }

    #[tokio::test]
    async fn test_process_propagates_errors() {
        let pipeline = Pipeline::builder().stage(Failing).build();
        let mut ctx = MiddlewareContext::new();
        let err = pipeline.process(&mut ctx, request()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_respond_renders_errors() {
        let pipeline = Pipeline::builder().stage(Failing).build();
        let response = pipeline.respond(request()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.into_body().to_bytes().await.unwrap(), "nope");
    }
}
