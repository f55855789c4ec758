//! Static file serving stage.
//!
//! Two modes, selected by [`ServeOptions::defer`]:
//!
//! - **Immediate**: GET and HEAD requests are resolved first. A served file
//!   answers the request and downstream never runs; anything else is
//!   delegated.
//! - **Deferred**: downstream runs first. Only if it produced no body and
//!   left the status at `404` is a GET or HEAD request resolved.
//!
//! In both modes a missing file means "not handled" rather than an error.
//! Every other resolution failure propagates as a [`PipelineError`] with the
//! failure's status (400, 403 or 500).

use crate::body::Body;
use crate::context::MiddlewareContext;
use crate::error::PipelineError;
use crate::middleware::{BoxFuture, Middleware, MiddlewareResult, Next};
use crate::types::{Request, Response};
use http::{Method, StatusCode};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use stoa_static::{
    apply_file_headers, resolve, ContentCoding, RequestView, ResolvedTarget, ServeError,
    ServeOptions,
};
use stoa_telemetry::metrics::{record_declined, record_file_served, record_resolve_error};
use tracing::{debug, warn};

/// The file a request was answered with, stored in the
/// [`MiddlewareContext`] after a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedFile(pub PathBuf);

/// Middleware that serves files from a root directory.
///
/// # Example
///
/// ```no_run
/// use stoa_middleware::{Pipeline, ServeStatic};
/// use stoa_static::ServeOptions;
///
/// # fn main() -> Result<(), stoa_static::ServeError> {
/// let options = ServeOptions::builder().root("public").gzip(true).build()?;
/// let pipeline = Pipeline::builder().stage(ServeStatic::new(options)).build();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ServeStatic {
    options: Arc<ServeOptions>,
}

impl ServeStatic {
    /// Creates the stage.
    #[must_use]
    pub fn new(options: ServeOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    /// Returns the options the stage serves with.
    #[must_use]
    pub fn options(&self) -> &ServeOptions {
        &self.options
    }

    async fn immediate(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        next: Next<'_>,
    ) -> MiddlewareResult {
        if is_get_or_head(request.method()) {
            let mut response = Response::new(Body::empty());
            if let Some(path) = self.try_send(ctx, &request, &mut response).await? {
                ctx.set_extension(ServedFile(path));
                return Ok(response);
            }
        } else {
            record_declined("method");
        }

        next.run(ctx, request).await
    }

    async fn deferred(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        next: Next<'_>,
    ) -> MiddlewareResult {
        let head = head_of(&request);
        let mut response = next.run(ctx, request).await?;

        if !is_get_or_head(head.method()) {
            record_declined("method");
            return Ok(response);
        }
        if !response.body().is_empty() || response.status() != StatusCode::NOT_FOUND {
            return Ok(response);
        }

        if let Some(path) = self.try_send(ctx, &head, &mut response).await? {
            ctx.set_extension(ServedFile(path));
        }
        Ok(response)
    }

    /// Sends, treating a missing file as "not handled".
    async fn try_send<B>(
        &self,
        ctx: &MiddlewareContext,
        request: &http::Request<B>,
        response: &mut Response,
    ) -> Result<Option<PathBuf>, PipelineError> {
        match send(ctx, request, response, &self.options).await {
            Ok(served) => Ok(served),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => {
                debug!(
                    request_id = %ctx.request_id(),
                    http.path = %request.uri().path(),
                    http.status = err.status_code().as_u16(),
                    "static resolution failed"
                );
                Err(err.into())
            }
        }
    }
}

impl Middleware for ServeStatic {
    fn name(&self) -> &'static str {
        "serve_static"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            if self.options.defer() {
                self.deferred(ctx, request, next).await
            } else {
                self.immediate(ctx, request, next).await
            }
        })
    }
}

/// Resolves `request` and, if a file is found, populates `response` with it.
///
/// On success the response gets status `200`, the file headers, and a
/// streaming body (no body for HEAD). Returns the served path, or `None`
/// when the request was declined (hidden file, directory without index
/// formatting) and `response` is left untouched.
///
/// The method is not checked here; callers decide which methods to serve.
///
/// # Errors
///
/// Every [`ServeError`], including [`ServeError::NotFound`], is returned
/// to the caller.
pub async fn send<B>(
    ctx: &MiddlewareContext,
    request: &http::Request<B>,
    response: &mut Response,
    options: &ServeOptions,
) -> Result<Option<PathBuf>, ServeError> {
    let view = RequestView::from_request(request);
    let file = match resolve(&view, options).await {
        Ok(ResolvedTarget::Serve(file)) => file,
        Ok(ResolvedTarget::NotApplicable) => {
            record_declined("declined");
            return Ok(None);
        }
        Ok(ResolvedTarget::NotFound) => {
            record_declined("not_found");
            return Err(ServeError::NotFound);
        }
        Err(err) => {
            record_resolve_error(err.status_code().as_u16());
            return Err(err);
        }
    };

    let body = if request.method() == Method::HEAD {
        Body::empty()
    } else {
        match tokio::fs::File::open(file.path()).await {
            Ok(handle) => Body::file(handle),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                record_declined("not_found");
                return Err(ServeError::NotFound);
            }
            Err(err) => {
                warn!(file.path = %file.path().display(), error = %err, "failed to open file");
                record_resolve_error(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
                return Err(ServeError::internal(file.path(), err));
            }
        }
    };

    apply_file_headers(response.headers_mut(), &file, options);
    *response.status_mut() = StatusCode::OK;
    *response.body_mut() = body;

    let encoding = file.encoding().map_or("identity", ContentCoding::as_str);
    record_file_served(encoding, file.size());
    debug!(
        request_id = %ctx.request_id(),
        file.path = %file.path().display(),
        encoding,
        size = file.size(),
        "serving file"
    );

    Ok(Some(file.into_path()))
}

fn is_get_or_head(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

/// Copies what resolution needs from a request about to be handed
/// downstream.
fn head_of(request: &Request) -> http::Request<()> {
    let mut head = http::Request::new(());
    *head.method_mut() = request.method().clone();
    *head.uri_mut() = request.uri().clone();
    *head.headers_mut() = request.headers().clone();
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
    use http_body_util::Full;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hello.txt"), "world").unwrap();
        fs::write(dir.path().join("gzip.json"), r#"{ "name": "tobi" }"#).unwrap();
        fs::write(dir.path().join("gzip.json.gz"), [0x1f, 0x8b, 0x08, 0x00]).unwrap();
        fs::create_dir(dir.path().join("world")).unwrap();
        fs::write(dir.path().join("world/index.html"), "html index").unwrap();
        dir
    }

    fn options(dir: &TempDir) -> stoa_static::ServeOptionsBuilder {
        ServeOptions::builder().root(dir.path())
    }

    fn request(method: Method, uri: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn teapot<'a>() -> Next<'a> {
        Next::handler(|_ctx, _req| {
            Box::pin(async {
                let mut response = Response::new(Body::from("downstream"));
                *response.status_mut() = StatusCode::IM_A_TEAPOT;
                Ok(response)
            })
        })
    }

    fn unhandled<'a>() -> Next<'a> {
        Next::handler(|_ctx, _req| {
            Box::pin(async {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::NOT_FOUND;
                Ok(response)
            })
        })
    }

    #[tokio::test]
    async fn test_send_serves_file() {
        let dir = fixture();
        let opts = options(&dir).build().unwrap();
        let ctx = MiddlewareContext::new();
        let mut response = Response::new(Body::empty());

        let served = send(&ctx, &request(Method::GET, "/hello.txt"), &mut response, &opts)
            .await
            .unwrap();

        assert_eq!(served, Some(opts.root().join("hello.txt")));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_LENGTH], "5");
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(response.into_body().to_bytes().await.unwrap(), "world");
    }

    #[tokio::test]
    async fn test_send_head_has_no_body() {
        let dir = fixture();
        let opts = options(&dir).build().unwrap();
        let ctx = MiddlewareContext::new();
        let mut response = Response::new(Body::empty());

        send(&ctx, &request(Method::HEAD, "/hello.txt"), &mut response, &opts)
            .await
            .unwrap();

        assert_eq!(response.headers()[CONTENT_LENGTH], "5");
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_send_missing_file_is_not_found() {
        let dir = fixture();
        let opts = options(&dir).build().unwrap();
        let ctx = MiddlewareContext::new();
        let mut response = Response::new(Body::empty());

        let err = send(&ctx, &request(Method::GET, "/nope.txt"), &mut response, &opts)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_send_prefers_gzip_variant() {
        let dir = fixture();
        let opts = options(&dir).gzip(true).build().unwrap();
        let ctx = MiddlewareContext::new();
        let mut response = Response::new(Body::empty());
        let req = http::Request::builder()
            .uri("/gzip.json")
            .header("accept-encoding", "gzip")
            .body(())
            .unwrap();

        send(&ctx, &req, &mut response, &opts).await.unwrap();

        assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
        assert_eq!(response.headers()[CONTENT_LENGTH], "4");
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_immediate_serves_without_downstream() {
        let dir = fixture();
        let stage = ServeStatic::new(options(&dir).build().unwrap());
        let mut ctx = MiddlewareContext::new();

        let response = stage
            .process(&mut ctx, request(Method::GET, "/hello.txt"), teapot())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(ctx.has_extension::<ServedFile>());
    }

    #[tokio::test]
    async fn test_immediate_delegates_on_miss_and_other_methods() {
        let dir = fixture();
        let stage = ServeStatic::new(options(&dir).build().unwrap());

        let mut ctx = MiddlewareContext::new();
        let response = stage
            .process(&mut ctx, request(Method::GET, "/nope.txt"), teapot())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);

        let mut ctx = MiddlewareContext::new();
        let response = stage
            .process(&mut ctx, request(Method::POST, "/hello.txt"), teapot())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert!(!ctx.has_extension::<ServedFile>());
    }

    #[tokio::test]
    async fn test_immediate_propagates_escape() {
        let dir = fixture();
        let stage = ServeStatic::new(options(&dir).build().unwrap());
        let mut ctx = MiddlewareContext::new();

        let err = stage
            .process(&mut ctx, request(Method::GET, "/../etc/passwd"), teapot())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_deferred_keeps_downstream_response() {
        let dir = fixture();
        let stage = ServeStatic::new(options(&dir).defer(true).build().unwrap());
        let mut ctx = MiddlewareContext::new();

        let response = stage
            .process(&mut ctx, request(Method::GET, "/hello.txt"), teapot())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert!(!ctx.has_extension::<ServedFile>());
    }

    #[tokio::test]
    async fn test_deferred_serves_unhandled() {
        let dir = fixture();
        let stage = ServeStatic::new(options(&dir).defer(true).build().unwrap());
        let mut ctx = MiddlewareContext::new();

        let response = stage
            .process(&mut ctx, request(Method::GET, "/world/"), unhandled())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            ctx.get_extension::<ServedFile>(),
            Some(&ServedFile(stage.options().root().join("world/index.html")))
        );
        assert_eq!(response.into_body().to_bytes().await.unwrap(), "html index");
    }

    #[test]
    fn test_head_of_copies_request_line_and_headers() {
        let req = http::Request::builder()
            .method(Method::HEAD)
            .uri("/a%20b?x=1")
            .header("accept-encoding", "br")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let head = head_of(&req);
        assert_eq!(head.method(), Method::HEAD);
        assert_eq!(head.uri().path(), "/a%20b");
        assert_eq!(head.headers()["accept-encoding"], "br");
    }
}
