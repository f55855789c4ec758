//! Request and response types used throughout the pipeline.

use crate::body::Body;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;

/// The HTTP request type used in the pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the pipeline.
pub type Response = http::Response<Body>;

/// Constructors for common responses.
pub trait ResponseExt {
    /// Creates the response a pipeline returns when nothing handled the
    /// request: `404 Not Found` with no body.
    fn unhandled() -> Response;

    /// Creates a plain text error response.
    fn error(status: StatusCode, message: &str) -> Response;

    /// Creates a JSON error response.
    fn json_error(status: StatusCode, code: &str, message: &str, request_id: &str) -> Response;
}

impl ResponseExt for Response {
    fn unhandled() -> Response {
        with_status(StatusCode::NOT_FOUND, Body::empty())
    }

    fn error(status: StatusCode, message: &str) -> Response {
        let mut response = with_status(status, Body::from(message.to_string()));
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    fn json_error(status: StatusCode, code: &str, message: &str, request_id: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message,
                "request_id": request_id
            }
        });

        let mut response = with_status(status, Body::from(body.to_string()));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

fn with_status(status: StatusCode, body: Body) -> Response {
    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    response
}
