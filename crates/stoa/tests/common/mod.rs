//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use http::header::HeaderName;
use http::{Method, StatusCode};
use http_body_util::Full;
use stoa_middleware::{send, Body, MiddlewareContext, Request, Response};
use stoa_static::{ServeError, ServeOptions};
use tempfile::TempDir;

pub const USER_JSON: &str = r#"{ "name": "tobi" }"#;

/// Size of the stand-in `.gz` variant. The server never inspects contents.
pub const GZIP_VARIANT_LEN: usize = 48;
/// Size of the stand-in `.br` variant.
pub const BROTLI_VARIANT_LEN: usize = 22;

/// A temporary tree shaped like a small site:
///
/// ```text
/// <tmp>/
///   fixtures/
///     hello.txt            "world"
///     index.txt            "text index"
///     user.json            { "name": "tobi" }
///     gzip.json            { "name": "tobi" }
///     gzip.json.gz         48 bytes
///     gzip.json.br         22 bytes
///     .hidden              "secret"
///     .private/id_rsa.txt  "key"
///     world/index.html     "html index"
/// ```
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let fixtures = dir.path().join("fixtures");
        fs::create_dir_all(fixtures.join("world")).unwrap();
        fs::create_dir_all(fixtures.join(".private")).unwrap();

        fs::write(fixtures.join("hello.txt"), "world").unwrap();
        fs::write(fixtures.join("index.txt"), "text index").unwrap();
        fs::write(fixtures.join("user.json"), USER_JSON).unwrap();
        fs::write(fixtures.join("gzip.json"), USER_JSON).unwrap();
        fs::write(fixtures.join("gzip.json.gz"), vec![0x1f; GZIP_VARIANT_LEN]).unwrap();
        fs::write(fixtures.join("gzip.json.br"), vec![0x0b; BROTLI_VARIANT_LEN]).unwrap();
        fs::write(fixtures.join(".hidden"), "secret").unwrap();
        fs::write(fixtures.join(".private/id_rsa.txt"), "key").unwrap();
        fs::write(fixtures.join("world/index.html"), "html index").unwrap();

        Self { dir }
    }

    /// The temporary directory, playing the role of a `test/` folder.
    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    pub fn fixtures(&self) -> PathBuf {
        self.dir.path().join("fixtures")
    }
}

pub fn request(method: Method, uri: &str) -> Request {
    request_with(method, uri, &[])
}

pub fn request_with(method: Method, uri: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = http::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(HeaderName::from_bytes(name.as_bytes()).unwrap(), *value);
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

/// What a host that turns errors into their status would answer.
pub struct Sent {
    pub status: StatusCode,
    pub path: Option<PathBuf>,
    pub response: Response,
}

impl Sent {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response
            .headers()
            .get(name)
            .map(|value| value.to_str().unwrap())
    }

    pub async fn text(self) -> String {
        let bytes = self.response.into_body().to_bytes().await.unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub async fn body_len(self) -> usize {
        self.response.into_body().to_bytes().await.unwrap().len()
    }
}

/// Calls `send` directly and maps the outcome to a status: a served file is
/// 200, a declined request 404, an error its own status.
pub async fn send_request(options: &ServeOptions, request: &Request) -> Sent {
    let ctx = MiddlewareContext::new();
    let mut response = Response::new(Body::empty());
    let outcome: Result<Option<PathBuf>, ServeError> =
        send(&ctx, request, &mut response, options).await;

    let (status, path) = match outcome {
        Ok(Some(path)) => (StatusCode::OK, Some(path)),
        Ok(None) => (StatusCode::NOT_FOUND, None),
        Err(err) => (err.status_code(), None),
    };
    Sent {
        status,
        path,
        response,
    }
}

pub async fn get(options: &ServeOptions, uri: &str) -> Sent {
    send_request(options, &request(Method::GET, uri)).await
}

pub async fn get_with(options: &ServeOptions, uri: &str, headers: &[(&str, &str)]) -> Sent {
    send_request(options, &request_with(Method::GET, uri, headers)).await
}
