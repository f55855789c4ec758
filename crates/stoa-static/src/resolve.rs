//! Request path to file resolution.
//!
//! [`resolve`] turns a [`RequestView`] into a [`ResolvedTarget`]:
//!
//! 1. strip the leading root and percent-decode the path;
//! 2. append the index file when the raw path ends with `/`;
//! 3. validate containment against the root ([`resolve_path`]);
//! 4. decline hidden paths unless allowed;
//! 5. switch to a `.br` or `.gz` sibling the client prefers;
//! 6. try fallback extensions for extension-less paths;
//! 7. stat, formatting directories to their index when enabled.
//!
//! Filesystem probes go through `tokio::fs`, which runs them on the blocking
//! pool so a slow disk never stalls the reactor.

use std::fs::Metadata;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use http::Method;
use tracing::debug;

use crate::encoding::{AcceptEncoding, ContentCoding};
use crate::path::{append_suffix, decode_path, has_extension, is_hidden, resolve_path, strip_root};
use crate::{ServeError, ServeOptions};

/// The parts of a request the resolver looks at.
#[derive(Debug, Clone)]
pub struct RequestView<'a> {
    path: &'a str,
    method: &'a Method,
    accept_encoding: AcceptEncoding,
}

impl<'a> RequestView<'a> {
    /// Creates a view from its parts. `path` is the raw, still
    /// percent-encoded URL path.
    #[must_use]
    pub fn new(path: &'a str, method: &'a Method, accept_encoding: AcceptEncoding) -> Self {
        Self {
            path,
            method,
            accept_encoding,
        }
    }

    /// Projects an HTTP request.
    #[must_use]
    pub fn from_request<B>(request: &'a http::Request<B>) -> Self {
        Self {
            path: request.uri().path(),
            method: request.method(),
            accept_encoding: AcceptEncoding::from_headers(request.headers()),
        }
    }

    /// Raw URL path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.method
    }

    /// Parsed `Accept-Encoding` preferences.
    #[must_use]
    pub fn accept_encoding(&self) -> &AcceptEncoding {
        &self.accept_encoding
    }

    /// Only `GET` and `HEAD` are ever served.
    #[must_use]
    pub fn is_get_or_head(&self) -> bool {
        *self.method == Method::GET || *self.method == Method::HEAD
    }
}

/// A file chosen for serving.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    path: PathBuf,
    metadata: Metadata,
    encoding: Option<ContentCoding>,
}

impl ResolvedFile {
    /// Absolute path of the selected file (the `.br`/`.gz` sibling when a
    /// variant was chosen).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Metadata of the selected file.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Pre-compressed coding, if a variant was chosen.
    #[must_use]
    pub fn encoding(&self) -> Option<ContentCoding> {
        self.encoding
    }

    /// Size in bytes of the selected file.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.metadata.len()
    }

    /// Modification time, where the platform reports one.
    #[must_use]
    pub fn modified(&self) -> Option<SystemTime> {
        self.metadata.modified().ok()
    }

    /// Consumes the file, returning its path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Outcome of resolving one request.
#[derive(Debug, Clone)]
pub enum ResolvedTarget {
    /// Serve this file.
    Serve(ResolvedFile),
    /// Declined by policy (hidden path, directory without index formatting).
    NotApplicable,
    /// Nothing exists at the resolved path.
    NotFound,
}

impl ResolvedTarget {
    /// Returns the file to serve, if any.
    #[must_use]
    pub fn file(&self) -> Option<&ResolvedFile> {
        match self {
            Self::Serve(file) => Some(file),
            Self::NotApplicable | Self::NotFound => None,
        }
    }
}

/// Resolves a request against `options`.
///
/// # Errors
///
/// - [`ServeError::Decode`] for malformed percent escapes
/// - [`ServeError::MaliciousPath`] for NUL bytes and absolute paths
/// - [`ServeError::PathEscape`] for paths climbing above the root
/// - [`ServeError::Internal`] for unexpected stat failures
pub async fn resolve(
    view: &RequestView<'_>,
    options: &ServeOptions,
) -> Result<ResolvedTarget, ServeError> {
    let raw = view.path();
    let mut relative = decode_path(strip_root(raw))?;

    if raw.ends_with('/') {
        if let Some(index) = options.index() {
            relative.push_str(index);
        }
    }

    let mut path = resolve_path(options.root(), &relative)?;

    if !options.hidden() && is_hidden(options.root(), &path) {
        debug!(http.path = %raw, "declining hidden path");
        return Ok(ResolvedTarget::NotApplicable);
    }

    let mut encoding = None;
    for coding in [ContentCoding::Brotli, ContentCoding::Gzip] {
        let enabled = match coding {
            ContentCoding::Brotli => options.brotli(),
            ContentCoding::Gzip => options.gzip(),
        };
        if !enabled || !view.accept_encoding().prefers(coding) {
            continue;
        }
        let candidate = append_suffix(&path, coding.suffix());
        if exists(&candidate).await {
            debug!(file.path = %candidate.display(), encoding = coding.as_str(), "serving pre-compressed variant");
            path = candidate;
            encoding = Some(coding);
            break;
        }
    }

    if let Some(extensions) = options.extensions() {
        if !has_extension(&path) {
            for ext in extensions {
                let candidate = append_suffix(&path, ext);
                if exists(&candidate).await {
                    path = candidate;
                    break;
                }
            }
        }
    }

    let mut metadata = match stat(&path).await? {
        Some(metadata) => metadata,
        None => {
            debug!(http.path = %raw, file.path = %path.display(), "file not found");
            return Ok(ResolvedTarget::NotFound);
        }
    };

    if metadata.is_dir() {
        let Some(index) = options.index().filter(|_| options.format()) else {
            debug!(http.path = %raw, "declining directory");
            return Ok(ResolvedTarget::NotApplicable);
        };
        path.push(index);
        metadata = match stat(&path).await? {
            Some(metadata) if !metadata.is_dir() => metadata,
            Some(_) => return Ok(ResolvedTarget::NotApplicable),
            None => return Ok(ResolvedTarget::NotFound),
        };
    }

    Ok(ResolvedTarget::Serve(ResolvedFile {
        path,
        metadata,
        encoding,
    }))
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Stats `path`, mapping "no such file" shaped failures to `None`.
async fn stat(path: &Path) -> Result<Option<Metadata>, ServeError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(Some(metadata)),
        Err(err) => stat_failure(path, err).map(|()| None),
    }
}

/// Missing files, overlong names and file-as-directory paths are absent;
/// anything else is an internal error.
fn stat_failure(path: &Path, err: io::Error) -> Result<(), ServeError> {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::NotADirectory | ErrorKind::InvalidFilename => Ok(()),
        _ => {
            tracing::warn!(file.path = %path.display(), error = %err, "stat failed");
            Err(ServeError::internal(path, err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();

        fs::write(dir.path().join("hello.txt"), "world").unwrap();
        fs::write(dir.path().join("user.json"), r#"{ "name": "tobi" }"#).unwrap();
        fs::write(dir.path().join("gzip.json"), r#"{ "name": "tobi" }"#).unwrap();
        fs::write(dir.path().join("gzip.json.gz"), [0x1f, 0x8b, 0x08, 0x00]).unwrap();
        fs::write(dir.path().join("gzip.json.br"), [0x0b, 0x08, 0x80]).unwrap();
        fs::write(dir.path().join(".hidden"), "secret").unwrap();

        let world = dir.path().join("world");
        fs::create_dir(&world).unwrap();
        fs::write(world.join("index.html"), "html index").unwrap();

        dir
    }

    fn builder(dir: &TempDir) -> crate::ServeOptionsBuilder {
        ServeOptions::builder().root(dir.path())
    }

    async fn run(path: &str, accept: Option<&str>, options: &ServeOptions) -> Result<ResolvedTarget, ServeError> {
        let method = Method::GET;
        let view = RequestView::new(path, &method, AcceptEncoding::parse(accept));
        resolve(&view, options).await
    }

    fn served(target: &ResolvedTarget) -> &ResolvedFile {
        target.file().expect("expected a file to serve")
    }

    #[tokio::test]
    async fn test_serves_plain_file() {
        let dir = create_test_dir();
        let options = builder(&dir).build().unwrap();

        let target = run("/hello.txt", None, &options).await.unwrap();
        let file = served(&target);
        assert_eq!(file.path(), options.root().join("hello.txt"));
        assert_eq!(file.size(), 5);
        assert!(file.encoding().is_none());
        assert!(file.modified().is_some());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = create_test_dir();
        let options = builder(&dir).build().unwrap();

        let target = run("/hello1.txt", None, &options).await.unwrap();
        assert!(matches!(target, ResolvedTarget::NotFound));

        // a file used as a directory
        let target = run("/hello.txt/nope", None, &options).await.unwrap();
        assert!(matches!(target, ResolvedTarget::NotFound));
    }

    #[tokio::test]
    async fn test_overlong_segment_is_not_found() {
        let dir = create_test_dir();
        let options = builder(&dir).build().unwrap();

        let path = format!("/{}", "a".repeat(300));
        let target = run(&path, None, &options).await.unwrap();
        assert!(matches!(target, ResolvedTarget::NotFound));
    }

    #[test]
    fn test_stat_failure_classification() {
        let path = Path::new("/srv/site/file.txt");
        for kind in [ErrorKind::NotFound, ErrorKind::NotADirectory, ErrorKind::InvalidFilename] {
            assert!(stat_failure(path, io::Error::from(kind)).is_ok(), "{kind:?}");
        }

        let err = stat_failure(path, io::Error::from(ErrorKind::PermissionDenied)).unwrap_err();
        assert!(matches!(err, ServeError::Internal { .. }));
        assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_exposable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_directory_is_internal() {
        use std::os::unix::fs::PermissionsExt;

        let dir = create_test_dir();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("inner.txt"), "x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // privileged users bypass permission bits
        let privileged = fs::metadata(locked.join("inner.txt")).is_ok();
        let options = builder(&dir).build().unwrap();
        let result = run("/locked/inner.txt", None, &options).await;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if privileged {
            assert!(result.unwrap().file().is_some());
        } else {
            let err = result.unwrap_err();
            assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test]
    async fn test_path_errors() {
        let dir = create_test_dir();
        let options = builder(&dir).build().unwrap();

        assert!(matches!(run("/%", None, &options).await, Err(ServeError::Decode)));
        assert!(matches!(run("/../hello.txt", None, &options).await, Err(ServeError::PathEscape)));
        assert!(matches!(run("/%2e%2e/x", None, &options).await, Err(ServeError::PathEscape)));
        assert!(matches!(run("//etc/passwd", None, &options).await, Err(ServeError::MaliciousPath)));
        assert!(matches!(run("/a%00b", None, &options).await, Err(ServeError::MaliciousPath)));
    }

    #[tokio::test]
    async fn test_trailing_slash_appends_index() {
        let dir = create_test_dir();
        let options = builder(&dir).build().unwrap();

        let target = run("/world/", None, &options).await.unwrap();
        assert_eq!(served(&target).path(), options.root().join("world/index.html"));
    }

    #[tokio::test]
    async fn test_directory_without_format_is_declined() {
        let dir = create_test_dir();
        let options = builder(&dir).build().unwrap();

        let target = run("/world", None, &options).await.unwrap();
        assert!(matches!(target, ResolvedTarget::NotApplicable));
    }

    #[tokio::test]
    async fn test_directory_with_format_serves_index() {
        let dir = create_test_dir();
        let options = builder(&dir).format(true).build().unwrap();

        let target = run("/world", None, &options).await.unwrap();
        assert_eq!(served(&target).size(), 10);

        let options = builder(&dir).format(true).no_index().build().unwrap();
        let target = run("/world", None, &options).await.unwrap();
        assert!(matches!(target, ResolvedTarget::NotApplicable));
    }

    #[tokio::test]
    async fn test_hidden_files() {
        let dir = create_test_dir();
        let options = builder(&dir).build().unwrap();
        let target = run("/.hidden", None, &options).await.unwrap();
        assert!(matches!(target, ResolvedTarget::NotApplicable));

        let options = builder(&dir).hidden(true).build().unwrap();
        let target = run("/.hidden", None, &options).await.unwrap();
        assert_eq!(served(&target).size(), 6);
    }

    #[tokio::test]
    async fn test_encoding_priority() {
        let dir = create_test_dir();
        let options = builder(&dir).build().unwrap();

        let target = run("/gzip.json", Some("br, gzip, identity"), &options).await.unwrap();
        assert_eq!(served(&target).encoding(), Some(ContentCoding::Brotli));
        assert!(served(&target).path().ends_with("gzip.json.br"));

        let target = run("/gzip.json", Some("gzip, identity"), &options).await.unwrap();
        assert_eq!(served(&target).encoding(), Some(ContentCoding::Gzip));
        assert_eq!(served(&target).size(), 4);

        let target = run("/gzip.json", Some("identity"), &options).await.unwrap();
        assert!(served(&target).encoding().is_none());
        assert_eq!(served(&target).size(), 18);
    }

    #[tokio::test]
    async fn test_disabled_variants_are_skipped() {
        let dir = create_test_dir();
        let options = builder(&dir).brotli(false).build().unwrap();
        let target = run("/gzip.json", Some("br, gzip"), &options).await.unwrap();
        assert_eq!(served(&target).encoding(), Some(ContentCoding::Gzip));

        let options = builder(&dir).brotli(false).gzip(false).build().unwrap();
        let target = run("/gzip.json", Some("br, gzip"), &options).await.unwrap();
        assert!(served(&target).encoding().is_none());
    }

    #[tokio::test]
    async fn test_extension_fallback() {
        let dir = create_test_dir();

        let options = builder(&dir).build().unwrap();
        assert!(matches!(run("/hello", None, &options).await.unwrap(), ResolvedTarget::NotFound));

        let options = builder(&dir).extensions(["json", "txt"]).build().unwrap();
        let target = run("/user", None, &options).await.unwrap();
        assert!(served(&target).path().ends_with("user.json"));

        let target = run("/hello", None, &options).await.unwrap();
        assert!(served(&target).path().ends_with("hello.txt"));
    }

    #[tokio::test]
    async fn test_resolution_is_repeatable() {
        let dir = create_test_dir();
        let options = builder(&dir).build().unwrap();

        let first = run("/gzip.json", Some("gzip"), &options).await.unwrap();
        let second = run("/gzip.json", Some("gzip"), &options).await.unwrap();
        assert_eq!(served(&first).path(), served(&second).path());
        assert_eq!(served(&first).size(), served(&second).size());
        assert_eq!(served(&first).encoding(), served(&second).encoding());
    }

    #[test]
    fn test_request_view_from_request() {
        let request = http::Request::builder()
            .method(Method::HEAD)
            .uri("/a%20b.txt?x=1")
            .header(http::header::ACCEPT_ENCODING, "br")
            .body(())
            .unwrap();
        let view = RequestView::from_request(&request);
        assert_eq!(view.path(), "/a%20b.txt");
        assert!(view.is_get_or_head());
        assert!(view.accept_encoding().prefers(ContentCoding::Brotli));
    }
}
