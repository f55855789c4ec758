//! Immutable serving options and their builder.

use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;

use crate::path::{normalize_extension, normalize_lexically};
use crate::ServeError;

/// Hook invoked with the response headers, the resolved path and its
/// metadata before the standard file headers are written.
pub type SetHeaders = Arc<dyn Fn(&mut HeaderMap, &Path, &Metadata) + Send + Sync>;

/// Default index file name.
pub const DEFAULT_INDEX: &str = "index.html";

/// Options controlling how files are resolved and served.
///
/// Built once through [`ServeOptions::builder`]; the root directory is made
/// absolute at that point and never consulted again from the process
/// environment.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use stoa_static::ServeOptions;
///
/// let options = ServeOptions::builder()
///     .root("/srv/www")
///     .max_age(Duration::from_secs(3600))
///     .extensions(["html"])
///     .build()
///     .unwrap();
///
/// assert_eq!(options.index(), Some("index.html"));
/// assert_eq!(options.extensions(), Some(&[".html".to_string()][..]));
/// ```
#[derive(Clone)]
pub struct ServeOptions {
    root: PathBuf,
    index: Option<String>,
    defer: bool,
    max_age: Duration,
    immutable: bool,
    hidden: bool,
    format: bool,
    extensions: Option<Vec<String>>,
    brotli: bool,
    gzip: bool,
    set_headers: Option<SetHeaders>,
}

impl ServeOptions {
    /// Creates a new options builder with default values.
    #[must_use]
    pub fn builder() -> ServeOptionsBuilder {
        ServeOptionsBuilder::new()
    }

    /// Default options rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ServeError> {
        Self::builder().root(root).build()
    }

    /// Absolute, normalized root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Index file name, or `None` when index files are disabled.
    #[must_use]
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Whether downstream handlers run before a file is served.
    #[must_use]
    pub fn defer(&self) -> bool {
        self.defer
    }

    /// `Cache-Control` max age.
    #[must_use]
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Whether `Cache-Control` carries `immutable`.
    #[must_use]
    pub fn immutable(&self) -> bool {
        self.immutable
    }

    /// Whether dot-files and dot-directories may be served.
    #[must_use]
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// Whether a directory requested without a trailing slash serves its index.
    #[must_use]
    pub fn format(&self) -> bool {
        self.format
    }

    /// Fallback extensions (each with a leading dot), or `None` when disabled.
    #[must_use]
    pub fn extensions(&self) -> Option<&[String]> {
        self.extensions.as_deref()
    }

    /// Whether `.br` siblings are considered.
    #[must_use]
    pub fn brotli(&self) -> bool {
        self.brotli
    }

    /// Whether `.gz` siblings are considered.
    #[must_use]
    pub fn gzip(&self) -> bool {
        self.gzip
    }

    /// Header hook, if any.
    #[must_use]
    pub fn set_headers(&self) -> Option<&SetHeaders> {
        self.set_headers.as_ref()
    }
}

impl fmt::Debug for ServeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeOptions")
            .field("root", &self.root)
            .field("index", &self.index)
            .field("defer", &self.defer)
            .field("max_age", &self.max_age)
            .field("immutable", &self.immutable)
            .field("hidden", &self.hidden)
            .field("format", &self.format)
            .field("extensions", &self.extensions)
            .field("brotli", &self.brotli)
            .field("gzip", &self.gzip)
            .field("set_headers", &self.set_headers.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Builder for [`ServeOptions`].
#[derive(Clone)]
pub struct ServeOptionsBuilder {
    root: PathBuf,
    index: Option<String>,
    defer: bool,
    max_age: Duration,
    immutable: bool,
    hidden: bool,
    format: bool,
    extensions: Option<Vec<String>>,
    brotli: bool,
    gzip: bool,
    set_headers: Option<SetHeaders>,
}

impl ServeOptionsBuilder {
    /// Creates a builder rooted at the current directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("."),
            index: Some(DEFAULT_INDEX.to_string()),
            defer: false,
            max_age: Duration::ZERO,
            immutable: false,
            hidden: false,
            format: false,
            extensions: None,
            brotli: true,
            gzip: true,
            set_headers: None,
        }
    }

    /// Sets the root directory. Relative roots resolve against the working
    /// directory at [`build`](Self::build) time.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets the index file name. An empty name disables index files.
    #[must_use]
    pub fn index(mut self, index: impl Into<String>) -> Self {
        let index = index.into();
        self.index = (!index.is_empty()).then_some(index);
        self
    }

    /// Disables index files.
    #[must_use]
    pub fn no_index(mut self) -> Self {
        self.index = None;
        self
    }

    /// Lets downstream handlers respond first.
    #[must_use]
    pub fn defer(mut self, defer: bool) -> Self {
        self.defer = defer;
        self
    }

    /// Sets the `Cache-Control` max age (rounded up to whole seconds).
    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Adds `immutable` to `Cache-Control`.
    #[must_use]
    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = immutable;
        self
    }

    /// Allows serving dot-files.
    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Serves `dir/index` for `dir` requested without a trailing slash.
    #[must_use]
    pub fn format(mut self, format: bool) -> Self {
        self.format = format;
        self
    }

    /// Sets fallback extensions tried, in order, for extension-less paths.
    /// Leading dots are optional; an empty list disables the fallback.
    #[must_use]
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self.extensions = (!extensions.is_empty()).then_some(extensions);
        self
    }

    /// Disables fallback extensions.
    #[must_use]
    pub fn no_extensions(mut self) -> Self {
        self.extensions = None;
        self
    }

    /// Enables or disables `.br` siblings.
    #[must_use]
    pub fn brotli(mut self, brotli: bool) -> Self {
        self.brotli = brotli;
        self
    }

    /// Enables or disables `.gz` siblings.
    #[must_use]
    pub fn gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Installs a header hook.
    #[must_use]
    pub fn set_headers<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut HeaderMap, &Path, &Metadata) + Send + Sync + 'static,
    {
        self.set_headers = Some(Arc::new(hook));
        self
    }

    /// Builds the options, resolving the root to an absolute path.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::InvalidRoot`] if the root cannot be made
    /// absolute (for example an empty path).
    pub fn build(self) -> Result<ServeOptions, ServeError> {
        let absolute = std::path::absolute(&self.root).map_err(|source| ServeError::InvalidRoot {
            path: self.root.clone(),
            source,
        })?;

        Ok(ServeOptions {
            root: normalize_lexically(&absolute),
            index: self.index,
            defer: self.defer,
            max_age: self.max_age,
            immutable: self.immutable,
            hidden: self.hidden,
            format: self.format,
            extensions: self.extensions,
            brotli: self.brotli,
            gzip: self.gzip,
            set_headers: self.set_headers,
        })
    }
}

impl Default for ServeOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
