//! Error taxonomy for file resolution.

use std::io;
use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

/// Errors that can occur while resolving a request path to a file.
///
/// Every variant maps to exactly one HTTP status through
/// [`ServeError::status_code`]. Declining to handle a request (hidden file,
/// directory without index formatting) is not an error; see
/// [`ResolvedTarget::NotApplicable`](crate::ResolvedTarget::NotApplicable).
#[derive(Debug, Error)]
pub enum ServeError {
    /// The request path contains a malformed percent escape or decodes to
    /// invalid UTF-8.
    #[error("failed to decode")]
    Decode,

    /// The decoded path is absolute, carries a drive prefix, or embeds a NUL
    /// byte.
    #[error("malicious path")]
    MaliciousPath,

    /// The decoded path climbs above the root directory.
    #[error("path escapes the root directory")]
    PathEscape,

    /// No file exists at the resolved path.
    #[error("file not found")]
    NotFound,

    /// Unexpected I/O failure while probing the filesystem.
    #[error("failed to stat {path}")]
    Internal {
        /// Path that was being probed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The configured root directory cannot be made absolute.
    #[error("invalid root directory {path}")]
    InvalidRoot {
        /// Root as configured.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl ServeError {
    /// Create a new internal error for `path`.
    pub fn internal(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Internal {
            path: path.into(),
            source,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode | Self::MaliciousPath => StatusCode::BAD_REQUEST,
            Self::PathEscape => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal { .. } | Self::InvalidRoot { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns true for 404-class errors, which callers treat as "not handled".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code() == StatusCode::NOT_FOUND
    }

    /// Whether the message is safe to show to a client.
    ///
    /// Client errors carry no filesystem detail; server errors do.
    #[must_use]
    pub fn is_exposable(&self) -> bool {
        self.status_code().is_client_error()
    }
}
