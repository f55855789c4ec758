//! Path utilities: root stripping, strict decoding and containment checks.
//!
//! Both `/` and `\` are treated as separators everywhere so that a request
//! path can never smuggle a traversal through the "other" platform's
//! separator.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::ServeError;

/// Returns true for either path separator.
fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Returns true when `path` starts with a `X:` drive prefix.
fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Removes the leading root separator from a request path.
///
/// Only a single separator is removed: `//etc/passwd` keeps a rooted
/// remainder, which [`resolve_path`] then rejects.
///
/// # Example
///
/// ```
/// use stoa_static::path::strip_root;
///
/// assert_eq!(strip_root("/hello.txt"), "hello.txt");
/// assert_eq!(strip_root("//etc"), "/etc");
/// assert_eq!(strip_root("plain"), "plain");
/// ```
#[must_use]
pub fn strip_root(path: &str) -> &str {
    path.strip_prefix(is_separator).unwrap_or(path)
}

/// Strictly percent-decodes a request path.
///
/// Every `%` must be followed by two hex digits and the decoded bytes must
/// be valid UTF-8; `+` is left untouched.
///
/// # Errors
///
/// Returns [`ServeError::Decode`] for malformed escapes or invalid UTF-8.
pub fn decode_path(path: &str) -> Result<String, ServeError> {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(ServeError::Decode);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(path)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ServeError::Decode)
}

/// Resolves a decoded relative path against `root`, failing closed.
///
/// Checks run against the relative path before it is joined, in order:
///
/// 1. an embedded NUL byte is [`ServeError::MaliciousPath`];
/// 2. a rooted path (`/x`, `\x`) or a drive prefix (`C:`) is
///    [`ServeError::MaliciousPath`];
/// 3. after lexical normalization, any `..` that would climb above the
///    root is [`ServeError::PathEscape`].
///
/// The returned path is always `root` followed by normal segments only.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use stoa_static::path::resolve_path;
///
/// let root = Path::new("/srv/www");
/// assert_eq!(
///     resolve_path(root, "a/./b/../c.txt").unwrap(),
///     Path::new("/srv/www/a/c.txt")
/// );
/// assert!(resolve_path(root, "../secret").is_err());
/// ```
pub fn resolve_path(root: &Path, relative: &str) -> Result<PathBuf, ServeError> {
    if relative.contains('\0') {
        return Err(ServeError::MaliciousPath);
    }
    if relative.starts_with(is_separator) || has_drive_prefix(relative) {
        return Err(ServeError::MaliciousPath);
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in relative.split(is_separator) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(ServeError::PathEscape);
                }
            }
            name => segments.push(name),
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(segments);
    Ok(resolved)
}

/// Returns true when any segment of `path` below `root` starts with a dot.
#[must_use]
pub fn is_hidden(root: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|component| match component {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Returns true when the final segment of `path` contains a dot.
#[must_use]
pub fn has_extension(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().contains('.'))
}

/// Ensures an extension starts with a dot.
///
/// ```
/// use stoa_static::path::normalize_extension;
///
/// assert_eq!(normalize_extension("html"), ".html");
/// assert_eq!(normalize_extension(".txt"), ".txt");
/// ```
#[must_use]
pub fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

/// Appends a raw suffix (such as `.gz`) to the final segment of `path`.
#[must_use]
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Collapses `.` and `..` lexically without touching the filesystem.
///
/// `..` at the root stays at the root; symlinks are not followed.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                );
                if !at_root {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
