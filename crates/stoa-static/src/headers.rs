//! Response header derivation for a resolved file.

use std::path::Path;
use std::time::{Duration, SystemTime};

use http::header::{
    CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED,
};
use http::{HeaderMap, HeaderValue};

use crate::{ResolvedFile, ServeOptions};

const OCTET_STREAM: &str = "application/octet-stream";

/// Derives the `Content-Type` of `path`.
///
/// A trailing `.gz` is stripped first so `data.json.gz` reports as JSON. A
/// `.br` suffix is not stripped. Text types, JSON and JavaScript carry
/// `charset=utf-8`.
///
/// ```
/// use std::path::Path;
/// use stoa_static::headers::content_type;
///
/// assert_eq!(content_type(Path::new("a.json.gz")), "application/json; charset=utf-8");
/// assert_eq!(content_type(Path::new("hello")), "application/octet-stream");
/// ```
#[must_use]
pub fn content_type(path: &Path) -> HeaderValue {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let name = match name.strip_suffix(".gz") {
        Some(stem) if !stem.is_empty() => stem,
        _ => name.as_ref(),
    };

    let ext = Path::new(name).extension().and_then(|ext| ext.to_str());
    let value = match ext.and_then(|ext| mime_guess::from_ext(ext).first()) {
        Some(mime) if wants_charset(&mime) => format!("{mime}; charset=utf-8"),
        Some(mime) => mime.to_string(),
        None => OCTET_STREAM.to_string(),
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM))
}

fn wants_charset(mime: &mime_guess::Mime) -> bool {
    if mime.get_param(mime_guess::mime::CHARSET).is_some() {
        return false;
    }
    mime.type_() == mime_guess::mime::TEXT
        || matches!(mime.essence_str(), "application/json" | "application/javascript")
}

/// Formats a `Cache-Control` value, rounding the age up to whole seconds.
///
/// ```
/// use std::time::Duration;
/// use stoa_static::headers::cache_control;
///
/// assert_eq!(cache_control(Duration::from_millis(5000), false), "max-age=5");
/// assert_eq!(cache_control(Duration::from_millis(1234), true), "max-age=2,immutable");
/// ```
#[must_use]
pub fn cache_control(max_age: Duration, immutable: bool) -> String {
    let seconds = max_age.as_millis().div_ceil(1000);
    if immutable {
        format!("max-age={seconds},immutable")
    } else {
        format!("max-age={seconds}")
    }
}

/// Writes the headers for serving `file`.
///
/// Order matters:
///
/// 1. any stale `Content-Length` is removed;
/// 2. `Content-Encoding` is set for a pre-compressed variant;
/// 3. the `set_headers` hook runs;
/// 4. `Content-Length` is set to the selected file's size, overriding the hook;
/// 5. `Last-Modified` and `Cache-Control` are set only when still absent,
///    and `Last-Modified` is skipped for modification times before 1970;
/// 6. `Content-Type` is always set.
pub fn apply_file_headers(headers: &mut HeaderMap, file: &ResolvedFile, options: &ServeOptions) {
    headers.remove(CONTENT_LENGTH);

    if let Some(coding) = file.encoding() {
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static(coding.as_str()));
    }

    if let Some(hook) = options.set_headers() {
        hook(headers, file.path(), file.metadata());
    }

    headers.insert(CONTENT_LENGTH, HeaderValue::from(file.size()));

    if !headers.contains_key(LAST_MODIFIED) {
        // httpdate cannot format times before the epoch
        if let Some(modified) = file
            .modified()
            .filter(|modified| modified.duration_since(SystemTime::UNIX_EPOCH).is_ok())
        {
            let formatted = httpdate::fmt_http_date(modified);
            if let Ok(value) = HeaderValue::from_str(&formatted) {
                headers.insert(LAST_MODIFIED, value);
            }
        }
    }

    if !headers.contains_key(CACHE_CONTROL) {
        let value = cache_control(options.max_age(), options.immutable());
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(CACHE_CONTROL, value);
        }
    }

    headers.insert(CONTENT_TYPE, content_type(file.path()));
}
