//! `Accept-Encoding` negotiation for pre-compressed variants.
//!
//! Parsing follows RFC 9110 section 12.5.3: codings carry an optional
//! `q` weight, `*` matches any coding, and `identity` is acceptable unless
//! it (or `*`) is explicitly listed with `q=0`.

use http::header::ACCEPT_ENCODING;
use http::HeaderMap;

/// A pre-compressed variant the resolver knows how to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCoding {
    /// Brotli (`br`), served from a `.br` sibling.
    Brotli,
    /// Gzip (`gzip`), served from a `.gz` sibling.
    Gzip,
}

impl ContentCoding {
    /// Returns the `Content-Encoding` token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gzip",
        }
    }

    /// Returns the file suffix of the pre-compressed sibling.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Brotli => ".br",
            Self::Gzip => ".gz",
        }
    }

    /// Candidates this coding must beat to be chosen.
    const fn candidates(self) -> [&'static str; 3] {
        [self.as_str(), "deflate", "identity"]
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Coding {
    name: String,
    q: f32,
    order: usize,
}

/// Parsed `Accept-Encoding` preferences.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptEncoding {
    codings: Vec<Coding>,
}

impl AcceptEncoding {
    /// Parses an `Accept-Encoding` header value.
    ///
    /// A missing or empty header accepts only `identity`.
    ///
    /// # Example
    ///
    /// ```
    /// use stoa_static::AcceptEncoding;
    ///
    /// let accept = AcceptEncoding::parse(Some("gzip;q=0.8, br"));
    /// assert_eq!(accept.preferred(&["gzip", "br"]), Some("br"));
    ///
    /// let none = AcceptEncoding::parse(None);
    /// assert_eq!(none.preferred(&["br", "identity"]), Some("identity"));
    /// ```
    #[must_use]
    pub fn parse(header: Option<&str>) -> Self {
        let mut codings = Vec::new();
        let mut has_identity = false;
        let mut min_quality = 1.0_f32;

        for part in header.unwrap_or("").split(',') {
            let mut params = part.split(';');
            let name = params.next().unwrap_or("").trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                continue;
            }

            let q = params
                .filter_map(|param| {
                    let (key, value) = param.split_once('=')?;
                    key.trim()
                        .eq_ignore_ascii_case("q")
                        .then(|| value.trim().parse::<f32>().ok())
                        .flatten()
                })
                .next()
                .map_or(1.0, |q| q.clamp(0.0, 1.0));

            let name = name.to_ascii_lowercase();
            has_identity |= name == "identity" || name == "*";
            if q > 0.0 {
                min_quality = min_quality.min(q);
            }
            codings.push(Coding {
                name,
                q,
                order: codings.len(),
            });
        }

        if !has_identity {
            codings.push(Coding {
                name: "identity".to_string(),
                q: min_quality,
                order: codings.len(),
            });
        }

        Self { codings }
    }

    /// Parses the (possibly repeated) `Accept-Encoding` header of a request.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let values: Vec<&str> = headers
            .get_all(ACCEPT_ENCODING)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();

        if values.is_empty() {
            Self::parse(None)
        } else {
            Self::parse(Some(&values.join(",")))
        }
    }

    /// Chooses the most preferred of `candidates`.
    ///
    /// Ranking is by quality, then exact match over `*`, then header order,
    /// then candidate order. Codings with `q=0` are never chosen.
    #[must_use]
    pub fn preferred<'c>(&self, candidates: &[&'c str]) -> Option<&'c str> {
        candidates
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                self.priority(candidate)
                    .filter(|priority| priority.q > 0.0)
                    .map(|priority| (priority, index, *candidate))
            })
            .min_by(|(a, a_index, _), (b, b_index, _)| {
                b.q.total_cmp(&a.q)
                    .then(b.exact.cmp(&a.exact))
                    .then(a.order.cmp(&b.order))
                    .then(a_index.cmp(b_index))
            })
            .map(|(_, _, candidate)| candidate)
    }

    /// Returns true when `coding` would be chosen over deflate and identity.
    #[must_use]
    pub fn prefers(&self, coding: ContentCoding) -> bool {
        self.preferred(&coding.candidates()) == Some(coding.as_str())
    }

    fn priority(&self, candidate: &str) -> Option<Priority> {
        self.codings
            .iter()
            .filter_map(|coding| {
                let exact = coding.name.eq_ignore_ascii_case(candidate);
                (exact || coding.name == "*").then_some(Priority {
                    q: coding.q,
                    exact,
                    order: coding.order,
                })
            })
            .min_by(|a, b| {
                b.exact
                    .cmp(&a.exact)
                    .then(b.q.total_cmp(&a.q))
                    .then(a.order.cmp(&b.order))
            })
    }
}

#[derive(Debug, Clone, Copy)]
struct Priority {
    q: f32,
    exact: bool,
    order: usize,
}
