//! Upstream path sanitization.
//!
//! Every caller-supplied path segment passes through here before it becomes
//! part of an upstream URL.

use thiserror::Error;

/// A `.` or `..` segment was found in the requested path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("path segment {segment:?} is not allowed")]
pub struct PathTraversal {
    pub segment: String,
}

/// Validate and percent-encode path segments, joined with `/`.
///
/// Empty segments are skipped. Empty input yields an empty string.
pub fn sanitize<S: AsRef<str>>(segments: &[S]) -> Result<String, PathTraversal> {
    let mut encoded = Vec::with_capacity(segments.len());

    for segment in segments.iter().map(AsRef::as_ref) {
        if segment.is_empty() {
            continue;
        }
        if segment == "." || segment == ".." {
            return Err(PathTraversal {
                segment: segment.to_string(),
            });
        }
        // Stricter than encodeURIComponent: `!'()*` and `:` are escaped too.
        // Upstream decodes either form to the same segment.
        encoded.push(urlencoding::encode(segment).into_owned());
    }

    Ok(encoded.join("/"))
}

/// Split a raw request path remainder into percent-decoded segments.
///
/// Segments that are not valid UTF-8 after decoding are kept verbatim so that
/// the sanitizer still sees (and re-encodes) them.
pub fn split_segments(raw: &str) -> Vec<String> {
    raw.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
        .collect()
}
