//! Header allow/deny policy at the proxy boundary.
//!
//! # Responsibilities
//! - Decide which inbound request headers reach the upstream
//! - Decide which upstream response headers reach the client
//! - Keep credential and identity headers out, whatever the caller configures
//!
//! # Design Decisions
//! - Allow-list in both directions; everything else is dropped
//! - Comparison is case-insensitive (names are lowercased once)
//! - The deny check runs twice: when extras are configured and again per header
//! - `Set-Cookie` is not part of the response allow-list; the forwarder relays it separately

use std::collections::HashSet;

/// Header carrying the injected user email.
pub const IDENTITY_USER_HEADER: &str = "x-webauth-user";

/// Header carrying the injected user role.
pub const IDENTITY_ROLE_HEADER: &str = "x-webauth-role";

/// Prefix reserved for identity injection. Inbound headers using it are never forwarded.
pub const IDENTITY_HEADER_PREFIX: &str = "x-webauth-";

/// Request headers forwarded to the upstream without caller configuration.
pub const SAFE_REQUEST_HEADERS: &[&str] = &[
    "accept",
    "accept-language",
    "cache-control",
    "content-type",
    "if-modified-since",
    "if-none-match",
];

/// Response headers relayed back to the client.
pub const SAFE_RESPONSE_HEADERS: &[&str] = &[
    "cache-control",
    "content-disposition",
    "content-type",
    "etag",
    "expires",
    "last-modified",
];

/// Credential headers that never cross the boundary towards the upstream.
pub const FORBIDDEN_FORWARD_HEADERS: &[&str] = &["authorization", "cookie"];

/// Returns true if the header must never be forwarded upstream.
pub fn is_denied(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with(IDENTITY_HEADER_PREFIX) || FORBIDDEN_FORWARD_HEADERS.contains(&lower.as_str())
}

/// Returns true if the upstream response header may be relayed to the client.
pub fn is_response_header_forwardable(name: &str) -> bool {
    SAFE_RESPONSE_HEADERS
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h))
}

/// Request header policy for one forwarding configuration.
///
/// Holds the caller's extra header names after they have been filtered
/// against the deny set.
#[derive(Debug, Clone, Default)]
pub struct HeaderPolicy {
    extra: HashSet<String>,
}

impl HeaderPolicy {
    /// Build a policy from caller-supplied extra header names.
    ///
    /// Names are trimmed and lowercased; empty and denied names are discarded.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra = extra
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty() && !is_denied(h))
            .collect();
        Self { extra }
    }

    /// Returns true if the inbound request header may be forwarded upstream.
    pub fn is_request_header_forwardable(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        // Deny set wins even over a name already in `extra`.
        if is_denied(&lower) {
            return false;
        }
        SAFE_REQUEST_HEADERS.contains(&lower.as_str()) || self.extra.contains(&lower)
    }

    /// The sanitized extra header names.
    pub fn extra(&self) -> &HashSet<String> {
        &self.extra
    }
}
