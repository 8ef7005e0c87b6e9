//! Identity-injecting request forwarding.
//!
//! # Responsibilities
//! - Validate the per-request forwarding configuration
//! - Build the upstream URL from prefix, sanitized path and raw query
//! - Inject identity headers, allow-list the rest
//! - Bound the upstream call by the configured timeout
//! - Relay status, allow-listed headers, body and every `Set-Cookie`
//!
//! # Design Decisions
//! - Validation order is fixed; the first failure wins
//! - Bodies are buffered in both directions (dashboard payloads are small)
//! - No retries; a failed request is terminal
//! - Stateless per call; the pooled HTTP client is the only shared resource

use std::error::Error as StdError;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{
        header::{CONTENT_TYPE, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode,
    },
};

use http_body_util::LengthLimitError;

use crate::http::error::ProxyError;
use crate::resilience::timeouts::{with_deadline, Bounded};
use crate::security::headers::{
    self, HeaderPolicy, IDENTITY_ROLE_HEADER, IDENTITY_USER_HEADER,
};
use crate::security::identity::{is_valid_email, Identity, Role};
use crate::security::path;

/// Default path prefix the upstream is served under.
pub const DEFAULT_PATH_PREFIX: &str = "/api/grafana";

/// Default upstream request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Per-request forwarding configuration.
#[derive(Debug, Clone)]
pub struct ForwardConfig {
    /// Upstream base address (e.g. "http://grafana:3000").
    pub upstream_url: String,

    /// Trusted caller identity.
    pub identity: Identity,

    /// Path prefix the upstream is served under.
    pub path_prefix: String,

    /// Upstream call deadline in milliseconds.
    pub request_timeout_ms: u64,

    /// Extra request header names to forward (case-insensitive).
    pub forward_request_headers: Vec<String>,
}

impl ForwardConfig {
    pub fn new(upstream_url: impl Into<String>, identity: Identity) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            identity,
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            forward_request_headers: Vec::new(),
        }
    }
}

/// Upstream address must parse as an absolute `http` or `https` URL.
pub fn is_valid_upstream(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Path prefix must be absolute and free of `..`.
pub fn is_valid_path_prefix(prefix: &str) -> bool {
    prefix.starts_with('/') && !prefix.contains("..")
}

/// Validated view of a [`ForwardConfig`].
struct Checked {
    role: Role,
    policy: HeaderPolicy,
    timeout: Duration,
}

fn check(config: &ForwardConfig) -> Result<Checked, ProxyError> {
    if !is_valid_upstream(&config.upstream_url) {
        return Err(ProxyError::InvalidUpstream);
    }
    if !is_valid_email(&config.identity.email) {
        return Err(ProxyError::InvalidEmail);
    }
    let role: Role = config
        .identity
        .role
        .parse()
        .map_err(|_| ProxyError::InvalidRole)?;
    if !is_valid_path_prefix(&config.path_prefix) {
        return Err(ProxyError::InvalidPathPrefix);
    }
    if config.request_timeout_ms == 0 {
        return Err(ProxyError::InvalidTimeout);
    }

    Ok(Checked {
        role,
        policy: HeaderPolicy::new(&config.forward_request_headers),
        timeout: Duration::from_millis(config.request_timeout_ms),
    })
}

/// Join upstream address, prefix, sanitized path and the raw query string.
pub fn build_target_url(upstream: &str, prefix: &str, path: &str, query: Option<&str>) -> String {
    let mut url = upstream.strip_suffix('/').unwrap_or(upstream).to_string();

    let prefix = prefix.trim_matches('/');
    if !prefix.is_empty() {
        url.push('/');
        url.push_str(prefix);
    }
    if !path.is_empty() {
        url.push('/');
        url.push_str(path);
    }
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// Identity headers first, then every inbound header the policy admits.
fn build_upstream_headers(
    inbound: &HeaderMap,
    email: &str,
    role: Role,
    policy: &HeaderPolicy,
) -> Result<HeaderMap, ProxyError> {
    let mut out = HeaderMap::new();
    out.insert(
        HeaderName::from_static(IDENTITY_USER_HEADER),
        HeaderValue::from_str(email).map_err(|_| ProxyError::InvalidEmail)?,
    );
    out.insert(
        HeaderName::from_static(IDENTITY_ROLE_HEADER),
        HeaderValue::from_static(role.as_str()),
    );

    for (name, value) in inbound.iter() {
        if headers::is_denied(name.as_str()) {
            continue;
        }
        if policy.is_request_header_forwardable(name.as_str()) {
            out.append(name.clone(), value.clone());
        }
    }
    Ok(out)
}

/// True when `err` or any of its sources is a body length limit hit.
fn is_length_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Allow-listed upstream headers plus every `Set-Cookie` entry.
fn build_client_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in upstream.iter() {
        if headers::is_response_header_forwardable(name.as_str()) {
            out.append(name.clone(), value.clone());
        }
    }
    if !out.contains_key(CONTENT_TYPE) {
        out.insert(CONTENT_TYPE, HeaderValue::from_static(FALLBACK_CONTENT_TYPE));
    }
    for cookie in upstream.get_all(SET_COOKIE) {
        out.append(SET_COOKIE, cookie.clone());
    }
    out
}

/// Forwards requests to the upstream dashboard service.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    /// Create a forwarder with its own connection pool.
    pub fn new() -> Result<Self, reqwest::Error> {
        // Upstream is an internal service; environment proxies do not apply.
        let client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Forward `request` to the upstream under `config`'s identity.
    ///
    /// `segments` is the request path below the proxy prefix. Nothing is sent
    /// upstream unless every validation passes.
    pub async fn forward<S: AsRef<str>>(
        &self,
        request: Request<Body>,
        config: &ForwardConfig,
        segments: &[S],
    ) -> Result<Response<Body>, ProxyError> {
        let checked = check(config)?;

        let path = path::sanitize(segments).map_err(|e| {
            tracing::warn!(segment = %e.segment, "Rejected path traversal");
            ProxyError::PathTraversal
        })?;

        let (parts, body) = request.into_parts();
        let target = build_target_url(
            &config.upstream_url,
            &config.path_prefix,
            &path,
            parts.uri.query(),
        );
        let headers = build_upstream_headers(
            &parts.headers,
            &config.identity.email,
            checked.role,
            &checked.policy,
        )?;

        let body = if is_mutating(&parts.method) {
            Some(
                axum::body::to_bytes(body, usize::MAX).await.map_err(|e| {
                    if is_length_limit(&e) {
                        ProxyError::PayloadTooLarge
                    } else {
                        ProxyError::transport(e)
                    }
                })?,
            )
        } else {
            None
        };

        tracing::debug!(
            method = %parts.method,
            target = %target,
            role = %checked.role,
            user = %config.identity.email,
            "Forwarding to upstream"
        );

        let mut upstream = self
            .client
            .request(parts.method.clone(), &target)
            .headers(headers);
        if let Some(body) = body {
            upstream = upstream.body(body);
        }

        let call = async move {
            let response = upstream.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.bytes().await?;
            Ok::<(StatusCode, HeaderMap, Bytes), reqwest::Error>((status, headers, bytes))
        };

        let (status, upstream_headers, bytes) = match with_deadline(checked.timeout, call).await {
            Bounded::Completed(parts) => parts,
            Bounded::TimedOut => {
                tracing::warn!(
                    target = %target,
                    timeout_ms = config.request_timeout_ms,
                    "Upstream request timed out"
                );
                return Err(ProxyError::UpstreamTimeout);
            }
            Bounded::Failed(e) => {
                tracing::error!(target = %target, error = %e, "Upstream error");
                return Err(ProxyError::transport(e));
            }
        };

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = build_client_headers(&upstream_headers);
        Ok(response)
    }
}
