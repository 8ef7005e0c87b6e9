//! Forwarder errors and their client-facing responses.
//!
//! Each condition maps to one status code and one fixed message. Upstream
//! error detail stays in the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error class, following who is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operator misconfiguration.
    Configuration,
    /// Caller-supplied identity is malformed.
    Identity,
    /// Requested path attempted traversal.
    Path,
    /// Inbound request body exceeded the configured limit.
    Request,
    /// The bounded upstream call did not complete in time.
    UpstreamTimeout,
    /// Any other failure reaching the upstream.
    UpstreamTransport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Identity => "identity",
            ErrorKind::Path => "path",
            ErrorKind::Request => "request",
            ErrorKind::UpstreamTimeout => "upstream_timeout",
            ErrorKind::UpstreamTransport => "upstream_transport",
        }
    }
}

/// Errors produced while forwarding a single request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid upstream URL configuration")]
    InvalidUpstream,

    #[error("Invalid user email")]
    InvalidEmail,

    #[error("Invalid user role")]
    InvalidRole,

    #[error("Invalid path prefix")]
    InvalidPathPrefix,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid upstream path")]
    PathTraversal,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Upstream request timed out")]
    UpstreamTimeout,

    #[error("Failed to proxy request")]
    Transport(#[source] BoxError),
}

impl ProxyError {
    pub fn transport(err: impl Into<BoxError>) -> Self {
        ProxyError::Transport(err.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::InvalidUpstream | ProxyError::InvalidPathPrefix | ProxyError::InvalidTimeout => {
                ErrorKind::Configuration
            }
            ProxyError::InvalidEmail | ProxyError::InvalidRole => ErrorKind::Identity,
            ProxyError::PathTraversal => ErrorKind::Path,
            ProxyError::PayloadTooLarge => ErrorKind::Request,
            ProxyError::UpstreamTimeout => ErrorKind::UpstreamTimeout,
            ProxyError::Transport(_) => ErrorKind::UpstreamTransport,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Identity | ErrorKind::Path => StatusCode::BAD_REQUEST,
            ErrorKind::Request => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Configuration | ErrorKind::UpstreamTransport => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
