//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::http::forward::{ForwardConfig, DEFAULT_PATH_PREFIX, DEFAULT_REQUEST_TIMEOUT_MS};
use crate::security::Identity;

/// Root configuration for the dashboard proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream dashboard service.
    pub upstream: UpstreamConfig,

    /// Static identity injected for every request (kiosk/service account).
    /// Ignored when the server runs with a custom resolver.
    pub identity: Option<Identity>,

    /// Request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Per-request forwarding configuration for `identity`.
    pub fn forward_config(&self, identity: Identity) -> ForwardConfig {
        ForwardConfig {
            upstream_url: self.upstream.url.clone(),
            identity,
            path_prefix: self.upstream.path_prefix.clone(),
            request_timeout_ms: self.upstream.request_timeout_ms,
            forward_request_headers: self.upstream.forward_request_headers.clone(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream dashboard service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Internal base URL (e.g., "http://grafana:3000").
    pub url: String,

    /// Path prefix the upstream is served under; also the route the proxy listens on.
    pub path_prefix: String,

    /// Upstream request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Extra request headers to forward (case-insensitive).
    pub forward_request_headers: Vec<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            forward_request_headers: Vec::new(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
