//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, body limit)
//! - Resolve the caller identity for each request
//! - Hand requests below the path prefix to the forwarder
//! - Apply configuration updates without restarting
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::forward::Forwarder;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::security::path::split_segments;
use crate::security::{IdentityResolver, StaticIdentityResolver};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<ProxyConfig>>,
    pub forwarder: Forwarder,
    /// Host-supplied resolver; `None` uses the configured static identity.
    pub resolver: Option<Arc<dyn IdentityResolver>>,
}

/// HTTP server for the dashboard proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ArcSwap<ProxyConfig>>,
}

impl HttpServer {
    /// Server injecting the static identity from `config.identity`.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        Self::build(config, None)
    }

    /// Server injecting whatever identity `resolver` returns.
    pub fn with_resolver(
        config: ProxyConfig,
        resolver: Arc<dyn IdentityResolver>,
    ) -> Result<Self, reqwest::Error> {
        Self::build(config, Some(resolver))
    }

    fn build(
        config: ProxyConfig,
        resolver: Option<Arc<dyn IdentityResolver>>,
    ) -> Result<Self, reqwest::Error> {
        let max_body_size = config.security.max_body_size;
        let config = Arc::new(ArcSwap::from_pointee(config));

        let state = AppState {
            config: config.clone(),
            forwarder: Forwarder::new()?,
            resolver,
        };

        let router = Router::new()
            .route("/healthz", get(healthz))
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(RequestBodyLimitLayer::new(max_body_size)),
            );

        Ok(Self { router, config })
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> Arc<ProxyConfig> {
        self.config.load_full()
    }

    /// Serve on `listener` until `shutdown` fires, applying `config_updates` as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let config = self.config.clone();
        let updates = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!(
                    upstream = %new_config.upstream.url,
                    path_prefix = %new_config.upstream.path_prefix,
                    "Applying new configuration"
                );
                config.store(Arc::new(new_config));
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait_for(shutdown))
            .await?;

        updates.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn healthz() -> &'static str {
    "ok"
}

/// Remainder of `path` below `prefix`, if `path` is the prefix or lies under it.
fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Main proxy handler.
/// Resolves identity, then forwards everything below the path prefix.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let config = state.config.load_full();

    let Some(rest) = strip_path_prefix(&path, &config.upstream.path_prefix) else {
        tracing::debug!(request_id = %request_id, path = %path, "Outside proxy prefix");
        metrics::record_request(&method, 404, start_time);
        return json_error(StatusCode::NOT_FOUND, "Not found");
    };
    let segments = split_segments(rest);

    let (parts, body) = request.into_parts();
    let resolved = match &state.resolver {
        Some(resolver) => resolver.resolve(&parts).await,
        None => {
            StaticIdentityResolver::new(config.identity.clone())
                .resolve(&parts)
                .await
        }
    };
    let identity = match resolved {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Identity resolution failed");
            metrics::record_request(&method, 401, start_time);
            return json_error(StatusCode::UNAUTHORIZED, "Unauthorized");
        }
    };

    let forward_config = config.forward_config(identity);
    let request = Request::from_parts(parts, body);

    let response = match state
        .forwarder
        .forward(request, &forward_config, &segments)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                kind = e.kind().as_str(),
                error = %e,
                "Forwarding failed"
            );
            metrics::record_error(e.kind());
            e.into_response()
        }
    };

    let status = response.status();
    metrics::record_request(&method, status.as_u16(), start_time);
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status.as_u16(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Proxied request"
    );
    response
}
