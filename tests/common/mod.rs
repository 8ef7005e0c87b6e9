//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, Response};
use axum::Router;
use tokio::net::TcpListener;

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockUpstream {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("upstream saw no request")
    }
}

/// Start a recording upstream on an ephemeral port.
///
/// `respond` builds the reply; the reply is sent after `delay`.
pub async fn start_upstream<F>(delay: Duration, respond: F) -> MockUpstream
where
    F: Fn(&Recorded) -> Response<Body> + Clone + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let log = requests.clone();
    let app = Router::new().fallback(move |request: Request<Body>| {
        let log = log.clone();
        let respond = respond.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX)
                .await
                .unwrap_or_default()
                .to_vec();
            let recorded = Recorded {
                method: parts.method.to_string(),
                uri: parts.uri.to_string(),
                headers: parts.headers,
                body,
            };
            let response = respond(&recorded);
            log.lock().unwrap().push(recorded);
            tokio::time::sleep(delay).await;
            response
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, requests }
}

/// Dashboard-like reply carrying headers that must and must not reach the client.
pub fn dashboard_response(recorded: &Recorded) -> Response<Body> {
    let status = if recorded.method == "POST" { 201 } else { 200 };
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("etag", "\"v1\"")
        .header("server", "grafana")
        .header("x-frame-options", "deny")
        .header("x-webauth-user", "leak@example.com")
        .header("authorization", "Bearer upstream")
        .header("set-cookie", "grafana_session=abc; Path=/; HttpOnly")
        .header("set-cookie", "grafana_session_expiry=123; Path=/")
        .body(Body::from(r#"{"ok":true}"#))
        .unwrap()
}

/// Reply without a content type.
pub fn bare_response(_: &Recorded) -> Response<Body> {
    Response::builder()
        .status(200)
        .body(Body::from(vec![0u8, 1, 2, 3]))
        .unwrap()
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
