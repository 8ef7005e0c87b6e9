//! Identity-injecting reverse proxy for an embedded dashboard service,
//! plus the readiness monitor that supervises the embedding frame.

pub mod config;
pub mod embed;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
