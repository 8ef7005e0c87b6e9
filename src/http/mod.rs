//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, body limit, prefix match)
//!     → identity resolver (host application)
//!     → forward.rs (validate, build URL, filter headers, bounded upstream call)
//!     → error.rs (failure → status + JSON body)
//!     → Send to client
//! ```

pub mod error;
pub mod forward;
pub mod request;
pub mod server;

pub use error::{ErrorKind, ProxyError};
pub use forward::{ForwardConfig, Forwarder};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
