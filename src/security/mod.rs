//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity.rs (host resolver supplies trusted email + role)
//!     → path.rs (reject traversal, encode segments)
//!     → headers.rs (drop credentials, allow-list the rest)
//!     → Forwarder injects identity headers
//! ```
//!
//! # Design Decisions
//! - Defense in depth: the deny set is checked at configuration and at forwarding time
//! - Fail closed: reject on any validation failure
//! - No trust in client input; identity never comes from inbound headers

pub mod headers;
pub mod identity;
pub mod path;

pub use headers::HeaderPolicy;
pub use identity::{AuthError, Identity, IdentityResolver, Role, StaticIdentityResolver};
pub use path::PathTraversal;
