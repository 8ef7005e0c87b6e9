//! Proxy configuration.
//!
//! # Data Flow
//! ```text
//! proxy.toml
//!     → loader.rs (read, deserialize, fill defaults)
//!     → validation.rs (collect every semantic problem at once)
//!     → ProxyConfig, stored in the server's ArcSwap
//!
//! While running with --config:
//!     watcher.rs sees the file change
//!     → loader.rs + validation.rs again
//!     → valid: swapped in, the next request uses the new upstream, prefix, timeout and identity
//!     → invalid: logged and dropped, the running config stays
//! ```
//!
//! # Design Decisions
//! - Every field has a default; an empty file is a valid config
//! - The body limit and listener address are read once at startup

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{ListenerConfig, ObservabilityConfig, ProxyConfig, SecurityConfig, UpstreamConfig};
pub use validation::{validate_config, ValidationError};
