//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce request deadline, cancel on expiry)
//!     → Completed / Failed / TimedOut handed back to the forwarder
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - No automatic retries inside the proxy; retry is a caller/UI concern

pub mod timeouts;
