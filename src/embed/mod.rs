//! Embedded dashboard support.
//!
//! # Data Flow
//! ```text
//! EmbedTarget (params.rs)
//!     → frame src pointing at the proxy prefix
//!
//! Frame events + timer ticks
//!     → monitor.rs (ReadinessMonitor: state + timer effects)
//!     → host timers (scheduler.rs in tests and simulations)
//!     → overlay.rs (what to draw over the frame)
//! ```
//!
//! # Design Decisions
//! - The monitor performs no I/O and never raises errors upward
//! - Retry is reported to an observer; no network call happens here

pub mod monitor;
pub mod overlay;
pub mod params;
pub mod scheduler;

pub use monitor::{
    Effect, Event, FrameSnapshot, LoadState, MonitorOptions, ProbeOutcome, ReadinessMonitor,
    RetryContext, RetryReason, Timer,
};
pub use overlay::{Announcement, OverlayView};
pub use params::{EmbedTarget, Kiosk, Theme, UrlParams, VarValue};
pub use scheduler::VirtualScheduler;
