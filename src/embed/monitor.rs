//! Readiness monitor for an embedded dashboard frame.
//!
//! # States
//! - Loading: waiting for a load signal, fallback timer armed
//! - Ready: content loaded and the loading indicator may be hidden
//! - Timeout: no load signal before the fallback timer expired
//! - Error: the frame reported an error
//!
//! # State Transitions
//! ```text
//! Loading → Ready:   load signal, then max(0, min_loading_time - elapsed) + render_buffer
//! Loading → Timeout: fallback timer expires before any load signal
//! Timeout → Ready:   late load signal, then the same reveal delay
//! any     → Error:   frame error event
//! Timeout/Error → Loading: retry
//! ```
//!
//! # Design Decisions
//! - Pure transition function: events in, timer effects out; no clock is read here
//! - At most one timer of each kind is armed; every arm is preceded by a cancel
//! - The load latch makes repeated load signals no-ops within one attempt
//! - A timeout is not final; only the latch decides whether a load signal counts
//! - Error is left only through retry or a content change
//! - Frame introspection is a capability that is switched off for good once it fails

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Interval between readiness probes while introspection is possible.
pub const PROBE_INTERVAL: Duration = Duration::from_millis(250);

pub const DEFAULT_MIN_LOADING_TIME: Duration = Duration::from_millis(1500);
pub const DEFAULT_RENDER_BUFFER: Duration = Duration::from_millis(500);
pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Loading,
    Ready,
    Timeout,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryReason {
    Timeout,
    Error,
}

/// Handed to the retry observer each time a retry starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryContext {
    /// 1 for the first retry.
    pub attempt: u32,
    pub reason: RetryReason,
}

/// Timers the monitor asks its host to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timer {
    /// Declares a stall when it expires.
    Fallback,
    /// Recurring; each tick is answered with [`Event::Probe`].
    Probe,
    /// Hides the loading indicator after a load signal.
    Reveal,
}

impl Timer {
    pub fn is_periodic(self) -> bool {
        matches!(self, Timer::Probe)
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Arm `timer` to fire after `after` (every `after` if periodic).
    Start { timer: Timer, after: Duration },
    Cancel(Timer),
}

/// Same-origin view of the frame's document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    /// Document `readyState` is "complete".
    pub document_complete: bool,
    /// Current location path of the frame.
    pub location_path: String,
    /// Number of element children rendered in the body.
    pub child_count: usize,
}

/// Result of one readiness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Frame, window or body not available yet.
    NotReady,
    Inspected(FrameSnapshot),
    /// Introspection threw, typically after a cross-origin navigation.
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The frame's native load event.
    FrameLoaded,
    /// The frame's error event.
    FrameError,
    Probe(ProbeOutcome),
    TimerFired(Timer),
    /// User asked to try again.
    Retry,
    /// The embedding now points at different content.
    ContentChanged { content_path: String },
    Unmount,
}

/// Display and timing options.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub show_loading: bool,
    pub min_loading_time: Duration,
    pub render_buffer: Duration,
    pub fallback_timeout: Duration,
    pub loading_message: String,
    pub timeout_message: String,
    pub error_message: String,
    pub show_retry_button: bool,
    pub retry_button_text: String,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            show_loading: true,
            min_loading_time: DEFAULT_MIN_LOADING_TIME,
            render_buffer: DEFAULT_RENDER_BUFFER,
            fallback_timeout: DEFAULT_FALLBACK_TIMEOUT,
            loading_message: "Loading dashboard...".to_string(),
            timeout_message: "Dashboard is taking longer than expected to load.".to_string(),
            error_message: "Failed to load dashboard. Please try again.".to_string(),
            show_retry_button: true,
            retry_button_text: "Retry".to_string(),
        }
    }
}

type RetryObserver = Box<dyn FnMut(RetryContext) + Send>;

const ALL_TIMERS: [Timer; 3] = [Timer::Fallback, Timer::Probe, Timer::Reveal];

pub struct ReadinessMonitor {
    options: MonitorOptions,
    content_path: String,
    state: LoadState,
    attempt: u32,
    started_at: Option<Instant>,
    load_handled: bool,
    can_inspect: bool,
    mounted: bool,
    on_retry: Option<RetryObserver>,
}

impl fmt::Debug for ReadinessMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessMonitor")
            .field("content_path", &self.content_path)
            .field("state", &self.state)
            .field("attempt", &self.attempt)
            .field("load_handled", &self.load_handled)
            .field("can_inspect", &self.can_inspect)
            .field("mounted", &self.mounted)
            .finish()
    }
}

impl ReadinessMonitor {
    /// Monitor for content whose frame location contains `content_path`.
    pub fn new(content_path: impl Into<String>, options: MonitorOptions) -> Self {
        Self {
            options,
            content_path: content_path.into(),
            state: LoadState::Loading,
            attempt: 0,
            started_at: None,
            load_handled: false,
            can_inspect: true,
            mounted: false,
            on_retry: None,
        }
    }

    pub fn with_retry_observer(mut self, observer: impl FnMut(RetryContext) + Send + 'static) -> Self {
        self.on_retry = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Retries performed for the current content.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn can_inspect(&self) -> bool {
        self.can_inspect
    }

    pub fn content_path(&self) -> &str {
        &self.content_path
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }

    /// First render: enter `Loading` and arm the timers.
    pub fn start(&mut self, now: Instant) -> Vec<Effect> {
        self.mounted = true;
        self.enter_loading(now)
    }

    /// Apply `event` observed at `now` and return the timer effects to perform, in order.
    pub fn handle(&mut self, event: Event, now: Instant) -> Vec<Effect> {
        if !self.mounted {
            return Vec::new();
        }

        match event {
            Event::FrameLoaded => self.mark_loaded(now),
            Event::Probe(outcome) => self.on_probe(outcome, now),
            Event::TimerFired(timer) => self.on_timer(timer),
            Event::FrameError => {
                tracing::debug!(content = %self.content_path, "Frame reported an error");
                self.state = LoadState::Error;
                cancel_all()
            }
            Event::Retry => self.retry(now),
            Event::ContentChanged { content_path } => {
                self.content_path = content_path;
                self.attempt = 0;
                self.can_inspect = true;
                self.enter_loading(now)
            }
            Event::Unmount => {
                self.mounted = false;
                cancel_all()
            }
        }
    }

    fn enter_loading(&mut self, now: Instant) -> Vec<Effect> {
        self.state = LoadState::Loading;
        self.started_at = Some(now);
        self.load_handled = false;

        let mut effects = cancel_all();
        effects.push(Effect::Start {
            timer: Timer::Fallback,
            after: self.options.fallback_timeout,
        });
        if self.can_inspect {
            effects.push(Effect::Start {
                timer: Timer::Probe,
                after: PROBE_INTERVAL,
            });
        }
        effects
    }

    fn mark_loaded(&mut self, now: Instant) -> Vec<Effect> {
        let waiting = matches!(self.state, LoadState::Loading | LoadState::Timeout);
        if !waiting || self.load_handled {
            return Vec::new();
        }
        self.load_handled = true;

        let elapsed = self
            .started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        let remaining = self.options.min_loading_time.saturating_sub(elapsed);

        vec![
            Effect::Cancel(Timer::Fallback),
            Effect::Cancel(Timer::Probe),
            Effect::Start {
                timer: Timer::Reveal,
                after: remaining + self.options.render_buffer,
            },
        ]
    }

    fn on_probe(&mut self, outcome: ProbeOutcome, now: Instant) -> Vec<Effect> {
        if !self.can_inspect {
            return Vec::new();
        }
        match outcome {
            ProbeOutcome::Denied => {
                tracing::debug!(content = %self.content_path, "Frame introspection denied, probe disabled");
                self.can_inspect = false;
                vec![Effect::Cancel(Timer::Probe)]
            }
            ProbeOutcome::NotReady => Vec::new(),
            ProbeOutcome::Inspected(snapshot) => {
                let ready = snapshot.document_complete
                    && snapshot.location_path.contains(&self.content_path)
                    && snapshot.child_count > 0;
                if ready {
                    self.mark_loaded(now)
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn on_timer(&mut self, timer: Timer) -> Vec<Effect> {
        match timer {
            Timer::Fallback if self.state == LoadState::Loading && !self.load_handled => {
                tracing::debug!(content = %self.content_path, "Frame load timed out");
                self.state = LoadState::Timeout;
                vec![Effect::Cancel(Timer::Probe)]
            }
            Timer::Reveal
                if matches!(self.state, LoadState::Loading | LoadState::Timeout) && self.load_handled =>
            {
                self.state = LoadState::Ready;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn retry(&mut self, now: Instant) -> Vec<Effect> {
        let reason = match self.state {
            LoadState::Timeout => RetryReason::Timeout,
            LoadState::Error => RetryReason::Error,
            LoadState::Loading | LoadState::Ready => return Vec::new(),
        };
        self.attempt += 1;
        let context = RetryContext {
            attempt: self.attempt,
            reason,
        };
        tracing::info!(content = %self.content_path, attempt = context.attempt, reason = ?reason, "Retrying frame load");
        if let Some(observer) = self.on_retry.as_mut() {
            observer(context);
        }
        self.enter_loading(now)
    }
}

fn cancel_all() -> Vec<Effect> {
    ALL_TIMERS.iter().map(|t| Effect::Cancel(*t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn options() -> MonitorOptions {
        MonitorOptions {
            min_loading_time: ms(100),
            render_buffer: ms(50),
            fallback_timeout: ms(500),
            ..Default::default()
        }
    }

    fn started() -> (ReadinessMonitor, Instant) {
        let t0 = Instant::now();
        let mut monitor = ReadinessMonitor::new("/d/abc", options());
        monitor.start(t0);
        (monitor, t0)
    }

    #[test]
    fn test_start_arms_fallback_and_probe() {
        let t0 = Instant::now();
        let mut monitor = ReadinessMonitor::new("/d/abc", options());
        let effects = monitor.start(t0);
        assert_eq!(&effects[..3], &cancel_all()[..]);
        assert_eq!(
            &effects[3..],
            &[
                Effect::Start { timer: Timer::Fallback, after: ms(500) },
                Effect::Start { timer: Timer::Probe, after: PROBE_INTERVAL },
            ]
        );
        assert_eq!(monitor.state(), LoadState::Loading);
    }

    #[test]
    fn test_load_respects_min_loading_time() {
        let (mut monitor, t0) = started();
        let effects = monitor.handle(Event::FrameLoaded, t0 + ms(30));
        assert_eq!(
            effects,
            vec![
                Effect::Cancel(Timer::Fallback),
                Effect::Cancel(Timer::Probe),
                Effect::Start { timer: Timer::Reveal, after: ms(120) },
            ]
        );
    }

    #[test]
    fn test_late_load_only_waits_render_buffer() {
        let (mut monitor, t0) = started();
        let effects = monitor.handle(Event::FrameLoaded, t0 + ms(400));
        assert_eq!(effects[2], Effect::Start { timer: Timer::Reveal, after: ms(50) });
    }

    #[test]
    fn test_repeated_load_is_noop() {
        let (mut monitor, t0) = started();
        monitor.handle(Event::FrameLoaded, t0);
        assert!(monitor.handle(Event::FrameLoaded, t0 + ms(10)).is_empty());
        let snapshot = FrameSnapshot {
            document_complete: true,
            location_path: "/api/grafana/d/abc/x".into(),
            child_count: 3,
        };
        assert!(monitor
            .handle(Event::Probe(ProbeOutcome::Inspected(snapshot)), t0 + ms(20))
            .is_empty());
    }

    #[test]
    fn test_reveal_moves_to_ready() {
        let (mut monitor, t0) = started();
        monitor.handle(Event::FrameLoaded, t0);
        monitor.handle(Event::TimerFired(Timer::Reveal), t0 + ms(150));
        assert_eq!(monitor.state(), LoadState::Ready);
    }

    #[test]
    fn test_probe_requires_all_conditions() {
        let (mut monitor, t0) = started();
        let mut snapshot = FrameSnapshot {
            document_complete: true,
            location_path: "/api/grafana/login".into(),
            child_count: 1,
        };
        assert!(monitor
            .handle(Event::Probe(ProbeOutcome::Inspected(snapshot.clone())), t0)
            .is_empty());

        snapshot.location_path = "/api/grafana/d/abc/dash".into();
        snapshot.child_count = 0;
        assert!(monitor
            .handle(Event::Probe(ProbeOutcome::Inspected(snapshot.clone())), t0)
            .is_empty());

        snapshot.child_count = 2;
        let effects = monitor.handle(Event::Probe(ProbeOutcome::Inspected(snapshot)), t0);
        assert!(effects.contains(&Effect::Cancel(Timer::Fallback)));
    }

    #[test]
    fn test_probe_denied_disables_for_good() {
        let (mut monitor, t0) = started();
        let effects = monitor.handle(Event::Probe(ProbeOutcome::Denied), t0 + ms(250));
        assert_eq!(effects, vec![Effect::Cancel(Timer::Probe)]);
        assert!(!monitor.can_inspect());

        monitor.handle(Event::TimerFired(Timer::Fallback), t0 + ms(500));
        let effects = monitor.handle(Event::Retry, t0 + ms(600));
        assert!(!effects.contains(&Effect::Start { timer: Timer::Probe, after: PROBE_INTERVAL }));
        assert!(!monitor.can_inspect());
    }

    #[test]
    fn test_fallback_times_out() {
        let (mut monitor, t0) = started();
        let effects = monitor.handle(Event::TimerFired(Timer::Fallback), t0 + ms(500));
        assert_eq!(monitor.state(), LoadState::Timeout);
        assert_eq!(effects, vec![Effect::Cancel(Timer::Probe)]);
    }

    #[test]
    fn test_late_load_recovers_from_timeout() {
        let (mut monitor, t0) = started();
        monitor.handle(Event::TimerFired(Timer::Fallback), t0 + ms(500));
        assert_eq!(monitor.state(), LoadState::Timeout);

        let effects = monitor.handle(Event::FrameLoaded, t0 + ms(700));
        assert_eq!(effects[2], Effect::Start { timer: Timer::Reveal, after: ms(50) });
        assert_eq!(monitor.state(), LoadState::Timeout);
        assert!(monitor.handle(Event::FrameLoaded, t0 + ms(710)).is_empty());

        monitor.handle(Event::TimerFired(Timer::Reveal), t0 + ms(750));
        assert_eq!(monitor.state(), LoadState::Ready);
    }

    #[test]
    fn test_load_after_error_is_ignored() {
        let (mut monitor, t0) = started();
        monitor.handle(Event::FrameError, t0 + ms(10));
        assert!(monitor.handle(Event::FrameLoaded, t0 + ms(20)).is_empty());
        assert_eq!(monitor.state(), LoadState::Error);
    }

    #[test]
    fn test_stale_fallback_after_load_is_ignored() {
        let (mut monitor, t0) = started();
        monitor.handle(Event::FrameLoaded, t0);
        monitor.handle(Event::TimerFired(Timer::Fallback), t0 + ms(500));
        assert_eq!(monitor.state(), LoadState::Loading);
    }

    #[test]
    fn test_error_cancels_everything() {
        let (mut monitor, t0) = started();
        monitor.handle(Event::FrameLoaded, t0);
        let effects = monitor.handle(Event::FrameError, t0 + ms(10));
        assert_eq!(effects, cancel_all());
        assert_eq!(monitor.state(), LoadState::Error);
        monitor.handle(Event::TimerFired(Timer::Reveal), t0 + ms(150));
        assert_eq!(monitor.state(), LoadState::Error);
    }

    #[test]
    fn test_retry_reports_context() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let t0 = Instant::now();
        let mut monitor = ReadinessMonitor::new("/d/abc", options())
            .with_retry_observer(move |ctx| sink.lock().unwrap().push(ctx));
        monitor.start(t0);

        monitor.handle(Event::TimerFired(Timer::Fallback), t0 + ms(500));
        let effects = monitor.handle(Event::Retry, t0 + ms(700));
        assert_eq!(monitor.state(), LoadState::Loading);
        assert_eq!(&effects[..3], &cancel_all()[..]);

        monitor.handle(Event::FrameError, t0 + ms(800));
        monitor.handle(Event::Retry, t0 + ms(900));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                RetryContext { attempt: 1, reason: RetryReason::Timeout },
                RetryContext { attempt: 2, reason: RetryReason::Error },
            ]
        );
        assert_eq!(monitor.attempt(), 2);
    }

    #[test]
    fn test_retry_resets_min_loading_origin() {
        let (mut monitor, t0) = started();
        monitor.handle(Event::TimerFired(Timer::Fallback), t0 + ms(500));
        monitor.handle(Event::Retry, t0 + ms(1000));
        let effects = monitor.handle(Event::FrameLoaded, t0 + ms(1010));
        assert_eq!(effects[2], Effect::Start { timer: Timer::Reveal, after: ms(140) });
    }

    #[test]
    fn test_retry_ignored_while_loading_or_ready() {
        let (mut monitor, t0) = started();
        assert!(monitor.handle(Event::Retry, t0).is_empty());
        monitor.handle(Event::FrameLoaded, t0);
        monitor.handle(Event::TimerFired(Timer::Reveal), t0 + ms(150));
        assert!(monitor.handle(Event::Retry, t0 + ms(200)).is_empty());
        assert_eq!(monitor.attempt(), 0);
    }

    #[test]
    fn test_content_change_resets_everything() {
        let (mut monitor, t0) = started();
        monitor.handle(Event::Probe(ProbeOutcome::Denied), t0);
        monitor.handle(Event::FrameError, t0 + ms(10));
        monitor.handle(Event::Retry, t0 + ms(20));
        assert_eq!(monitor.attempt(), 1);

        let effects = monitor.handle(
            Event::ContentChanged { content_path: "/d/other".into() },
            t0 + ms(30),
        );
        assert_eq!(monitor.attempt(), 0);
        assert!(monitor.can_inspect());
        assert_eq!(monitor.content_path(), "/d/other");
        assert_eq!(&effects[..3], &cancel_all()[..]);
        assert!(effects.contains(&Effect::Start { timer: Timer::Probe, after: PROBE_INTERVAL }));
    }

    #[test]
    fn test_unmount_cancels_and_ignores_later_events() {
        let (mut monitor, t0) = started();
        assert_eq!(monitor.handle(Event::Unmount, t0), cancel_all());
        assert!(monitor.handle(Event::FrameLoaded, t0 + ms(10)).is_empty());
        assert!(monitor.handle(Event::TimerFired(Timer::Fallback), t0 + ms(500)).is_empty());
        assert_eq!(monitor.state(), LoadState::Loading);
    }
}
