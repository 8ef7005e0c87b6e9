//! Virtual timer source for driving a [`ReadinessMonitor`] without a real clock.
//!
//! Time only moves when the caller advances it. Timers fire in deadline order;
//! probe ticks are turned into [`Event::Probe`] using a caller-supplied
//! inspection function.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::embed::monitor::{Effect, Event, ProbeOutcome, ReadinessMonitor, Timer};

#[derive(Debug, Clone, Copy)]
struct Armed {
    due: Duration,
    every: Option<Duration>,
}

#[derive(Debug)]
pub struct VirtualScheduler {
    origin: Instant,
    now: Duration,
    armed: BTreeMap<Timer, Armed>,
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            now: Duration::ZERO,
            armed: BTreeMap::new(),
        }
    }

    /// Virtual time since the scheduler was created.
    pub fn elapsed(&self) -> Duration {
        self.now
    }

    pub fn now(&self) -> Instant {
        self.origin + self.now
    }

    pub fn is_armed(&self, timer: Timer) -> bool {
        self.armed.contains_key(&timer)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    /// Perform timer effects in order. Starting an armed timer replaces it.
    pub fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Start { timer, after } => {
                    let every = (timer.is_periodic() && !after.is_zero()).then_some(after);
                    self.armed.insert(
                        timer,
                        Armed {
                            due: self.now + after,
                            every,
                        },
                    );
                }
                Effect::Cancel(timer) => {
                    self.armed.remove(&timer);
                }
            }
        }
    }

    pub fn start(&mut self, monitor: &mut ReadinessMonitor) {
        let effects = monitor.start(self.now());
        self.apply(effects);
    }

    /// Deliver an external event at the current virtual time.
    pub fn dispatch(&mut self, monitor: &mut ReadinessMonitor, event: Event) {
        let effects = monitor.handle(event, self.now());
        self.apply(effects);
    }

    /// Advance to `until` (measured from creation), firing every timer due on the way.
    ///
    /// `inspect` answers probe ticks and receives the virtual time of the tick.
    pub fn advance_to<F>(&mut self, monitor: &mut ReadinessMonitor, until: Duration, mut inspect: F)
    where
        F: FnMut(Duration) -> ProbeOutcome,
    {
        loop {
            let next = self
                .armed
                .iter()
                .filter(|(_, armed)| armed.due <= until)
                .min_by_key(|(timer, armed)| (armed.due, **timer))
                .map(|(timer, armed)| (*timer, *armed));

            let Some((timer, armed)) = next else {
                break;
            };

            self.now = self.now.max(armed.due);
            match armed.every {
                Some(every) => {
                    self.armed.insert(
                        timer,
                        Armed {
                            due: armed.due + every,
                            every: Some(every),
                        },
                    );
                }
                None => {
                    self.armed.remove(&timer);
                }
            }

            let event = match timer {
                Timer::Probe => Event::Probe(inspect(self.now)),
                other => Event::TimerFired(other),
            };
            self.dispatch(monitor, event);
        }

        self.now = self.now.max(until);
    }

    /// Advance by `by` with probes that never see a ready document.
    pub fn advance_by(&mut self, monitor: &mut ReadinessMonitor, by: Duration) {
        let until = self.now + by;
        self.advance_to(monitor, until, |_| ProbeOutcome::NotReady);
    }
}
