//! What the embedding surface renders over the frame.

use crate::embed::monitor::{LoadState, ReadinessMonitor};

/// Screen-reader politeness of the status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    Polite,
    Assertive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayView<'a> {
    /// Overlay covers the frame.
    pub visible: bool,
    pub spinner: bool,
    pub message: &'a str,
    pub announcement: Announcement,
    /// Retry button label, when the button is offered.
    pub retry_label: Option<&'a str>,
    /// Container is marked busy.
    pub busy: bool,
}

impl ReadinessMonitor {
    pub fn overlay(&self) -> OverlayView<'_> {
        let options = self.options();
        let state = self.state();
        let loading = state == LoadState::Loading;
        let failed = matches!(state, LoadState::Timeout | LoadState::Error);

        let message = match state {
            LoadState::Timeout => options.timeout_message.as_str(),
            LoadState::Error => options.error_message.as_str(),
            LoadState::Loading | LoadState::Ready => options.loading_message.as_str(),
        };

        OverlayView {
            visible: options.show_loading && state != LoadState::Ready,
            spinner: loading,
            message,
            announcement: if failed {
                Announcement::Assertive
            } else {
                Announcement::Polite
            },
            retry_label: (failed && options.show_retry_button)
                .then_some(options.retry_button_text.as_str()),
            busy: loading,
        }
    }
}
