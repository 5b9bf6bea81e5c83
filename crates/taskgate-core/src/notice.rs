use std::time::{Duration, Instant};

pub const DEFAULT_NOTICE_WINDOW: Duration = Duration::from_secs(3);

/// A transient, self-dismissing message.
///
/// Holds at most one message. Showing a new one replaces the current message
/// and restarts the window. Expiry is checked against the caller's clock, so
/// nothing outlives the view that owns the notice.
#[derive(Debug, Clone)]
pub struct Notice {
    window: Duration,
    active: Option<(String, Instant)>,
}

impl Default for Notice {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_WINDOW)
    }
}

impl Notice {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            active: None,
        }
    }

    pub fn show(&mut self, message: impl Into<String>, now: Instant) {
        self.active = Some((message.into(), now + self.window));
    }

    pub fn current(&self, now: Instant) -> Option<&str> {
        match &self.active {
            Some((message, expires)) if now < *expires => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn dismiss(&mut self) {
        self.active = None;
    }
}
