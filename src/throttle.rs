//! Progress throttle gating status-message edits.
//!
//! A job's status message is edited at most once per interval, and only when the
//! rendered text actually changed. A candidate whose text equals the last emitted
//! text restarts the window, so the next distinct update after a plateau still
//! waits a full interval.

use std::time::Duration;

use tokio::time::Instant;

use crate::progress::INITIAL_STATUS;

/// Per-job throttle state
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emitted_text: String,
    last_emitted_at: Instant,
}

impl ProgressThrottle {
    /// Start a throttle for a job whose status message was just sent with `initial_text`
    pub fn new(interval: Duration, initial_text: impl Into<String>, started_at: Instant) -> Self {
        Self {
            interval,
            last_emitted_text: initial_text.into(),
            last_emitted_at: started_at,
        }
    }

    /// Throttle for a job that just posted the standard "Downloading..." message
    pub fn starting_now(interval: Duration) -> Self {
        Self::new(interval, INITIAL_STATUS, Instant::now())
    }

    /// Decide whether `candidate` should be sent as a status edit at `now`.
    ///
    /// Returns `true` and records the text when it should be sent.
    pub fn should_emit(&mut self, candidate: &str, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_emitted_at) < self.interval {
            return false;
        }

        if candidate.trim() == self.last_emitted_text.trim() {
            self.last_emitted_at = now;
            return false;
        }

        self.last_emitted_text = candidate.to_string();
        self.last_emitted_at = now;
        true
    }

    /// Text of the last emitted (or initial) status
    pub fn last_text(&self) -> &str {
        &self.last_emitted_text
    }
}
