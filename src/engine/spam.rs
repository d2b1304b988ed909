//! Per-conversation inbound rate counter
//!
//! Windows are fixed and non-overlapping: a window opens with the first
//! message after the previous one expired, so a burst straddling a window
//! boundary can exceed the nominal rate.

use dashmap::DashMap;

use super::elapsed_ms;

/// Message count for the current window of one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    /// Messages counted since `window_started_at`
    pub count: u32,

    /// Epoch milliseconds when the window opened
    pub window_started_at: i64,
}

impl RateWindow {
    const fn fresh(now: i64) -> Self {
        Self {
            count: 0,
            window_started_at: now,
        }
    }
}

/// Spam detector keyed by conversation
#[derive(Debug, Default)]
pub struct SpamGuard {
    windows: DashMap<String, RateWindow>,
}

impl SpamGuard {
    /// Create a guard with no windows
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one message for `key` and report whether it exceeds `spam_limit`
    ///
    /// The updated window is always kept, so messages classified as spam
    /// still count toward the current window.
    pub fn is_spam(&self, key: &str, now: i64, spam_limit: u32, spam_time_window_ms: u64) -> bool {
        let mut window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| RateWindow::fresh(now));

        if elapsed_ms(now, window.window_started_at) > spam_time_window_ms {
            *window = RateWindow::fresh(now);
        }

        window.count = window.count.saturating_add(1);
        window.count > spam_limit
    }

    /// Current window for `key`, if any message was counted
    #[must_use]
    pub fn window(&self, key: &str) -> Option<RateWindow> {
        self.windows.get(key).map(|w| *w)
    }

    /// Drop windows that opened more than `idle_ms` before `now`
    ///
    /// Returns the number of windows removed.
    pub fn prune_idle(&self, now: i64, idle_ms: u64) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| elapsed_ms(now, w.window_started_at) <= idle_ms);
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked windows
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether no window is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
