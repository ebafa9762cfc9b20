//! Write-volume limiter for periodic snapshot logging

use chrono::{DateTime, Utc};

/// Allows one write per interval.
///
/// The caller supplies the current time, so the limiter holds no clock and
/// no global state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: chrono::Duration,
    last_write: Option<DateTime<Utc>>,
}

impl RateLimiter {
    pub fn new(interval: std::time::Duration) -> Self {
        Self {
            interval: chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::MAX),
            last_write: None,
        }
    }

    /// Take the write slot if the interval has elapsed since the last write
    pub fn try_acquire(&mut self, now: DateTime<Utc>) -> bool {
        let ready = match self.last_write {
            None => true,
            Some(last) => now - last >= self.interval,
        };
        if ready {
            self.last_write = Some(now);
        }
        ready
    }

    pub fn last_write(&self) -> Option<DateTime<Utc>> {
        self.last_write
    }
}
