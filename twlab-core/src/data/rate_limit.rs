//! Minimum spacing between outbound feed calls.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Blocks callers so that consecutive calls start at least `min_interval`
/// apart. Shared across threads; the wait happens while holding the lock so
/// concurrent callers queue up in order.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a call is permitted, then record it. Returns how long the
    /// caller was held back.
    pub fn acquire(&self) -> Duration {
        let mut last = self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let waited = match *last {
            Some(prev) => {
                let since = prev.elapsed();
                if since < self.min_interval {
                    let wait = self.min_interval - since;
                    std::thread::sleep(wait);
                    wait
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        };
        *last = Some(Instant::now());
        waited
    }
}
