//! Sliding-window admission control for summarization calls.
//!
//! At most `max_calls` admitted per `window`. Timestamps older than the
//! window are pruned on every check. An over-limit call is denied
//! immediately with the remaining wait; it is never queued or retried
//! here. A denied call is not recorded, so failures never consume
//! future quota.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use litmark_core::limits::{RATE_LIMIT_CALLS, RATE_LIMIT_WINDOW};

/// Sliding-window rate limiter.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_calls: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(RATE_LIMIT_CALLS, RATE_LIMIT_WINDOW)
    }
}

impl SlidingWindowLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self { max_calls, window, admitted: Mutex::new(VecDeque::new()) }
    }

    /// Try to admit one call now.
    ///
    /// # Errors
    ///
    /// Returns the duration until the oldest in-window admission ages
    /// out, i.e. the earliest moment a retry can succeed.
    pub async fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut admitted = self.admitted.lock().await;

        while let Some(oldest) = admitted.front() {
            if now.duration_since(*oldest) >= self.window {
                admitted.pop_front();
            } else {
                break;
            }
        }

        if admitted.len() >= self.max_calls {
            // Safe: the queue is non-empty when at capacity.
            let oldest = *admitted.front().ok_or(self.window)?;
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(retry_after);
        }

        admitted.push_back(now);
        Ok(())
    }
}
