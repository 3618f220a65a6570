use std::time::{Duration, Instant};

use tokio::time::sleep;

/// Deadline-bounded polling. Replaces fixed sleeps with "check, then wait a
/// little" loops:
///
/// ```ignore
/// let mut poll = Poll::new(timeout, interval);
/// loop {
///     if ready() { break; }
///     if !poll.tick().await { break; } // timed out
/// }
/// ```
#[derive(Debug)]
pub struct Poll {
    start: Instant,
    timeout: Duration,
    interval: Duration,
    attempts: u32,
}

impl Poll {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            start: Instant::now(),
            timeout,
            interval: interval.max(Duration::from_millis(1)),
            attempts: 0,
        }
    }

    /// Sleeps until the next attempt. Returns `false` once the deadline has
    /// passed; the final sleep is clipped to the time remaining.
    pub async fn tick(&mut self) -> bool {
        self.attempts = self.attempts.saturating_add(1);
        let elapsed = self.start.elapsed();
        if elapsed >= self.timeout {
            return false;
        }
        sleep(self.interval.min(self.timeout - elapsed)).await;
        true
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_poll_times_out() {
        let mut poll = Poll::new(Duration::from_millis(30), Duration::from_millis(10));
        let mut ticks = 0;
        while poll.tick().await {
            ticks += 1;
            assert!(ticks < 100, "poll never expired");
        }
        assert!(poll.elapsed() >= Duration::from_millis(30));
        assert!(ticks >= 1);
    }

    #[tokio::test]
    async fn test_zero_timeout_never_sleeps() {
        let mut poll = Poll::new(Duration::ZERO, Duration::from_secs(5));
        assert!(!poll.tick().await);
        assert_eq!(poll.attempts(), 1);
    }
}
