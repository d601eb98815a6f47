//! Reconnect retry policy for the push status channel.
//!
//! The policy is deliberately a standalone value rather than inline sleeps
//! in the transport loop: an unbounded retry loop with side effects on every
//! attempt is exactly the kind of logic that should be swappable and
//! testable without touching transport code.

use std::time::Duration;

/// Retry cadence for re-establishing the push status channel.
///
/// Fixed interval, unbounded attempts, no jitter. Exponential backoff is
/// intentionally absent: the channel carries a low-stakes control boolean,
/// polling covers any gap, and the one requirement is that retrying never
/// silently stops.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use regdesk::RetryPolicy;
///
/// let policy = RetryPolicy::fixed(Duration::from_secs(3));
/// assert_eq!(policy.delay_for(0), Duration::from_secs(3));
/// assert_eq!(policy.delay_for(1_000_000), Duration::from_secs(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    interval: Duration,
}

impl RetryPolicy {
    /// A policy that waits `interval` between every attempt, forever.
    pub const fn fixed(interval: Duration) -> Self {
        Self { interval }
    }

    /// Delay to wait before the given (zero-based) reconnect attempt.
    ///
    /// The attempt number is accepted so callers don't need to change if the
    /// policy ever grows a backoff curve; for a fixed policy it is ignored.
    pub fn delay_for(&self, _attempt: u64) -> Duration {
        self.interval
    }

    /// Sleep for the delay of the given attempt.
    pub async fn wait(&self, attempt: u64) {
        tokio::time::sleep(self.delay_for(attempt)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_ignores_attempt_number() {
        let policy = RetryPolicy::fixed(Duration::from_millis(50));
        assert_eq!(policy.delay_for(0), Duration::from_millis(50));
        assert_eq!(policy.delay_for(7), Duration::from_millis(50));
        assert_eq!(policy.delay_for(u64::MAX), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_sleeps_for_the_configured_interval() {
        let policy = RetryPolicy::fixed(Duration::from_secs(3));
        let before = tokio::time::Instant::now();
        policy.wait(42).await;
        assert_eq!(before.elapsed(), Duration::from_secs(3));
    }
}
