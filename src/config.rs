//! Console configuration.
//!
//! [`ConsoleConfig`] carries the backend location, the application identity
//! used to scope push status messages, and the timing knobs for polling,
//! push-channel reconnection, and one-shot request timeouts.

use std::time::Duration;

/// Configuration for the console core.
///
/// All timing fields have defaults matching the observed backend behaviour;
/// override them with the builder-style setters or struct-update syntax.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use regdesk::ConsoleConfig;
///
/// let config = ConsoleConfig::new("http://127.0.0.1:5000", "admin-console")
///     .poll_interval(Duration::from_secs(1));
/// assert_eq!(config.poll_interval, Duration::from_secs(1));
/// assert_eq!(config.push_reconnect_delay, Duration::from_secs(3));
/// assert_eq!(config.request_timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Base URL of the backend, without a trailing slash
    /// (e.g., `"http://127.0.0.1:5000"`).
    pub base_url: String,

    /// Identity of this console on the shared push status channel.
    ///
    /// Push messages carrying a different `appId` are ignored, so several
    /// consoles can share one channel without cross-talk.
    pub app_id: String,

    /// How often the lock gate polls the status endpoint.
    ///
    /// Each successful poll replaces the lock state wholesale; the push
    /// channel merely shortens the latency between polls.
    ///
    /// Default: 3 seconds.
    pub poll_interval: Duration,

    /// Fixed delay between push-channel reconnection attempts.
    ///
    /// Reconnection is unbounded: the gate keeps retrying at this cadence
    /// until it is shut down. No backoff, no jitter -- the channel carries a
    /// low-stakes boolean and a missed window is covered by polling.
    ///
    /// Default: 3 seconds.
    pub push_reconnect_delay: Duration,

    /// Timeout applied to every one-shot request (status checks, roster
    /// fetches, mutation triggers).
    ///
    /// Streaming transports (log consoles, the push channel) are exempt;
    /// they are expected to stay open indefinitely.
    ///
    /// Default: 10 seconds.
    pub request_timeout: Duration,
}

impl ConsoleConfig {
    /// Create a configuration with default timings.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Backend base URL; a trailing slash is stripped.
    /// * `app_id` - This console's identity on the push channel.
    pub fn new(base_url: impl Into<String>, app_id: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            app_id: app_id.into(),
            poll_interval: Duration::from_secs(3),
            push_reconnect_delay: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Set the status polling interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the fixed push-channel reconnect delay.
    pub fn push_reconnect_delay(mut self, delay: Duration) -> Self {
        self.push_reconnect_delay = delay;
        self
    }

    /// Set the one-shot request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ConsoleConfig::new("http://localhost:5000", "console");
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.push_reconnect_delay, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let config = ConsoleConfig::new("http://localhost:5000//", "console");
        assert_eq!(config.base_url, "http://localhost:5000");
    }

    #[test]
    fn setters_override_defaults() {
        let config = ConsoleConfig::new("http://localhost:5000", "console")
            .poll_interval(Duration::from_millis(250))
            .push_reconnect_delay(Duration::from_millis(500))
            .request_timeout(Duration::from_secs(2));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.push_reconnect_delay, Duration::from_millis(500));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }
}
