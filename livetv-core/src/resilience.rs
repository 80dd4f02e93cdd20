//! Timeouts and request defaults for outbound calls
//!
//! Every network operation in the engine carries an explicit timeout and is
//! never retried by the failing call itself; the next scheduled refresh is
//! the retry.

use std::time::Duration;

/// Default timeout for directory and overlay fetches
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for a single liveness probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// User agent sent with probes when the stream does not specify one
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Timeout configuration
#[derive(Debug, Clone, Copy)]
pub struct TimeoutConfig {
    pub fetch: Duration,
    pub probe: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            fetch: FETCH_TIMEOUT,
            probe: PROBE_TIMEOUT,
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set directory fetch timeout
    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch = timeout;
        self
    }

    /// Set probe timeout
    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe = timeout;
        self
    }
}

/// Clamp a configured timeout so a zero value still bounds the call.
#[must_use]
pub fn bounded(timeout: Duration, fallback: Duration) -> Duration {
    if timeout.is_zero() {
        fallback
    } else {
        timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_builder() {
        let config = TimeoutConfig::new()
            .with_fetch_timeout(Duration::from_secs(3))
            .with_probe_timeout(Duration::from_millis(500));
        assert_eq!(config.fetch, Duration::from_secs(3));
        assert_eq!(config.probe, Duration::from_millis(500));
    }

    #[test]
    fn test_bounded_replaces_zero() {
        assert_eq!(bounded(Duration::ZERO, FETCH_TIMEOUT), FETCH_TIMEOUT);
        assert_eq!(bounded(Duration::from_secs(1), FETCH_TIMEOUT), Duration::from_secs(1));
    }
}
