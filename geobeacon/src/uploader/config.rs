//! Upload worker configuration.

use std::time::Duration;

/// Default base delay for the exponential retry schedule.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(5);

/// Default ceiling for a single retry delay (5 minutes).
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Default timeout for a single upsert attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on idle suspension when the queue is empty.
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_secs(1);

/// Configuration for the upload worker.
#[derive(Clone, Copy, Debug)]
pub struct UploaderConfig {
    /// Base delay of the exponential retry schedule.
    pub base_backoff: Duration,

    /// Ceiling for a single retry delay.
    pub max_backoff: Duration,

    /// Timeout applied to each upsert attempt; an attempt that exceeds it
    /// counts as a transient failure.
    pub request_timeout: Duration,

    /// Maximum idle suspension before re-checking the queue, so retry
    /// times are honored even without new enqueues.
    pub idle_wait: Duration,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            idle_wait: DEFAULT_IDLE_WAIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UploaderConfig::default();
        assert_eq!(config.base_backoff, Duration::from_secs(5));
        assert_eq!(config.max_backoff, Duration::from_secs(300));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.idle_wait, Duration::from_secs(1));
    }
}
