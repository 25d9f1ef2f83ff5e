//! Reporter service configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::queue::DEFAULT_MAX_ATTEMPTS;
use crate::source::SamplerConfig;
use crate::uploader::UploaderConfig;

/// Default grace period for finishing the in-flight attempt on stop.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Configuration for the reporter service.
#[derive(Clone, Debug)]
pub struct ReporterConfig {
    /// Path of the durable queue database. `None` keeps the queue in
    /// memory (tests and demos only: queued pings will not survive a
    /// restart).
    pub queue_path: Option<PathBuf>,

    /// Delivery attempts before an entry becomes permanently failed.
    pub max_attempts: u32,

    /// Location sampler settings.
    pub sampler: SamplerConfig,

    /// Upload worker settings.
    pub uploader: UploaderConfig,

    /// How long `stop_reporting` waits for the in-flight delivery attempt
    /// before abandoning it.
    pub shutdown_grace: Duration,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            queue_path: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sampler: SamplerConfig::default(),
            uploader: UploaderConfig::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl ReporterConfig {
    /// Configuration with a durable queue at the given path.
    pub fn with_queue_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            queue_path: Some(path.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReporterConfig::default();
        assert!(config.queue_path.is_none());
        assert_eq!(config.max_attempts, 8);
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_with_queue_path() {
        let config = ReporterConfig::with_queue_path("/tmp/pings.db");
        assert_eq!(config.queue_path, Some(PathBuf::from("/tmp/pings.db")));
    }
}
