//! Sampler configuration.

use std::time::Duration;

/// Default interval between position samples (10 minutes).
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(600);

/// Default bound on waiting for a single fix.
pub const DEFAULT_FIX_WAIT: Duration = Duration::from_secs(30);

/// Configuration for the location sampler.
#[derive(Clone, Copy, Debug)]
pub struct SamplerConfig {
    /// Interval between sampling ticks. The first tick fires immediately
    /// on start.
    pub sample_interval: Duration,

    /// Maximum time to wait for the provider to produce a fix; a tick
    /// whose fix does not arrive in time is skipped.
    pub fix_wait: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            fix_wait: DEFAULT_FIX_WAIT,
        }
    }
}
