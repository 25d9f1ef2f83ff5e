//! Retry backoff schedule.
//!
//! Exponential in the number of attempts already made, capped at the
//! configured maximum, then jittered by ±20% so parallel reporters do not
//! retry in lockstep.

use std::time::Duration;

use rand::Rng;

use super::config::UploaderConfig;

/// Deterministic delay for the given attempt number (1-based, the attempt
/// that just failed). Doubles per attempt up to `max_backoff`.
pub(crate) fn backoff_schedule(attempt: u32, config: &UploaderConfig) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    config
        .base_backoff
        .saturating_mul(2u32.saturating_pow(exponent))
        .min(config.max_backoff)
}

/// Jitter a delay by ±20%.
pub(crate) fn jittered(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.8..=1.2);
    delay.mul_f64(factor)
}

/// Delay before the next attempt after `attempt` failed.
pub(crate) fn backoff_for_attempt(attempt: u32, config: &UploaderConfig) -> Duration {
    jittered(backoff_schedule(attempt, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> UploaderConfig {
        UploaderConfig {
            base_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(300),
            ..Default::default()
        }
    }

    #[test]
    fn test_schedule_doubles_per_attempt() {
        let config = config();
        assert_eq!(backoff_schedule(1, &config), Duration::from_secs(5));
        assert_eq!(backoff_schedule(2, &config), Duration::from_secs(10));
        assert_eq!(backoff_schedule(3, &config), Duration::from_secs(20));
        assert_eq!(backoff_schedule(4, &config), Duration::from_secs(40));
    }

    #[test]
    fn test_schedule_is_capped() {
        let config = config();
        assert_eq!(backoff_schedule(8, &config), Duration::from_secs(300));
        assert_eq!(backoff_schedule(30, &config), Duration::from_secs(300));
    }

    #[test]
    fn test_schedule_is_monotonically_non_decreasing() {
        let config = config();
        let mut previous = Duration::ZERO;
        for attempt in 1..=16 {
            let delay = backoff_schedule(attempt, &config);
            assert!(delay >= previous, "Backoff shrank at attempt {attempt}");
            previous = delay;
        }
    }

    #[test]
    fn test_jitter_stays_within_twenty_percent() {
        let base = Duration::from_secs(100);
        for _ in 0..200 {
            let delay = jittered(base);
            assert!(delay >= Duration::from_secs(80), "Jitter below -20%: {delay:?}");
            assert!(delay <= Duration::from_secs(120), "Jitter above +20%: {delay:?}");
        }
    }

    #[test]
    fn test_jittered_attempts_never_reorder() {
        // Consecutive jittered delays still never decrease: the schedule
        // doubles while jitter spans at most a 1.5x ratio.
        let config = config();
        for _ in 0..100 {
            for attempt in 1..=6 {
                let current = backoff_for_attempt(attempt, &config);
                let next = backoff_for_attempt(attempt + 1, &config);
                assert!(next >= current);
            }
        }
    }
}
