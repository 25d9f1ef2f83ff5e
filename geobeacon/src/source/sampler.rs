//! Sampler - poll loop daemon for periodic position capture.
//!
//! The [`Sampler`] ticks at the configured interval, asks the
//! [`LocationProvider`] for a fix under a bounded wait, assigns the next
//! sequence number, and appends the sample to the durable queue. Source
//! failures degrade the pipeline (logged + diagnostic emitted) instead of
//! crashing it; the loop keeps retrying acquisition on every tick.
//!
//! Follows the daemon shape used throughout the crate:
//! - `new()` + `start()` → spawns async task
//! - Async `run()` loop with `tokio::time::interval`
//! - Cancellation token for graceful shutdown

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::SamplerConfig;
use super::provider::LocationProvider;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::ping::LocationSample;
use crate::queue::{PingQueue, QueueError};

/// Periodic position sampler daemon.
pub struct Sampler<P: LocationProvider> {
    provider: P,
    queue: Arc<PingQueue>,
    diagnostics: Arc<dyn DiagnosticSink>,
    config: SamplerConfig,
    next_sequence: u64,
}

impl<P: LocationProvider + 'static> Sampler<P> {
    /// Create a new sampler.
    ///
    /// `first_sequence` seeds the per-session counter; the service derives
    /// it from the highest sequence still queued so that sequences stay
    /// strictly increasing across restarts.
    pub fn new(
        provider: P,
        queue: Arc<PingQueue>,
        diagnostics: Arc<dyn DiagnosticSink>,
        config: SamplerConfig,
        first_sequence: u64,
    ) -> Self {
        Self {
            provider,
            queue,
            diagnostics,
            config,
            next_sequence: first_sequence,
        }
    }

    /// Start the sampler as an async task.
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(shutdown).await;
        })
    }

    /// Run the poll loop until the shutdown token fires.
    async fn run(mut self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.sample_interval.as_secs(),
            first_sequence = self.next_sequence,
            "Location sampler started"
        );

        let mut interval = tokio::time::interval(self.config.sample_interval);
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            let outcome = tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                outcome = tokio::time::timeout(
                    self.config.fix_wait,
                    self.provider.acquire_fix(),
                ) => outcome,
            };

            match outcome {
                Ok(Ok(fix)) => {
                    consecutive_failures = 0;
                    let sample =
                        LocationSample::new(fix.latitude, fix.longitude, self.next_sequence);
                    if !sample.is_valid() {
                        warn!(
                            latitude = fix.latitude,
                            longitude = fix.longitude,
                            "Discarding fix with out-of-range coordinates"
                        );
                        continue;
                    }
                    self.next_sequence += 1;

                    match self.queue.enqueue(&sample) {
                        Ok(_) => {
                            self.diagnostics.emit(DiagnosticEvent::SampleCaptured {
                                sequence: sample.sequence,
                            });
                        }
                        Err(e @ QueueError::Corruption { .. }) => {
                            self.diagnostics.emit(DiagnosticEvent::QueueCorrupted {
                                detail: e.to_string(),
                            });
                            shutdown.cancel();
                            break;
                        }
                        Err(e) => {
                            warn!(
                                error = %e,
                                sequence = sample.sequence,
                                "Failed to enqueue sample"
                            );
                        }
                    }
                }
                Ok(Err(e)) => {
                    consecutive_failures += 1;
                    warn!(
                        error = %e,
                        consecutive_failures,
                        "Failed to acquire fix"
                    );
                    self.diagnostics.emit(DiagnosticEvent::SourceUnavailable {
                        reason: e.to_string(),
                        consecutive_failures,
                    });
                }
                Err(_) => {
                    // No fix within the bounded wait: skip this tick
                    debug!(
                        wait_secs = self.config.fix_wait.as_secs(),
                        "No fix within bounded wait, skipping tick"
                    );
                }
            }
        }

        info!("Location sampler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueConfig;
    use crate::source::provider::{Fix, FixError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct NoopSink;

    impl DiagnosticSink for NoopSink {
        fn emit(&self, _event: DiagnosticEvent) {}
    }

    struct CollectingSink {
        events: Mutex<Vec<DiagnosticEvent>>,
    }

    impl CollectingSink {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        fn events(&self) -> Vec<DiagnosticEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl DiagnosticSink for CollectingSink {
        fn emit(&self, event: DiagnosticEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    /// Provider that cycles through scripted outcomes.
    struct ScriptedProvider {
        script: Vec<Result<Fix, FixError>>,
        cursor: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<Fix, FixError>>) -> Self {
            Self {
                script,
                cursor: AtomicUsize::new(0),
            }
        }
    }

    impl LocationProvider for ScriptedProvider {
        async fn acquire_fix(&self) -> Result<Fix, FixError> {
            let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.script.len();
            match &self.script[index] {
                Ok(fix) => Ok(*fix),
                Err(FixError::PermissionDenied) => Err(FixError::PermissionDenied),
                Err(FixError::Unavailable) => Err(FixError::Unavailable),
                Err(FixError::Io(msg)) => Err(FixError::Io(msg.clone())),
            }
        }
    }

    /// Provider that never produces a fix within any bounded wait.
    struct HangingProvider;

    impl LocationProvider for HangingProvider {
        async fn acquire_fix(&self) -> Result<Fix, FixError> {
            std::future::pending().await
        }
    }

    fn queue() -> Arc<PingQueue> {
        Arc::new(PingQueue::open_in_memory(QueueConfig::default()).unwrap())
    }

    fn fast_config() -> SamplerConfig {
        SamplerConfig {
            sample_interval: Duration::from_millis(10),
            fix_wait: Duration::from_millis(50),
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Condition not reached within timeout");
    }

    #[tokio::test]
    async fn test_samples_are_enqueued_with_increasing_sequences() {
        let queue = queue();
        let provider = ScriptedProvider::new(vec![Ok(Fix {
            latitude: 53.55,
            longitude: 9.99,
        })]);
        let sampler = Sampler::new(provider, Arc::clone(&queue), Arc::new(NoopSink), fast_config(), 1);

        let shutdown = CancellationToken::new();
        let handle = sampler.start(shutdown.clone());

        wait_for(|| queue.pending_count().unwrap() >= 3).await;
        shutdown.cancel();
        handle.await.unwrap();

        let first = queue.lease_next().unwrap().unwrap();
        assert_eq!(first.sample.sequence, 1);
        queue.acknowledge(first.id).unwrap();
        let second = queue.lease_next().unwrap().unwrap();
        assert_eq!(second.sample.sequence, 2);
    }

    #[tokio::test]
    async fn test_source_failure_degrades_without_stopping() {
        let queue = queue();
        let sink = Arc::new(CollectingSink::new());
        // Fails twice, then recovers
        let provider = ScriptedProvider::new(vec![
            Err(FixError::PermissionDenied),
            Err(FixError::Unavailable),
            Ok(Fix {
                latitude: 43.6,
                longitude: 1.4,
            }),
        ]);
        let sampler = Sampler::new(
            provider,
            Arc::clone(&queue),
            Arc::clone(&sink) as Arc<dyn DiagnosticSink>,
            fast_config(),
            1,
        );

        let shutdown = CancellationToken::new();
        let handle = sampler.start(shutdown.clone());

        wait_for(|| queue.pending_count().unwrap() >= 1).await;
        shutdown.cancel();
        handle.await.unwrap();

        let unavailable: Vec<u32> = sink
            .events()
            .iter()
            .filter_map(|e| match e {
                DiagnosticEvent::SourceUnavailable {
                    consecutive_failures,
                    ..
                } => Some(*consecutive_failures),
                _ => None,
            })
            .collect();
        assert!(unavailable.contains(&1));
        assert!(unavailable.contains(&2));
    }

    #[tokio::test]
    async fn test_slow_fix_skips_tick() {
        let queue = queue();
        let config = SamplerConfig {
            sample_interval: Duration::from_millis(10),
            fix_wait: Duration::from_millis(20),
        };
        let sampler = Sampler::new(HangingProvider, Arc::clone(&queue), Arc::new(NoopSink), config, 1);

        let shutdown = CancellationToken::new();
        let handle = sampler.start(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("Sampler should stop promptly")
            .unwrap();

        assert_eq!(queue.pending_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_fix_is_discarded_without_consuming_sequence() {
        let queue = queue();
        let provider = ScriptedProvider::new(vec![
            Ok(Fix {
                latitude: 95.0,
                longitude: 0.0,
            }),
            Ok(Fix {
                latitude: 53.55,
                longitude: 9.99,
            }),
        ]);
        let sampler = Sampler::new(provider, Arc::clone(&queue), Arc::new(NoopSink), fast_config(), 1);

        let shutdown = CancellationToken::new();
        let handle = sampler.start(shutdown.clone());

        wait_for(|| queue.pending_count().unwrap() >= 1).await;
        shutdown.cancel();
        handle.await.unwrap();

        // The discarded fix did not burn sequence 1
        let entry = queue.lease_next().unwrap().unwrap();
        assert_eq!(entry.sample.sequence, 1);
        assert!((entry.sample.latitude - 53.55).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stop_mid_wait_is_prompt() {
        let queue = queue();
        let config = SamplerConfig {
            sample_interval: Duration::from_millis(10),
            fix_wait: Duration::from_secs(3600),
        };
        let sampler = Sampler::new(HangingProvider, queue, Arc::new(NoopSink), config, 1);

        let shutdown = CancellationToken::new();
        let handle = sampler.start(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        // Cancellation must win over the hour-long fix wait
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("Sampler should stop promptly while waiting for a fix")
            .unwrap();
    }
}
