//! Upload worker - drain loop daemon for queued samples.
//!
//! The [`UploadWorker`] is the single consumer of the durable queue. It
//! repeatedly leases the oldest eligible entry and attempts delivery to
//! the [`RemoteSink`] under a request timeout:
//!
//! - success → acknowledge (entry removed)
//! - transient failure or timeout → release with exponential backoff
//! - permanent failure → marked failed, never retried
//!
//! When the queue has no eligible entry, the loop suspends on the enqueue
//! signal bounded by an idle timeout, so retry times are honored even
//! without new samples. Queue corruption is fatal: the worker emits a
//! diagnostic, cancels the pipeline token, and exits with the error.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::backoff_for_attempt;
use super::config::UploaderConfig;
use super::sink::{RemoteSink, SinkError};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::queue::{EntryState, PingQueue, QueueEntry, QueueError};

/// Queue drain daemon delivering samples to the remote sink.
pub struct UploadWorker<S: RemoteSink> {
    sink: S,
    queue: Arc<PingQueue>,
    diagnostics: Arc<dyn DiagnosticSink>,
    config: UploaderConfig,
}

impl<S: RemoteSink + 'static> UploadWorker<S> {
    /// Create a new upload worker.
    pub fn new(
        sink: S,
        queue: Arc<PingQueue>,
        diagnostics: Arc<dyn DiagnosticSink>,
        config: UploaderConfig,
    ) -> Self {
        Self {
            sink,
            queue,
            diagnostics,
            config,
        }
    }

    /// Start the worker as an async task.
    ///
    /// The task resolves with `Err` only on a fatal queue error; on
    /// shutdown it finishes the current attempt and resolves with `Ok`.
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<Result<(), QueueError>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Run the drain loop until the shutdown token fires.
    async fn run(self, shutdown: CancellationToken) -> Result<(), QueueError> {
        info!(
            request_timeout_secs = self.config.request_timeout.as_secs(),
            "Upload worker started"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let leased = match self.queue.lease_next() {
                Ok(leased) => leased,
                Err(e) => {
                    self.handle_queue_error(e, &shutdown)?;
                    // Pause so a persistent storage error cannot hot-loop
                    tokio::time::sleep(self.config.idle_wait).await;
                    continue;
                }
            };

            match leased {
                Some(entry) => {
                    if let Err(e) = self.deliver(entry).await {
                        self.handle_queue_error(e, &shutdown)?;
                    }
                }
                None => {
                    // Suspend until new work arrives or a retry may have
                    // become eligible
                    tokio::select! {
                        biased;

                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::timeout(
                            self.config.idle_wait,
                            self.queue.notified(),
                        ) => {}
                    }
                }
            }
        }

        info!("Upload worker stopped");
        Ok(())
    }

    /// Attempt delivery of a leased entry and record the outcome.
    async fn deliver(&self, entry: QueueEntry) -> Result<(), QueueError> {
        let sequence = entry.sample.sequence;
        let attempt = entry.attempt_count;

        let result = match tokio::time::timeout(
            self.config.request_timeout,
            self.sink.upsert_latest(entry.sample),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SinkError::Transient("request timed out".to_string())),
        };

        match result {
            Ok(()) => {
                self.queue.acknowledge(entry.id)?;
                debug!(sequence, attempt, "Ping delivered");
                self.diagnostics.emit(DiagnosticEvent::Delivered {
                    sequence,
                    attempts: attempt,
                });
            }
            Err(SinkError::Permanent(reason)) => {
                self.queue.mark_failed(entry.id)?;
                warn!(sequence, attempt, %reason, "Remote rejected ping, giving up");
                self.diagnostics.emit(DiagnosticEvent::DeliveryFailed {
                    sequence,
                    attempts: attempt,
                    permanent: true,
                    exhausted: false,
                });
            }
            Err(SinkError::Transient(reason)) => {
                let backoff = backoff_for_attempt(attempt, &self.config);
                match self.queue.release(entry.id, backoff)? {
                    EntryState::Pending => {
                        debug!(
                            sequence,
                            attempt,
                            backoff_ms = backoff.as_millis() as u64,
                            %reason,
                            "Delivery failed, will retry"
                        );
                    }
                    state => {
                        debug_assert_eq!(state, EntryState::Failed);
                        warn!(sequence, attempt, %reason, "Retry ceiling reached, giving up");
                        self.diagnostics.emit(DiagnosticEvent::DeliveryFailed {
                            sequence,
                            attempts: attempt,
                            permanent: false,
                            exhausted: true,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Classify a queue error: corruption kills the pipeline, anything
    /// else is logged and retried after a short pause.
    fn handle_queue_error(
        &self,
        error: QueueError,
        shutdown: &CancellationToken,
    ) -> Result<(), QueueError> {
        if error.is_fatal() {
            self.diagnostics.emit(DiagnosticEvent::QueueCorrupted {
                detail: error.to_string(),
            });
            shutdown.cancel();
            return Err(error);
        }
        warn!(error = %error, "Queue operation failed, will retry");
        Ok(())
    }
}
