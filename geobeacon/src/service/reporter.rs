//! Reporter service facade.
//!
//! [`ReporterService`] owns the durable queue and wires the sampler and
//! upload worker into a pipeline on `start_reporting`, tearing it down
//! again on `stop_reporting`. These two calls are the whole host control
//! surface: each returns a status string or an error, mirroring the
//! method-channel bridge a mobile host exposes to its UI layer.
//!
//! Lifecycle guarantees:
//! - `start_reporting` is idempotent while starting/running.
//! - `stop_reporting` is safe at any time, including mid-upload: the
//!   in-flight attempt gets a bounded grace period, after which it is
//!   abandoned and the entry is repaired by the next start's recovery
//!   scan. Queued-but-undelivered entries always persist for the next
//!   start.
//! - A fatal queue failure stops the pipeline and forces the state to
//!   Stopped with a diagnostic; the service never panics for it.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::config::ReporterConfig;
use super::error::ServiceError;
use super::state::{ReporterState, StartAttempt, StateCell, StopAttempt};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink, TracingDiagnosticSink};
use crate::queue::{PingQueue, QueueConfig, QueueError};
use crate::source::{LocationProvider, Sampler};
use crate::uploader::{RemoteSink, UploadWorker};

/// Status string returned when reporting starts.
pub const STATUS_STARTED: &str = "background reporting started";
/// Status string returned when reporting is already active.
pub const STATUS_ALREADY_RUNNING: &str = "background reporting already running";
/// Status string returned when reporting stops.
pub const STATUS_STOPPED: &str = "background reporting stopped";
/// Status string returned when reporting is already inactive.
pub const STATUS_ALREADY_STOPPED: &str = "background reporting already stopped";

/// Snapshot of the reporter for host status displays.
#[derive(Debug, Clone)]
pub struct ReporterStatus {
    /// Current lifecycle state.
    pub state: ReporterState,
    /// Entries awaiting delivery.
    pub pending: u64,
    /// Permanently failed entries retained for inspection.
    pub failed: u64,
}

/// Handles of a running pipeline.
struct Pipeline {
    shutdown: CancellationToken,
    sampler: JoinHandle<()>,
    supervisor: JoinHandle<()>,
    worker_abort: AbortHandle,
}

/// High-level facade orchestrating the reporting pipeline.
pub struct ReporterService<P, S>
where
    P: LocationProvider + 'static,
    S: RemoteSink + 'static,
{
    config: ReporterConfig,
    queue: Arc<PingQueue>,
    provider: Arc<P>,
    sink: Arc<S>,
    diagnostics: Arc<dyn DiagnosticSink>,
    state: Arc<StateCell>,
    pipeline: Mutex<Option<Pipeline>>,
}

impl<P, S> ReporterService<P, S>
where
    P: LocationProvider + 'static,
    S: RemoteSink + 'static,
{
    /// Create a reporter service with the default tracing diagnostics.
    ///
    /// Opens (creating if needed) the durable queue; entries left in
    /// flight by an unclean shutdown are recovered here.
    pub fn new(config: ReporterConfig, provider: P, sink: S) -> Result<Self, ServiceError> {
        Self::with_diagnostics(config, provider, sink, Arc::new(TracingDiagnosticSink))
    }

    /// Create a reporter service with a custom diagnostic sink.
    pub fn with_diagnostics(
        config: ReporterConfig,
        provider: P,
        sink: S,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, ServiceError> {
        let queue_config = QueueConfig {
            max_attempts: config.max_attempts,
        };
        let queue = match &config.queue_path {
            Some(path) => PingQueue::open(path, queue_config)?,
            None => PingQueue::open_in_memory(queue_config)?,
        };

        Ok(Self {
            config,
            queue: Arc::new(queue),
            provider: Arc::new(provider),
            sink: Arc::new(sink),
            diagnostics,
            state: Arc::new(StateCell::new()),
            pipeline: Mutex::new(None),
        })
    }

    /// Start background reporting.
    ///
    /// Idempotent while starting or running. Runs the queue's recovery
    /// scan, seeds the session sequence above anything still queued, and
    /// spawns the sampler and upload worker.
    pub async fn start_reporting(&self) -> Result<String, ServiceError> {
        match self.state.begin_start() {
            StartAttempt::AlreadyActive => return Ok(STATUS_ALREADY_RUNNING.to_string()),
            StartAttempt::StoppingInProgress => return Err(ServiceError::StopInProgress),
            StartAttempt::Begun => {}
        }
        self.emit_state_change(ReporterState::Stopped, ReporterState::Starting);

        match self.spin_up().await {
            Ok(pipeline) => {
                let mut slot = self.pipeline.lock().await;
                // A pipeline left behind by a fatal worker exit is fully
                // cancelled; drop its handles
                if let Some(stale) = slot.replace(pipeline) {
                    stale.shutdown.cancel();
                    stale.worker_abort.abort();
                }
                drop(slot);

                let previous = self.state.set(ReporterState::Running);
                self.emit_state_change(previous, ReporterState::Running);
                info!("Background reporting started");
                Ok(STATUS_STARTED.to_string())
            }
            Err(e) => {
                let previous = self.state.set(ReporterState::Stopped);
                self.emit_state_change(previous, ReporterState::Stopped);
                error!(error = %e, "Failed to start background reporting");
                Err(e)
            }
        }
    }

    /// Stop background reporting.
    ///
    /// Cancels the sampler immediately, then gives the upload worker a
    /// bounded grace period to finish its in-flight attempt before
    /// abandoning it. Undelivered entries persist for the next start.
    pub async fn stop_reporting(&self) -> Result<String, ServiceError> {
        match self.state.begin_stop() {
            StopAttempt::AlreadyInactive => {
                // A fatal worker exit may have force-stopped the service
                // with its pipeline handles still parked; clean them up
                if let Some(stale) = self.pipeline.lock().await.take() {
                    stale.shutdown.cancel();
                    stale.worker_abort.abort();
                }
                return Ok(STATUS_ALREADY_STOPPED.to_string());
            }
            StopAttempt::Begun(previous) => {
                self.emit_state_change(previous, ReporterState::Stopping);
            }
        }

        if let Some(mut pipeline) = self.pipeline.lock().await.take() {
            // One token stops both daemons: the sampler exits at its next
            // await, the worker after its current attempt
            pipeline.shutdown.cancel();

            let _ = tokio::time::timeout(self.config.shutdown_grace, pipeline.sampler).await;

            match tokio::time::timeout(self.config.shutdown_grace, &mut pipeline.supervisor).await
            {
                Ok(_) => {}
                Err(_) => {
                    warn!(
                        grace_secs = self.config.shutdown_grace.as_secs(),
                        "Grace period elapsed, abandoning in-flight delivery attempt"
                    );
                    // The abandoned lease is reset to pending by the next
                    // start's recovery scan
                    pipeline.worker_abort.abort();
                    let _ = pipeline.supervisor.await;
                }
            }
        }

        let previous = self.state.set(ReporterState::Stopped);
        self.emit_state_change(previous, ReporterState::Stopped);
        info!("Background reporting stopped");
        Ok(STATUS_STOPPED.to_string())
    }

    /// Current lifecycle state plus queue depth for host status displays.
    pub fn status(&self) -> Result<ReporterStatus, ServiceError> {
        Ok(ReporterStatus {
            state: self.state.current(),
            pending: self.queue.pending_count()?,
            failed: self.queue.failed_count()?,
        })
    }

    /// Delete permanently failed entries retained for inspection.
    pub fn purge_failed(&self) -> Result<usize, ServiceError> {
        Ok(self.queue.purge_failed()?)
    }

    /// The underlying durable queue.
    pub fn queue(&self) -> &Arc<PingQueue> {
        &self.queue
    }

    /// Wire and spawn a fresh pipeline.
    async fn spin_up(&self) -> Result<Pipeline, ServiceError> {
        let recovered = self.queue.recover()?;
        if recovered > 0 {
            info!(recovered, "Recovered abandoned in-flight entries");
        }

        let first_sequence = self.queue.max_sequence()?.map_or(1, |max| max + 1);
        let shutdown = CancellationToken::new();

        let sampler = Sampler::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.queue),
            Arc::clone(&self.diagnostics),
            self.config.sampler,
            first_sequence,
        )
        .start(shutdown.clone());

        let worker = UploadWorker::new(
            Arc::clone(&self.sink),
            Arc::clone(&self.queue),
            Arc::clone(&self.diagnostics),
            self.config.uploader,
        )
        .start(shutdown.clone());

        let worker_abort = worker.abort_handle();
        let supervisor = tokio::spawn(supervise(
            worker,
            Arc::clone(&self.state),
            Arc::clone(&self.diagnostics),
        ));

        Ok(Pipeline {
            shutdown,
            sampler,
            supervisor,
            worker_abort,
        })
    }

    fn emit_state_change(&self, from: ReporterState, to: ReporterState) {
        if from != to {
            self.diagnostics
                .emit(DiagnosticEvent::ServiceStateChanged { from, to });
        }
    }
}

/// Watch the upload worker; a fatal queue error force-stops the service.
async fn supervise(
    worker: JoinHandle<Result<(), QueueError>>,
    state: Arc<StateCell>,
    diagnostics: Arc<dyn DiagnosticSink>,
) {
    match worker.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(error = %e, "Upload worker terminated, reporting stopped");
            let previous = state.set(ReporterState::Stopped);
            if previous != ReporterState::Stopped {
                diagnostics.emit(DiagnosticEvent::ServiceStateChanged {
                    from: previous,
                    to: ReporterState::Stopped,
                });
            }
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => {
            error!(error = %e, "Upload worker panicked, reporting stopped");
            let previous = state.set(ReporterState::Stopped);
            if previous != ReporterState::Stopped {
                diagnostics.emit(DiagnosticEvent::ServiceStateChanged {
                    from: previous,
                    to: ReporterState::Stopped,
                });
            }
        }
    }
}
