//! Diagnostics for pipeline observability.
//!
//! The sampler, upload worker, and reporter service emit structured events
//! via a sink abstraction; they never decide how events are consumed. The
//! default sink forwards to `tracing`, a host application can install its
//! own to surface degraded-state signals in its UI.

use std::sync::Arc;

use crate::service::ReporterState;

/// Events emitted by the reporting pipeline.
///
/// Failures from the location source and the remote sink never propagate
/// as crashes; they surface here (and as service state) instead.
#[derive(Clone, Debug)]
pub enum DiagnosticEvent {
    /// The location source failed to produce a fix (permission, hardware,
    /// transport). The sampler stays up and keeps retrying acquisition.
    SourceUnavailable {
        reason: String,
        consecutive_failures: u32,
    },

    /// A fix was captured and durably queued.
    SampleCaptured { sequence: u64 },

    /// A sample was delivered and acknowledged by the remote sink.
    Delivered { sequence: u64, attempts: u32 },

    /// A sample was permanently failed: either the remote rejected it
    /// (`permanent`) or the retry ceiling was reached (`exhausted`).
    DeliveryFailed {
        sequence: u64,
        attempts: u32,
        permanent: bool,
        exhausted: bool,
    },

    /// Queue storage integrity failure; the pipeline has stopped and the
    /// database needs operator intervention.
    QueueCorrupted { detail: String },

    /// The reporter service changed lifecycle state.
    ServiceStateChanged {
        from: ReporterState,
        to: ReporterState,
    },
}

/// Sink for diagnostic events.
///
/// Implementations must be cheap and non-blocking; events are emitted from
/// the pipeline's hot paths.
pub trait DiagnosticSink: Send + Sync {
    /// Emit a diagnostic event.
    fn emit(&self, event: DiagnosticEvent);
}

/// Default sink that logs events via `tracing`.
pub struct TracingDiagnosticSink;

impl DiagnosticSink for TracingDiagnosticSink {
    fn emit(&self, event: DiagnosticEvent) {
        match &event {
            DiagnosticEvent::SourceUnavailable {
                reason,
                consecutive_failures,
            } => {
                tracing::warn!(%reason, consecutive_failures, "Location source unavailable");
            }
            DiagnosticEvent::SampleCaptured { sequence } => {
                tracing::debug!(sequence, "Sample captured");
            }
            DiagnosticEvent::Delivered { sequence, attempts } => {
                tracing::info!(sequence, attempts, "Ping delivered");
            }
            DiagnosticEvent::DeliveryFailed {
                sequence,
                attempts,
                permanent,
                exhausted,
            } => {
                tracing::warn!(sequence, attempts, permanent, exhausted, "Ping delivery failed");
            }
            DiagnosticEvent::QueueCorrupted { detail } => {
                tracing::error!(%detail, "Ping queue corrupted");
            }
            DiagnosticEvent::ServiceStateChanged { from, to } => {
                tracing::info!(%from, %to, "Reporter state changed");
            }
        }
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Arc<S> {
    fn emit(&self, event: DiagnosticEvent) {
        (**self).emit(event);
    }
}
