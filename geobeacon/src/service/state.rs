//! Reporter lifecycle state machine.
//!
//! States move `Stopped → Starting → Running → Stopping → Stopped`. The
//! cell makes the two entry transitions atomic so concurrent `start`/`stop`
//! calls cannot double-wire the pipeline.

use std::sync::Mutex;

/// Lifecycle state of the reporter service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    /// No pipeline running; queued entries persist for the next start.
    Stopped,
    /// Pipeline being wired (recovery scan, sequence seeding, spawns).
    Starting,
    /// Sampler and upload worker active.
    Running,
    /// Shutdown signalled; draining the in-flight attempt.
    Stopping,
}

impl std::fmt::Display for ReporterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

/// Outcome of requesting a start transition.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StartAttempt {
    /// Transitioned Stopped → Starting; caller owns the start.
    Begun,
    /// Already Starting or Running; start is an idempotent no-op.
    AlreadyActive,
    /// A stop is still draining; the caller must retry later.
    StoppingInProgress,
}

/// Outcome of requesting a stop transition.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StopAttempt {
    /// Transitioned to Stopping from the contained state; caller owns the
    /// stop.
    Begun(ReporterState),
    /// Already Stopped or Stopping; stop is an idempotent no-op.
    AlreadyInactive,
}

/// Shared, thread-safe lifecycle state.
pub(crate) struct StateCell {
    inner: Mutex<ReporterState>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(ReporterState::Stopped),
        }
    }

    pub(crate) fn current(&self) -> ReporterState {
        *self.lock()
    }

    /// Set the state unconditionally, returning the previous state.
    pub(crate) fn set(&self, to: ReporterState) -> ReporterState {
        std::mem::replace(&mut *self.lock(), to)
    }

    /// Atomically claim the Stopped → Starting transition.
    pub(crate) fn begin_start(&self) -> StartAttempt {
        let mut state = self.lock();
        match *state {
            ReporterState::Stopped => {
                *state = ReporterState::Starting;
                StartAttempt::Begun
            }
            ReporterState::Starting | ReporterState::Running => StartAttempt::AlreadyActive,
            ReporterState::Stopping => StartAttempt::StoppingInProgress,
        }
    }

    /// Atomically claim the transition into Stopping.
    pub(crate) fn begin_stop(&self) -> StopAttempt {
        let mut state = self.lock();
        match *state {
            ReporterState::Running | ReporterState::Starting => {
                let previous = *state;
                *state = ReporterState::Stopping;
                StopAttempt::Begun(previous)
            }
            ReporterState::Stopped | ReporterState::Stopping => StopAttempt::AlreadyInactive,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReporterState> {
        // A poisoned lock only means a panicked holder; the state value
        // itself is always coherent
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
