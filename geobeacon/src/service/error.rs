//! Service error types.

use thiserror::Error;

use crate::queue::QueueError;

/// Errors from the reporter service control surface.
///
/// Source and sink failures are not represented here: they degrade the
/// pipeline and surface as diagnostics, never as control-call errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Queue open or transactional failure.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// `start_reporting` was called while a previous stop is still
    /// draining its grace period.
    #[error("cannot start while a stop is in progress")]
    StopInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_error_converts() {
        let err: ServiceError = QueueError::Corruption {
            detail: "bad page".to_string(),
        }
        .into();
        assert!(err.to_string().contains("bad page"));
    }

    #[test]
    fn test_stop_in_progress_display() {
        assert!(ServiceError::StopInProgress
            .to_string()
            .contains("stop is in progress"));
    }
}
