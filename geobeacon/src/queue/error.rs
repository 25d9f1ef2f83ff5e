//! Queue error types.

use thiserror::Error;

use super::entry::EntryId;

/// Errors from the durable ping queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Storage-layer integrity failure. Fatal for the queue instance:
    /// the service stops the pipeline and reports it; the database file
    /// needs operator intervention.
    #[error("queue storage corrupted: {detail}")]
    Corruption { detail: String },

    /// Recoverable storage error (I/O, busy, constraint).
    #[error("queue storage error: {0}")]
    Storage(rusqlite::Error),

    /// A sample with this sequence number is already queued.
    #[error("sequence {0} is already queued")]
    DuplicateSequence(u64),

    /// The entry is not currently leased, so it cannot be acknowledged,
    /// released, or failed.
    #[error("entry {0} is not in flight")]
    NotInFlight(EntryId),
}

impl QueueError {
    /// True for errors that poison the queue instance.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Corruption { .. })
    }
}

impl From<rusqlite::Error> for QueueError {
    fn from(e: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;

        let corrupt = matches!(
            &e,
            rusqlite::Error::SqliteFailure(err, _)
                if matches!(err.code, ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase)
        );

        if corrupt {
            Self::Corruption {
                detail: e.to_string(),
            }
        } else {
            Self::Storage(e)
        }
    }
}
