//! Queue entry types.

use chrono::{DateTime, Utc};

use crate::ping::LocationSample;

/// Opaque identifier of a queue entry (the storage row id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(i64);

impl EntryId {
    pub(crate) fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub(crate) fn raw(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery state of a queued sample.
///
/// `Delivered` is terminal and implemented as removal from storage, so it
/// never appears on a stored entry; it is reported by [`acknowledge`]
/// completing successfully.
///
/// [`acknowledge`]: super::PingQueue::acknowledge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Waiting for delivery (or for its retry time to arrive).
    Pending,
    /// Leased by the upload worker; exactly one attempt is underway.
    InFlight,
    /// Gave up permanently; retained for inspection until purged.
    Failed,
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InFlight => write!(f, "in-flight"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A queued sample together with its delivery metadata.
///
/// Owned by the queue; mutated only through its transactional API.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    /// Storage identity of this entry.
    pub id: EntryId,

    /// The captured sample awaiting delivery.
    pub sample: LocationSample,

    /// Number of delivery attempts started (incremented when leased).
    pub attempt_count: u32,

    /// Earliest time the entry is eligible for another lease.
    pub next_retry_at: DateTime<Utc>,

    /// Current delivery state.
    pub state: EntryState,
}
