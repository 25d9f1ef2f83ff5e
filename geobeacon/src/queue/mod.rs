//! Durable ping queue.
//!
//! The queue is the single shared resource between the location sampler
//! (producer) and the upload worker (consumer). All cross-component
//! coordination is mediated by its transactional operations:
//!
//! - [`PingQueue::enqueue`] - append a captured sample (durable)
//! - [`PingQueue::lease_next`] - exclusive claim on the oldest eligible entry
//! - [`PingQueue::acknowledge`] - confirmed delivery, entry removed
//! - [`PingQueue::release`] - failed attempt, retry later or give up
//!
//! Backed by an embedded SQLite table so that undelivered samples survive
//! process restarts.

mod entry;
mod error;
mod store;

pub use entry::{EntryId, EntryState, QueueEntry};
pub use error::QueueError;
pub use store::{PingQueue, QueueConfig, DEFAULT_MAX_ATTEMPTS};
