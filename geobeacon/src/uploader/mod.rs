//! Uploader: remote sink contract and queue drain worker.
//!
//! The [`UploadWorker`] daemon is the queue's single consumer; the
//! [`RemoteSink`] trait is the abstract cloud document store it delivers
//! to. Delivery policy (timeout, exponential backoff with jitter, retry
//! ceiling) lives here; storage transitions live in the queue.

mod backoff;
mod config;
mod sink;
mod worker;

pub use config::{
    UploaderConfig, DEFAULT_BASE_BACKOFF, DEFAULT_IDLE_WAIT, DEFAULT_MAX_BACKOFF,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use sink::{RemoteSink, SinkError};
pub use worker::UploadWorker;
