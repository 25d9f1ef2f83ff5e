//! Remote sink trait - the cloud document store contract.
//!
//! The library ships no vendor implementation; the host application
//! supplies one (HTTP, gRPC, a vendor SDK wrapper). The worker only ever
//! interprets the transient/permanent split of [`SinkError`].

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use crate::ping::LocationSample;

/// Delivery failure, split by whether a retry can succeed.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Network, timeout, or temporary remote condition; retried with
    /// backoff.
    #[error("transient delivery failure: {0}")]
    Transient(String),

    /// The remote rejected the sample (malformed, unauthorized document);
    /// recorded as failed and never retried.
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

/// Trait for the remote "latest location" document store.
pub trait RemoteSink: Send + Sync {
    /// Upsert the device's latest location document.
    ///
    /// Must be idempotent under retry: the sample's `sequence` is part of
    /// the write identity, so applying the same sequence twice has no
    /// additional effect.
    fn upsert_latest(
        &self,
        sample: LocationSample,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;
}

// Allow Arc<S> to be used as a sink so the service can hand the same
// instance to successive pipeline runs.
impl<S: RemoteSink> RemoteSink for Arc<S> {
    fn upsert_latest(
        &self,
        sample: LocationSample,
    ) -> impl Future<Output = Result<(), SinkError>> + Send {
        (**self).upsert_latest(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory last-value-wins sink recording applied sequences.
    struct MemorySink {
        latest: Mutex<Option<LocationSample>>,
        applied: Mutex<Vec<u64>>,
    }

    impl MemorySink {
        fn new() -> Self {
            Self {
                latest: Mutex::new(None),
                applied: Mutex::new(Vec::new()),
            }
        }
    }

    impl RemoteSink for MemorySink {
        async fn upsert_latest(&self, sample: LocationSample) -> Result<(), SinkError> {
            let mut applied = self.applied.lock().unwrap();
            if applied.contains(&sample.sequence) {
                // Same sequence applied twice: no additional effect
                return Ok(());
            }
            applied.push(sample.sequence);
            *self.latest.lock().unwrap() = Some(sample);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_per_sequence() {
        let sink = MemorySink::new();
        let sample = LocationSample::new(53.55, 9.99, 1);

        sink.upsert_latest(sample).await.unwrap();
        let after_first = *sink.latest.lock().unwrap();

        sink.upsert_latest(sample).await.unwrap();
        let after_second = *sink.latest.lock().unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(sink.applied.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_later_sequence_overwrites_latest() {
        let sink = MemorySink::new();
        sink.upsert_latest(LocationSample::new(53.55, 9.99, 1))
            .await
            .unwrap();
        sink.upsert_latest(LocationSample::new(43.6, 1.4, 2))
            .await
            .unwrap();

        let latest = sink.latest.lock().unwrap().unwrap();
        assert_eq!(latest.sequence, 2);
    }

    #[test]
    fn test_sink_error_display() {
        assert!(SinkError::Transient("timeout".to_string())
            .to_string()
            .contains("transient"));
        assert!(SinkError::Permanent("rejected".to_string())
            .to_string()
            .contains("permanent"));
    }
}
