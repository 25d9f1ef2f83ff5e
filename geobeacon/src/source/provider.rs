//! Location provider trait and fix types.
//!
//! The [`LocationProvider`] trait abstracts over the platform's location
//! services (fused GPS, network positioning, a simulator). The sampler
//! only ever sees the trait, so fix acquisition strategy stays an
//! external concern.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

/// A raw geolocation reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

/// Errors from fix acquisition.
///
/// None of these are fatal to the pipeline: the sampler logs them, emits a
/// degraded-state diagnostic, and keeps retrying on the next tick.
#[derive(Debug, Error)]
pub enum FixError {
    /// The platform denied access to location services.
    #[error("location permission denied")]
    PermissionDenied,

    /// Location hardware or service is currently unavailable.
    #[error("location service unavailable")]
    Unavailable,

    /// Transport or platform error while acquiring a fix.
    #[error("fix acquisition failed: {0}")]
    Io(String),
}

/// Trait for acquiring position fixes from the platform.
pub trait LocationProvider: Send + Sync {
    /// Acquire the current position.
    ///
    /// Callers bound the wait; implementations need not enforce their own
    /// deadline.
    fn acquire_fix(&self) -> impl Future<Output = Result<Fix, FixError>> + Send;
}

// Allow Arc<P> to be used as a provider so the service can hand the same
// instance to successive pipeline runs.
impl<P: LocationProvider> LocationProvider for Arc<P> {
    fn acquire_fix(&self) -> impl Future<Output = Result<Fix, FixError>> + Send {
        (**self).acquire_fix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider;

    impl LocationProvider for FixedProvider {
        async fn acquire_fix(&self) -> Result<Fix, FixError> {
            Ok(Fix {
                latitude: 53.5511,
                longitude: 9.9937,
            })
        }
    }

    #[tokio::test]
    async fn test_arc_provider_delegates() {
        let provider = Arc::new(FixedProvider);
        let fix = provider.acquire_fix().await.expect("Should acquire fix");
        assert!((fix.latitude - 53.5511).abs() < 1e-9);
    }

    #[test]
    fn test_fix_error_display() {
        assert_eq!(
            FixError::PermissionDenied.to_string(),
            "location permission denied"
        );
        assert!(FixError::Io("socket closed".to_string())
            .to_string()
            .contains("socket closed"));
    }
}
