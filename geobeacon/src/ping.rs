//! Core ping types for location reporting.
//!
//! A [`LocationSample`] is an immutable snapshot of the device position,
//! created by the sampler on each fix and destroyed once the remote sink
//! has acknowledged it. The `sequence` number is assigned at capture time
//! and is the write identity used for ordering and de-duplication all the
//! way to the remote document.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single captured location fix with its delivery identity.
///
/// Samples are value objects: once captured they are never mutated. The
/// `sequence` is strictly increasing within a reporting session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationSample {
    /// Latitude in decimal degrees.
    pub latitude: f64,

    /// Longitude in decimal degrees.
    pub longitude: f64,

    /// Wall-clock time the fix was captured.
    pub captured_at: DateTime<Utc>,

    /// Capture-time sequence number, the write identity for upserts.
    pub sequence: u64,
}

impl LocationSample {
    /// Capture a new sample at the current wall-clock time.
    pub fn new(latitude: f64, longitude: f64, sequence: u64) -> Self {
        Self {
            latitude,
            longitude,
            captured_at: Utc::now(),
            sequence,
        }
    }

    /// Check that the coordinates are finite and within WGS84 range.
    ///
    /// Invalid samples are discarded at capture rather than uploaded with
    /// a validity flag (the remote document only ever sees valid pings).
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }
}
