//! Simulated collaborators for running the reporter without hardware.
//!
//! [`WanderingProvider`] plays the platform location service: a random
//! walk from seeded coordinates. [`JsonLinesSink`] plays the cloud
//! document store: each upsert appends the latest-location document to a
//! JSON-lines file, skipping sequences it has already applied so retries
//! stay idempotent.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use rand::Rng;

use geobeacon::ping::LocationSample;
use geobeacon::source::{Fix, FixError, LocationProvider};
use geobeacon::uploader::{RemoteSink, SinkError};

/// Step size of the random walk, in degrees (~50 m).
const WALK_STEP_DEGREES: f64 = 0.0005;

/// Location provider simulating a device wandering from a start position.
pub struct WanderingProvider {
    position: Mutex<(f64, f64)>,
}

impl WanderingProvider {
    /// Create a provider starting at the given coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            position: Mutex::new((latitude, longitude)),
        }
    }
}

impl LocationProvider for WanderingProvider {
    async fn acquire_fix(&self) -> Result<Fix, FixError> {
        let mut rng = rand::thread_rng();
        let (dlat, dlon) = (
            rng.gen_range(-WALK_STEP_DEGREES..=WALK_STEP_DEGREES),
            rng.gen_range(-WALK_STEP_DEGREES..=WALK_STEP_DEGREES),
        );

        let mut position = self
            .position
            .lock()
            .map_err(|_| FixError::Io("position state poisoned".to_string()))?;
        position.0 = (position.0 + dlat).clamp(-90.0, 90.0);
        position.1 = (position.1 + dlon).clamp(-180.0, 180.0);

        Ok(Fix {
            latitude: position.0,
            longitude: position.1,
        })
    }
}

/// Remote sink writing latest-location documents to a JSON-lines file.
///
/// `flake` is the probability of a simulated transient failure per
/// upsert, for exercising the retry path from the command line.
pub struct JsonLinesSink {
    file: Mutex<File>,
    applied: Mutex<BTreeSet<u64>>,
    flake: f64,
}

impl JsonLinesSink {
    /// Create (or append to) the output file.
    pub fn create<P: AsRef<Path>>(path: P, flake: f64) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            applied: Mutex::new(BTreeSet::new()),
            flake: flake.clamp(0.0, 1.0),
        })
    }
}

impl RemoteSink for JsonLinesSink {
    async fn upsert_latest(&self, sample: LocationSample) -> Result<(), SinkError> {
        if self.flake > 0.0 && rand::thread_rng().gen_bool(self.flake) {
            return Err(SinkError::Transient("simulated network failure".to_string()));
        }

        {
            let applied = self
                .applied
                .lock()
                .map_err(|_| SinkError::Permanent("sink state poisoned".to_string()))?;
            if applied.contains(&sample.sequence) {
                // Retried sequence: already applied, nothing to do
                return Ok(());
            }
        }

        let document = serde_json::json!({
            "location": {
                "latitude": sample.latitude,
                "longitude": sample.longitude,
            },
            "timestamp": sample.captured_at.to_rfc3339(),
            "sequence": sample.sequence,
            "isValid": true,
        });

        {
            let mut file = self
                .file
                .lock()
                .map_err(|_| SinkError::Permanent("sink state poisoned".to_string()))?;
            writeln!(file, "{document}")
                .and_then(|_| file.flush())
                .map_err(|e| SinkError::Transient(e.to_string()))?;
        }

        self.applied
            .lock()
            .map_err(|_| SinkError::Permanent("sink state poisoned".to_string()))?
            .insert(sample.sequence);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wandering_provider_stays_near_start() {
        let provider = WanderingProvider::new(53.5511, 9.9937);

        for _ in 0..10 {
            let fix = provider.acquire_fix().await.unwrap();
            assert!((fix.latitude - 53.5511).abs() < 0.1);
            assert!((fix.longitude - 9.9937).abs() < 0.1);
        }
    }

    #[tokio::test]
    async fn test_json_sink_writes_one_document_per_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pings.jsonl");
        let sink = JsonLinesSink::create(&path, 0.0).unwrap();

        let sample = LocationSample::new(53.55, 9.99, 1);
        sink.upsert_latest(sample).await.unwrap();
        // Retry of the same sequence has no additional effect
        sink.upsert_latest(sample).await.unwrap();
        sink.upsert_latest(LocationSample::new(53.56, 9.98, 2))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["sequence"], 1);
        assert_eq!(first["isValid"], true);
        assert!(first["location"]["latitude"].is_f64());
    }

    #[tokio::test]
    async fn test_always_flaky_sink_fails_transiently() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonLinesSink::create(dir.path().join("pings.jsonl"), 1.0).unwrap();

        let result = sink.upsert_latest(LocationSample::new(53.55, 9.99, 1)).await;
        assert!(matches!(result, Err(SinkError::Transient(_))));
    }
}
