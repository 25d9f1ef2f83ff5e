//! GeoBeacon - reliable background location reporting.
//!
//! This library samples device location on a fixed interval, persists each
//! sample in a durable local queue, and drains the queue to a remote
//! document store with retry and backoff. The platform's location services
//! and the cloud store are abstract collaborators
//! ([`source::LocationProvider`], [`uploader::RemoteSink`]); everything in
//! between - durable ordering, exclusive leases, backoff, lifecycle - is
//! handled here.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use geobeacon::service::{ReporterConfig, ReporterService};
//!
//! let config = ReporterConfig::with_queue_path("pings.db");
//! let service = ReporterService::new(config, provider, sink)?;
//!
//! service.start_reporting().await?;
//! ```

pub mod diagnostics;
pub mod logging;
pub mod ping;
pub mod queue;
pub mod service;
pub mod source;
pub mod uploader;

/// Version of the GeoBeacon library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
