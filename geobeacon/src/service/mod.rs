//! High-level reporter service.
//!
//! This module provides the facade a host application drives: create a
//! [`ReporterService`] with a location provider and a remote sink, then
//! control it through `start_reporting`/`stop_reporting`.
//!
//! # Example
//!
//! ```ignore
//! use geobeacon::service::{ReporterConfig, ReporterService};
//!
//! let config = ReporterConfig::with_queue_path("pings.db");
//! let service = ReporterService::new(config, provider, sink)?;
//!
//! let status = service.start_reporting().await?;
//! // ... later ...
//! let status = service.stop_reporting().await?;
//! ```

mod config;
mod error;
mod reporter;
mod state;

pub use config::{ReporterConfig, DEFAULT_SHUTDOWN_GRACE};
pub use error::ServiceError;
pub use reporter::{
    ReporterService, ReporterStatus, STATUS_ALREADY_RUNNING, STATUS_ALREADY_STOPPED,
    STATUS_STARTED, STATUS_STOPPED,
};
pub use state::ReporterState;
