//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use geobeacon::queue::QueueError;
use geobeacon::service::ServiceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Failed to create the output sink
    SinkCreation(std::io::Error),
    /// Reporter service error
    Service(ServiceError),
    /// Direct queue access error (inspect command)
    Queue(QueueError),
    /// Failed to wait for shutdown signal
    Signal(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Queue(QueueError::Corruption { .. })
        | CliError::Service(ServiceError::Queue(QueueError::Corruption { .. })) = self
        {
            eprintln!();
            eprintln!("The queue database is corrupted. Move or delete it and");
            eprintln!("start again; undelivered pings in it cannot be recovered.");
        }

        process::exit(1);
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggingInit(e) => write!(f, "failed to initialize logging: {}", e),
            Self::SinkCreation(e) => write!(f, "failed to open output file: {}", e),
            Self::Service(e) => write!(f, "{}", e),
            Self::Queue(e) => write!(f, "{}", e),
            Self::Signal(e) => write!(f, "failed to wait for shutdown signal: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}

impl From<QueueError> for CliError {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}
