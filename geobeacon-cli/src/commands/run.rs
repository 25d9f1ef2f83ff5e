//! Run command - report location until interrupted.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tracing::info;

use geobeacon::logging;
use geobeacon::service::{ReporterConfig, ReporterService};
use geobeacon::source::SamplerConfig;

use crate::error::CliError;
use crate::sim::{JsonLinesSink, WanderingProvider};

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path of the durable ping queue database
    #[arg(long, default_value = "geobeacon.db")]
    pub db: PathBuf,

    /// Output file receiving the latest-location documents
    #[arg(long, default_value = "pings.jsonl")]
    pub out: PathBuf,

    /// Seconds between location samples
    #[arg(long, default_value = "600")]
    pub interval_secs: u64,

    /// Starting latitude of the simulated walk
    #[arg(long, default_value = "53.5511", allow_hyphen_values = true)]
    pub lat: f64,

    /// Starting longitude of the simulated walk
    #[arg(long, default_value = "9.9937", allow_hyphen_values = true)]
    pub lon: f64,

    /// Probability (0.0-1.0) of a simulated transient delivery failure
    #[arg(long, default_value = "0.0")]
    pub flake: f64,

    /// Delivery attempts before a ping is permanently failed
    #[arg(long, default_value = "8")]
    pub max_attempts: u32,
}

/// Run the reporter until Ctrl-C.
pub async fn run(args: RunArgs) -> Result<(), CliError> {
    let _guard = logging::init_logging(logging::default_log_dir(), logging::default_log_file())
        .map_err(CliError::LoggingInit)?;

    info!(version = geobeacon::VERSION, "GeoBeacon starting");

    let provider = WanderingProvider::new(args.lat, args.lon);
    let sink = JsonLinesSink::create(&args.out, args.flake).map_err(CliError::SinkCreation)?;

    let config = ReporterConfig {
        queue_path: Some(args.db),
        max_attempts: args.max_attempts,
        sampler: SamplerConfig {
            sample_interval: Duration::from_secs(args.interval_secs),
            ..Default::default()
        },
        ..Default::default()
    };

    let service = ReporterService::new(config, provider, sink)?;

    println!("{}", service.start_reporting().await?);
    println!("Reporting every {}s; press Ctrl-C to stop.", args.interval_secs);

    tokio::signal::ctrl_c().await.map_err(CliError::Signal)?;

    println!("{}", service.stop_reporting().await?);

    let status = service.status()?;
    println!(
        "Queue: {} pending, {} permanently failed.",
        status.pending, status.failed
    );
    Ok(())
}
