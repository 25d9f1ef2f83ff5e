//! Inspect command - examine the durable queue while the reporter is
//! stopped.

use std::path::PathBuf;

use clap::Args;

use geobeacon::queue::{PingQueue, QueueConfig};

use crate::error::CliError;

/// Arguments for the inspect command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path of the durable ping queue database
    #[arg(long, default_value = "geobeacon.db")]
    pub db: PathBuf,

    /// Delete permanently failed entries after listing them
    #[arg(long)]
    pub purge_failed: bool,
}

/// Run the inspect command.
///
/// Opening the queue runs its recovery scan, so this is meant for use
/// while no reporter is running against the same database.
pub fn run(args: InspectArgs) -> Result<(), CliError> {
    let queue = PingQueue::open(&args.db, QueueConfig::default())?;

    println!(
        "Queue {}: {} pending, {} permanently failed.",
        args.db.display(),
        queue.pending_count()?,
        queue.failed_count()?
    );

    let failed = queue.failed_entries()?;
    for entry in &failed {
        println!(
            "  failed sequence={} attempts={} lat={:.5} lon={:.5} captured={}",
            entry.sample.sequence,
            entry.attempt_count,
            entry.sample.latitude,
            entry.sample.longitude,
            entry.sample.captured_at.to_rfc3339(),
        );
    }

    if args.purge_failed {
        let removed = queue.purge_failed()?;
        println!("Purged {} failed entries.", removed);
    }

    Ok(())
}
