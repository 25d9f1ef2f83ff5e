//! GeoBeacon CLI - command-line host for the background location reporter.
//!
//! Plays the role of the host application: wires a (simulated) location
//! provider and a document sink into the reporter service and exposes the
//! start/stop control surface as a foreground process.

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod sim;

use commands::inspect::InspectArgs;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "geobeacon")]
#[command(version = geobeacon::VERSION)]
#[command(about = "Background location reporter with a durable upload queue", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report location to a JSON-lines document file until interrupted
    Run(RunArgs),
    /// Show queue depth and permanently failed pings
    Inspect(InspectArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run(args) => commands::run::run(args).await,
        Command::Inspect(args) => commands::inspect::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
