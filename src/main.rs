//! apichain - data-driven API test harness
//!
//! Runs YAML-defined HTTP cases against a backend, chaining tokens and
//! extracted values between cases through a shared variable store.

use apichain::common::logging;
use apichain::{cli, commands};
use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "apichain", about = "Data-driven API test harness")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.command.manages_logging() {
        logging::init_cli(false);
    }

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
