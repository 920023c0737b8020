//! Storefront E2E - browser end-to-end checks for the Swag Labs demo store
//!
//! Runs the login and inventory suite against a WebDriver endpoint (or the
//! built-in simulated storefront) and exits non-zero when any scenario fails.

use clap::Parser;
use std::path::PathBuf;
use storefront::common::{config::Config, logging};
use storefront::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "storefront-e2e", about = "End-to-end checks for the Swag Labs storefront")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/storefront-e2e/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(path) = logging::init(cli.log_file.as_deref()) {
        tracing::debug!("Logging to {}", path.display());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let result = match config {
        Ok(config) => cli::dispatch(cli.command, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
