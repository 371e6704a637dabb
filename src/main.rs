//! Commander - sandboxed command execution and file access
//!
//! CLI entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod app;
mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let config = app::load_config()?;
    let _telemetry = app::telemetry::init_tracing(config.log_file().as_deref());

    let cli = cli::Cli::parse();
    debug!("Starting Commander v{}", env!("CARGO_PKG_VERSION"));

    cli::run(cli, &config).await
}
