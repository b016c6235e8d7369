//! planbench CLI
//!
//! Command-line interface for running motion-planning experiment batches.

use anyhow::Result;
use clap::Parser;
use planbench::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Run the batch
    cli.run().await?;

    Ok(())
}
