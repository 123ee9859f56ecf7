//! chpa-e2e
//!
//! CLI for rendering CHPA descriptors and running the autoscaling suite.

use clap::Parser;

use chpa_e2e::{telemetry, Cli, Result};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let cli = Cli::parse();
    cli.run().await
}
