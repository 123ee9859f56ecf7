//! CHPA end-to-end harness
//!
//! Drives a live cluster to check what the CHPA controller does: create a
//! workload, apply an autoscaler descriptor, add or remove load, then poll
//! the observed replica count until it matches an expectation or a deadline
//! passes. The harness never implements autoscaling itself.
//!
//! # Modules
//!
//! - [`cluster`] - Workload fixtures and replica observation
//! - [`fixture_store`] - Scoped descriptor files
//! - [`load`] - In-cluster traffic generators
//! - [`poll`] - Convergence polling
//! - [`scenario`] - Scenario steps, sequencing and reporting
//! - [`scenarios`] - Built-in scenario catalogue
//! - [`context`] - Suite-wide state and setup/teardown
//! - [`kubectl`] - External control tool seam
//!
//! Descriptor construction lives in the `chpa-spec` crate.

pub mod cluster;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod fixture_store;
pub mod kubectl;
pub mod load;
pub mod manager;
pub mod poll;
pub mod scenario;
pub mod scenarios;
pub mod telemetry;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// chpa-e2e - integration tests for the CHPA autoscaler
#[derive(Parser, Debug)]
#[command(name = "chpa-e2e")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print an autoscaler descriptor
    Render(commands::render::RenderArgs),
    /// List built-in scenarios
    List(commands::list::ListArgs),
    /// Run scenarios against the current cluster
    Run(commands::run::RunArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Render(args) => commands::render::run(args),
            Commands::List(args) => commands::list::run(args),
            Commands::Run(args) => commands::run::run(args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_render() {
        let cli = Cli::try_parse_from([
            "chpa-e2e",
            "render",
            "--name",
            "web",
            "--max-replicas",
            "8",
            "--set",
            "minReplicas=2",
            "--set",
            "tolerance=0.2",
        ])
        .unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.max_replicas, 8);
                assert_eq!(args.set, vec!["minReplicas=2", "tolerance=0.2"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_repeated_scenarios() {
        let cli = Cli::try_parse_from([
            "chpa-e2e",
            "run",
            "--scenario",
            "raise-to-max",
            "-s",
            "incorrect-spec",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => assert_eq!(args.scenarios.len(), 2),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_requires_max_replicas() {
        assert!(Cli::try_parse_from(["chpa-e2e", "render", "--name", "web"]).is_err());
    }
}
