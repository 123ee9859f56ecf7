//! Run command - Execute scenarios against the current cluster
//!
//! Usage: chpa-e2e run [--config harness.json] [--scenario raise-to-max]...
//!
//! Checks the cluster is reachable, optionally starts the controller, runs
//! the selected scenarios one after another, then purges everything carrying
//! the suite label. Exits non-zero if any scenario did not pass.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::config::HarnessConfig;
use crate::context::HarnessContext;
use crate::scenario::{Scenario, TestOrchestrator};
use crate::scenarios;
use crate::{Error, Result};

/// Suite name used in the summary
pub const SUITE_NAME: &str = "cpu-autoscaling";

/// Run scenarios
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Harness config file (JSON)
    #[arg(short, long, env = "CHPA_E2E_CONFIG")]
    pub config: Option<PathBuf>,

    /// Scenario to run; repeatable. All built-in scenarios when omitted.
    #[arg(short, long = "scenario")]
    pub scenarios: Vec<String>,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let config = match args.config {
        Some(ref path) => HarnessConfig::load(path)?,
        None => HarnessConfig::from_env()?,
    };
    let selected = select(&args.scenarios)?;
    info!(
        "Running {} scenario(s) with label {}",
        selected.len(),
        config.label_selector()
    );

    let mut ctx = HarnessContext::from_config(config);
    TestOrchestrator::new(SUITE_NAME)
        .run_suite(&mut ctx, &selected)
        .await?
        .into_result()
}

fn select(names: &[String]) -> Result<Vec<Scenario>> {
    if names.is_empty() {
        return Ok(scenarios::all());
    }
    names
        .iter()
        .map(|name| {
            scenarios::by_name(name)
                .ok_or_else(|| Error::config(format!("unknown scenario '{}'", name)))
        })
        .collect()
}
