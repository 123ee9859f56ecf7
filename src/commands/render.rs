//! Render command - Print an autoscaler descriptor without touching a cluster
//!
//! Usage: chpa-e2e render --name web --max-replicas 8 --target web --set minReplicas=2

use clap::Args;
use serde_json::Value;

use chpa_spec::{Overrides, SpecBuilder};

use crate::{Error, Result};

/// Render a descriptor
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Descriptor name
    #[arg(long)]
    pub name: String,

    /// Upper replica bound
    #[arg(long)]
    pub max_replicas: u32,

    /// Deployment to scale (defaults to the descriptor name)
    #[arg(long)]
    pub target: Option<String>,

    /// Tuning override as key=value; values are parsed as JSON when possible
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

pub fn run(args: RenderArgs) -> Result<()> {
    println!("{}", render(&args)?);
    Ok(())
}

fn render(args: &RenderArgs) -> Result<String> {
    let pairs = args
        .set
        .iter()
        .map(|s| parse_set(s))
        .collect::<Result<Vec<_>>>()?;
    let overrides = Overrides::from_pairs(pairs)?;
    let target = args.target.as_deref().unwrap_or(&args.name);

    let spec = SpecBuilder::new(&args.name, args.max_replicas, target)
        .overrides(overrides)
        .build()?;
    Ok(spec.serialize())
}

/// Split `key=value`; `2` and `0.5` become numbers, anything that is not
/// valid JSON stays a string
fn parse_set(s: &str) -> Result<(String, Value)> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| Error::config(format!("expected KEY=VALUE, got '{}'", s)))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
