//! List command - Print the built-in scenarios
//!
//! Usage: chpa-e2e list

use clap::Args;

use crate::scenarios;
use crate::Result;

/// List built-in scenarios
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Also print each scenario's steps
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run(args: ListArgs) -> Result<()> {
    for scenario in scenarios::all() {
        println!("{:30} {}", scenario.name(), scenario.description());
        if args.verbose {
            for step in scenario.steps() {
                println!("    {}", step);
            }
        }
    }
    Ok(())
}
