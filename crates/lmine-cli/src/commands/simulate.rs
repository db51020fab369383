// crates/lmine-cli/src/commands/simulate.rs
//
// `lmine simulate --scenario <file>`: replay a scenario file.

use std::fs;

use clap::Args;

use crate::config::{expand_tilde, CliConfig};
use crate::error::CliError;
use crate::output::{format_json, format_table, OutputFormat};
use crate::scenario::Scenario;

#[derive(Debug, Args)]
pub struct SimulateCmd {
    /// Path to the scenario TOML file.
    #[arg(long)]
    scenario: String,
}

/// Run the simulate subcommand.
pub fn run(cmd: &SimulateCmd, config: &CliConfig, format: OutputFormat) -> Result<(), CliError> {
    let contents = fs::read_to_string(expand_tilde(&cmd.scenario))?;
    let scenario = Scenario::parse(&contents)?;
    tracing::info!(
        "Replaying {} steps over {} pools from {}",
        scenario.steps.len(),
        scenario.pools.len(),
        cmd.scenario
    );

    let report = scenario.run(config.engine.as_ref())?.report();
    let failed = report.steps.iter().filter(|s| !s.ok).count();

    match format {
        OutputFormat::Json => println!("{}", format_json(&report)),
        OutputFormat::Table => {
            println!("Steps");
            println!("{}", format_table(&report.steps));
            println!();
            match report.funded_through {
                Some(epoch) => println!(
                    "Pools ({} funded through epoch {})",
                    report.total_funded, epoch
                ),
                None => println!("Pools (no rewards funded)"),
            }
            println!("{}", format_table(&report.pools));
            println!();
            println!("Positions at {}", report.final_time);
            println!("{}", format_table(&report.positions));
            println!();
            println!(
                "{} steps, {} failed, invariants: {}",
                report.steps.len(),
                failed,
                report.invariants
            );
        }
    }

    Ok(())
}
