// crates/lmine-cli/src/commands/epoch.rs
//
// `lmine epoch --time <unix>`: epoch lookup.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use lmine_core::{EngineParams, EpochId, Timestamp};
use lmine_engine::EpochClock;

use crate::config::CliConfig;
use crate::error::CliError;
use crate::output::{format_json, format_table, format_time, OutputFormat};

#[derive(Debug, Args)]
pub struct EpochCmd {
    /// Unix timestamp to look up.
    #[arg(long)]
    time: Timestamp,

    /// Start of epoch 1; defaults to the configured engine.
    #[arg(long)]
    start: Option<Timestamp>,

    /// Epoch length in seconds; defaults to the configured engine.
    #[arg(long)]
    epoch_duration: Option<u64>,
}

#[derive(Debug, Serialize, Tabled)]
struct EpochRow {
    #[tabled(rename = "Epoch")]
    epoch: EpochId,
    #[tabled(rename = "Starts")]
    starts: String,
    #[tabled(rename = "Ends")]
    ends: String,
    #[tabled(rename = "Elapsed (s)")]
    elapsed: u64,
}

/// Run the epoch subcommand.
pub fn run(cmd: &EpochCmd, config: &CliConfig, format: OutputFormat) -> Result<(), CliError> {
    let row = lookup(cmd, config)?;
    match format {
        OutputFormat::Json => println!("{}", format_json(&row)),
        OutputFormat::Table => println!("{}", format_table(&[row])),
    }
    Ok(())
}

fn lookup(cmd: &EpochCmd, config: &CliConfig) -> Result<EpochRow, CliError> {
    let base = config.engine.clone().unwrap_or_else(|| EngineParams::new(0));
    let clock = EpochClock::new(
        cmd.start.unwrap_or(base.start_time),
        cmd.epoch_duration.unwrap_or(base.epoch_duration),
    )?;
    let epoch = clock.epoch_of(cmd.time)?;
    Ok(EpochRow {
        epoch,
        starts: format_time(clock.start(epoch))?,
        ends: format_time(clock.end(epoch))?,
        elapsed: cmd.time - clock.start(epoch),
    })
}
