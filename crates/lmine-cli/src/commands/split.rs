// crates/lmine-cli/src/commands/split.rs
//
// `lmine split --amount <A> --epoch <e>`: vesting preview.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use lmine_core::{Amount, EngineParams, EpochId};
use lmine_engine::split_allocation;

use crate::config::CliConfig;
use crate::error::CliError;
use crate::output::{format_json, format_table, OutputFormat};

#[derive(Debug, Args)]
pub struct SplitCmd {
    /// Allocation to split.
    #[arg(long)]
    amount: Amount,

    /// Epoch the allocation was settled in.
    #[arg(long)]
    epoch: EpochId,

    /// Vesting span; defaults to the configured engine.
    #[arg(long)]
    vesting_epochs: Option<u64>,
}

#[derive(Debug, Serialize, Tabled)]
struct BucketRow {
    #[tabled(rename = "Matures In Epoch")]
    target_epoch: EpochId,
    #[tabled(rename = "Amount")]
    amount: Amount,
}

/// Run the split subcommand.
pub fn run(cmd: &SplitCmd, config: &CliConfig, format: OutputFormat) -> Result<(), CliError> {
    let vesting_epochs = cmd.vesting_epochs.unwrap_or_else(|| {
        config
            .engine
            .as_ref()
            .map(|e| e.vesting_epochs)
            .unwrap_or_else(|| EngineParams::new(0).vesting_epochs)
    });
    if vesting_epochs == 0 {
        return Err(CliError::InvalidArgument("vesting_epochs must be positive".to_string()));
    }

    let rows: Vec<BucketRow> = split_allocation(cmd.epoch, cmd.amount, vesting_epochs)
        .into_iter()
        .map(|b| BucketRow {
            target_epoch: b.target_epoch,
            amount: b.amount,
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", format_json(&rows)),
        OutputFormat::Table => println!("{}", format_table(&rows)),
    }
    Ok(())
}
