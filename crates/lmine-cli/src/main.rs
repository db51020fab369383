// crates/lmine-cli/src/main.rs
//
// CLI entrypoint for the lmine liquidity-mining tools.
//
// Provides subcommands for replaying scenario files against the engine,
// looking up epoch boundaries, and previewing vesting splits.

mod commands;
mod config;
mod error;
mod output;
mod scenario;

use clap::{Parser, Subcommand};
use commands::epoch::EpochCmd;
use commands::simulate::SimulateCmd;
use commands::split::SplitCmd;
use config::CliConfig;

/// lmine: epoch-based liquidity-mining reward accrual and vesting.
#[derive(Parser, Debug)]
#[command(
    name = "lmine",
    version = "0.1.0",
    about = "Liquidity-mining reward engine: simulate scenarios, inspect epochs and vesting"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "~/.lmine/config.toml")]
    config: String,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a scenario file and report the resulting state.
    Simulate(SimulateCmd),

    /// Show the epoch containing a timestamp and its boundaries.
    Epoch(EpochCmd),

    /// Preview the vesting buckets of an allocation.
    Split(SplitCmd),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration first so its log level can seed the filter.
    let loaded = CliConfig::load(&cli.config);
    let log_level = loaded
        .as_ref()
        .map(|cfg| cfg.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match loaded {
        Ok(cfg) => {
            tracing::debug!("Loaded configuration from {}", cli.config);
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "Could not load config from {}: {}. Using defaults.",
                cli.config,
                e
            );
            CliConfig::default()
        }
    };
    let format = output::OutputFormat::resolve(config.output, cli.json);

    match &cli.command {
        Commands::Simulate(cmd) => commands::simulate::run(cmd, &config, format)?,
        Commands::Epoch(cmd) => commands::epoch::run(cmd, &config, format)?,
        Commands::Split(cmd) => commands::split::run(cmd, &config, format)?,
    }

    Ok(())
}
