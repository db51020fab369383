use thiserror::Error;

use lmine_core::MiningError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] MiningError),

    #[error("Invalid scenario: {0}")]
    Scenario(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(u64),
}
