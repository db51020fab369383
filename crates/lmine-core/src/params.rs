// crates/lmine-core/src/params.rs
//
// Engine parameters fixed at construction time.
// Loaded from TOML by the CLI or built directly by callers.

use serde::{Deserialize, Serialize};

use crate::error::MiningError;
use crate::types::Timestamp;

/// Parameters that never change over the lifetime of an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Start of epoch 1 (unix seconds).
    pub start_time: Timestamp,

    /// Length of every epoch in seconds.
    #[serde(default = "default_epoch_duration")]
    pub epoch_duration: u64,

    /// Number of epochs an allocation vests over.
    #[serde(default = "default_vesting_epochs")]
    pub vesting_epochs: u64,

    /// Fixed total that pool weights must always sum to.
    #[serde(default = "default_total_numerator")]
    pub total_numerator: u64,
}

fn default_epoch_duration() -> u64 {
    604_800
}

fn default_vesting_epochs() -> u64 {
    4
}

fn default_total_numerator() -> u64 {
    1_000_000_000
}

impl EngineParams {
    /// Parameters with the default epoch length, vesting span, and numerator.
    pub fn new(start_time: Timestamp) -> Self {
        Self {
            start_time,
            epoch_duration: default_epoch_duration(),
            vesting_epochs: default_vesting_epochs(),
            total_numerator: default_total_numerator(),
        }
    }

    pub fn with_epoch_duration(mut self, epoch_duration: u64) -> Self {
        self.epoch_duration = epoch_duration;
        self
    }

    pub fn with_vesting_epochs(mut self, vesting_epochs: u64) -> Self {
        self.vesting_epochs = vesting_epochs;
        self
    }

    pub fn with_total_numerator(mut self, total_numerator: u64) -> Self {
        self.total_numerator = total_numerator;
        self
    }

    /// Reject parameter combinations the engine cannot run with.
    ///
    /// # Errors
    /// Returns `MiningError::InvalidParams` if any of the epoch duration,
    /// vesting span, or total numerator is zero.
    pub fn validate(&self) -> Result<(), MiningError> {
        if self.epoch_duration == 0 {
            return Err(MiningError::InvalidParams(
                "epoch_duration must be greater than zero".to_string(),
            ));
        }
        if self.vesting_epochs == 0 {
            return Err(MiningError::InvalidParams(
                "vesting_epochs must be greater than zero".to_string(),
            ));
        }
        if self.total_numerator == 0 {
            return Err(MiningError::InvalidParams(
                "total_numerator must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
