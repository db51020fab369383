// crates/lmine-engine/src/clock.rs
//
// Epoch clock: maps wall-clock time to epoch indices and boundaries.
//
//   epoch_of(t) = floor((t - start_time) / epoch_duration) + 1
//   start(e)    = start_time + (e - 1) * epoch_duration
//   end(e)      = start(e + 1)
//
// The clock holds no mutable state; time is always passed in by the caller.

use serde::{Deserialize, Serialize};

use lmine_core::{EngineParams, EpochId, MiningError, Timestamp};

/// Pure mapping between timestamps and fixed-length epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochClock {
    start_time: Timestamp,
    epoch_duration: u64,
}

impl EpochClock {
    /// Create a clock. `epoch_duration` must be non-zero.
    ///
    /// # Errors
    /// Returns `MiningError::InvalidParams` if `epoch_duration` is zero.
    pub fn new(start_time: Timestamp, epoch_duration: u64) -> Result<Self, MiningError> {
        if epoch_duration == 0 {
            return Err(MiningError::InvalidParams(
                "epoch_duration must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            start_time,
            epoch_duration,
        })
    }

    pub fn from_params(params: &EngineParams) -> Result<Self, MiningError> {
        Self::new(params.start_time, params.epoch_duration)
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn epoch_duration(&self) -> u64 {
        self.epoch_duration
    }

    /// The epoch containing `time`.
    ///
    /// # Errors
    /// Returns `MiningError::ClockNotStarted` if `time` precedes the start of epoch 1.
    pub fn epoch_of(&self, time: Timestamp) -> Result<EpochId, MiningError> {
        if time < self.start_time {
            return Err(MiningError::ClockNotStarted {
                time,
                start_time: self.start_time,
            });
        }
        Ok((time - self.start_time) / self.epoch_duration + 1)
    }

    /// Like `epoch_of`, but reports epoch 0 before the clock has started.
    pub fn epoch_or_zero(&self, time: Timestamp) -> EpochId {
        self.epoch_of(time).unwrap_or(0)
    }

    /// The most recent epoch whose end is at or before `time` (0 if none).
    pub fn last_completed_epoch(&self, time: Timestamp) -> EpochId {
        self.epoch_or_zero(time).saturating_sub(1)
    }

    /// First second of `epoch`. Epoch 0 maps to the start of epoch 1.
    pub fn start(&self, epoch: EpochId) -> Timestamp {
        let offset = epoch.saturating_sub(1).saturating_mul(self.epoch_duration);
        self.start_time.saturating_add(offset)
    }

    /// First second after `epoch`, i.e. `start(epoch + 1)`.
    pub fn end(&self, epoch: EpochId) -> Timestamp {
        self.start(epoch.saturating_add(1))
    }

    /// Whether `epoch` has fully elapsed as of `now`.
    pub fn is_complete(&self, epoch: EpochId, now: Timestamp) -> bool {
        self.end(epoch) <= now
    }
}
