use thiserror::Error;

use crate::types::{Amount, EpochId, PoolId, Timestamp};

/// Error taxonomy for the liquidity-mining engine.
///
/// Every variant is a local validation failure: none is transient, so the
/// caller must correct its input rather than retry. An operation that
/// returns an error has left the engine state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    /// The supplied time precedes the configured start of epoch 1.
    #[error("Clock not started: time {time} is before start time {start_time}")]
    ClockNotStarted { time: Timestamp, start_time: Timestamp },

    /// A withdrawal asked for more than the user has staked.
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    /// Settlement was requested for an epoch that has not fully elapsed.
    #[error("Epoch {epoch} not yet complete: ends at {end}, now is {now}")]
    EpochNotYetComplete {
        epoch: EpochId,
        end: Timestamp,
        now: Timestamp,
    },

    /// Pool weights do not sum to the fixed numerator, or the pool set is incomplete.
    #[error("Invalid allocation setting: {0}")]
    InvalidAllocationSetting(String),

    /// A mutating call supplied a time earlier than one already processed.
    #[error("Time went backwards: {time} is before {latest}")]
    NonMonotonicTime { time: Timestamp, latest: Timestamp },

    /// Zero-valued stake or withdrawal.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// No pool is registered under this id.
    #[error("Pool not found: {0}")]
    PoolNotFound(PoolId),

    /// A pool with this id is already registered.
    #[error("Pool already registered: {0}")]
    DuplicatePool(PoolId),

    /// The reward budget of an epoch that has already started cannot change.
    #[error("Rewards for epoch {epoch} are locked (current epoch {current_epoch})")]
    RewardsLocked { epoch: EpochId, current_epoch: EpochId },

    /// Engine parameters rejected at construction.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// An intermediate product or sum does not fit its integer type.
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    /// A state invariant does not hold (reported by the invariant checker).
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MiningError {
    fn from(e: serde_json::Error) -> Self {
        MiningError::Serialization(e.to_string())
    }
}
