// crates/lmine-engine/src/lib.rs
//
// lmine-engine: epoch-based liquidity-mining reward accrual and vesting.
//
// Depositors stake into pools over continuous time. Each fully elapsed epoch
// is settled once: per-user stake-seconds are measured, the pool's share of
// the epoch's reward budget is split proportionally, and every allocation is
// vested over the following epochs. Users redeem whatever has matured.
//
// All values are integers in base units; time is always supplied by the
// caller and never read from a local clock.

pub mod accumulator;
pub mod allocator;
pub mod clock;
pub mod invariants;
pub mod ledger;
pub mod math;
pub mod mining;
pub mod pool;
pub mod redemption;
pub mod registry;
pub mod schedule;
pub mod settlement;
pub mod vesting;

// Re-export key types for ergonomic access from downstream crates.
pub use accumulator::{EpochStakeSeconds, StakeSecondsAccumulator};
pub use allocator::{allocate, pool_budget, Allocation, PoolBudget};
pub use clock::EpochClock;
pub use invariants::check_invariants;
pub use ledger::{StakeAction, StakeLedger, UserStake};
pub use mining::{LiquidityMining, RedemptionSummary};
pub use pool::PoolState;
pub use registry::{AllocationRegistry, AllocationSetting};
pub use schedule::RewardSchedule;
pub use settlement::{EpochSettlement, SettlementContext};
pub use vesting::{split_allocation, RewardAccount, VestingBook, VestingBucket};

pub use lmine_core::{
    Amount, EngineParams, EpochId, MiningError, PoolId, RewardBudgetSource, StakeSeconds,
    Timestamp, UserId,
};
