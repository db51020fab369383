// crates/lmine-core/src/lib.rs
//
// lmine-core: Core types, errors, parameters, and trait seams for the
// lmine epoch-based liquidity-mining engine.
//
// This is the leaf crate that every other crate in the workspace depends on.
// It defines the primitive units, the error taxonomy, the engine parameter
// block, and the trait through which reward budgets are supplied.

pub mod error;
pub mod params;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use lmine_core::MiningError;`

pub use error::MiningError;
pub use params::EngineParams;
pub use traits::RewardBudgetSource;
pub use types::{Amount, EpochId, PoolId, StakeSeconds, Timestamp, UserId};
