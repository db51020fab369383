// crates/lmine-core/src/traits.rs

use crate::types::{Amount, EpochId};

/// Supplier of the global per-epoch reward budget (`REWARDS_PER_EPOCH[e]`).
///
/// Implemented by lmine-engine's `RewardSchedule`. Values must not change
/// once epoch `e` has started.
pub trait RewardBudgetSource {
    /// Total rewards emitted in `epoch` across every pool, before weighting.
    /// Unfunded epochs return 0.
    fn rewards_for_epoch(&self, epoch: EpochId) -> Amount;
}

impl<T: RewardBudgetSource + ?Sized> RewardBudgetSource for &T {
    fn rewards_for_epoch(&self, epoch: EpochId) -> Amount {
        (**self).rewards_for_epoch(epoch)
    }
}
