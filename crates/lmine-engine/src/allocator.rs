// crates/lmine-engine/src/allocator.rs
//
// Reward allocation for a settled epoch.
//
//   pool_budget(e) = floor(REWARDS_PER_EPOCH[e] x weight(pool, e) / total_numerator)
//   allocation(u)  = floor(pool_budget(e) x stake_seconds(u) / total_stake_seconds)
//
// Truncation remainders ("dust") are never redistributed or carried forward.
// When nobody staked during the epoch the whole pool budget is foregone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lmine_core::{Amount, EpochId, MiningError, PoolId, RewardBudgetSource, UserId};

use crate::accumulator::EpochStakeSeconds;
use crate::math::{checked_add, mul_div_floor};
use crate::registry::AllocationRegistry;

/// Per-user split of one pool's budget for one epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub per_user: BTreeMap<UserId, Amount>,
    /// Sum of `per_user`.
    pub distributed: Amount,
    /// Budget left undistributed by truncation or by an empty epoch.
    pub dust: Amount,
}

/// The share of the global budget a pool receives in one epoch.
///
/// # Errors
/// Returns `MiningError::ArithmeticOverflow` if `total_numerator` is zero.
pub fn pool_budget(
    epoch_rewards: Amount,
    weight: u64,
    total_numerator: u64,
) -> Result<Amount, MiningError> {
    mul_div_floor(epoch_rewards as u128, weight as u128, total_numerator as u128)
}

/// Split `budget` across users proportionally to their stake-seconds.
///
/// # Errors
/// Returns `MiningError::ArithmeticOverflow` if a share does not fit in
/// `Amount`, which cannot happen while `per_user` sums to `total`.
pub fn allocate(budget: Amount, stake_seconds: &EpochStakeSeconds) -> Result<Allocation, MiningError> {
    if stake_seconds.total == 0 {
        return Ok(Allocation {
            per_user: BTreeMap::new(),
            distributed: 0,
            dust: budget,
        });
    }

    let mut per_user = BTreeMap::new();
    let mut distributed: Amount = 0;
    for (user, &seconds) in &stake_seconds.per_user {
        let share = mul_div_floor(budget as u128, seconds, stake_seconds.total)?;
        distributed = checked_add(distributed, share, "epoch allocation")?;
        if share > 0 {
            per_user.insert(user.clone(), share);
        }
    }

    Ok(Allocation {
        per_user,
        distributed,
        dust: budget - distributed,
    })
}

/// Resolves a pool's budget per epoch from the global reward source and the
/// allocation settings in force for that epoch.
pub struct PoolBudget<'a, B: RewardBudgetSource> {
    source: &'a B,
    registry: &'a AllocationRegistry,
    pool: PoolId,
}

impl<'a, B: RewardBudgetSource> PoolBudget<'a, B> {
    pub fn new(source: &'a B, registry: &'a AllocationRegistry, pool: PoolId) -> Self {
        Self {
            source,
            registry,
            pool,
        }
    }

    pub fn for_epoch(&self, epoch: EpochId) -> Result<Amount, MiningError> {
        pool_budget(
            self.source.rewards_for_epoch(epoch),
            self.registry.weight_for_epoch(self.pool, epoch),
            self.registry.total_numerator(),
        )
    }
}
