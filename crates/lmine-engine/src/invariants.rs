// crates/lmine-engine/src/invariants.rs
//
// Invariant checker for a whole `LiquidityMining` engine.
//
// Cheap enough to run after every step in tests and simulations; never
// called on the hot path.

use std::collections::BTreeMap;

use lmine_core::{Amount, EpochId, MiningError, RewardBudgetSource};

use crate::mining::LiquidityMining;
use crate::pool::PoolState;

fn violation(msg: String) -> MiningError {
    MiningError::InvariantViolation(msg)
}

/// Check all invariants. Returns the first violation found.
pub fn check_invariants(engine: &LiquidityMining) -> Result<(), MiningError> {
    // WeightsSumToNumerator
    let weight_sum: u128 = engine
        .current_weights()
        .values()
        .map(|&w| w as u128)
        .sum();
    if !engine.current_weights().is_empty()
        && weight_sum != engine.params().total_numerator as u128
    {
        return Err(violation(format!(
            "weights sum to {} instead of {}",
            weight_sum,
            engine.params().total_numerator
        )));
    }

    let mut budgets_by_epoch: BTreeMap<EpochId, u128> = BTreeMap::new();
    for pool in engine.pools() {
        check_pool(pool)?;
        for settlement in pool.settlements() {
            *budgets_by_epoch.entry(settlement.epoch).or_default() += settlement.pool_budget as u128;
        }
    }

    // PoolBudgetsWithinEpochRewards
    for (epoch, total) in budgets_by_epoch {
        let rewards = engine.schedule().rewards_for_epoch(epoch);
        if total > rewards as u128 {
            return Err(violation(format!(
                "epoch {}: pool budgets sum to {} but only {} was funded",
                epoch, total, rewards
            )));
        }
    }

    Ok(())
}

/// Check the invariants local to one pool.
pub fn check_pool(pool: &PoolState) -> Result<(), MiningError> {
    let id = pool.pool_id();

    // BalancesMatchTotal
    let balances: u128 = pool.ledger().accounts().map(|(_, a)| a.balance as u128).sum();
    if balances != pool.total_staked() as u128 {
        return Err(violation(format!(
            "pool {}: balances sum to {} but total staked is {}",
            id,
            balances,
            pool.total_staked()
        )));
    }

    // SettlementsContiguous
    let mut expected_epoch: EpochId = 1;
    let mut budgets: u128 = 0;
    for settlement in pool.settlements() {
        if settlement.epoch != expected_epoch {
            return Err(violation(format!(
                "pool {}: settlement for epoch {} found where epoch {} was expected",
                id, settlement.epoch, expected_epoch
            )));
        }
        expected_epoch += 1;

        // AllocationPlusDustIsBudget
        let allocated: u128 = settlement.allocations.values().map(|&a| a as u128).sum();
        if allocated + settlement.dust as u128 != settlement.pool_budget as u128 {
            return Err(violation(format!(
                "pool {} epoch {}: allocated {} + dust {} != budget {}",
                id, settlement.epoch, allocated, settlement.dust, settlement.pool_budget
            )));
        }

        // StakeSecondsSumToTotal
        let seconds: u128 = settlement.user_stake_seconds.values().sum();
        if seconds != settlement.total_stake_seconds {
            return Err(violation(format!(
                "pool {} epoch {}: user stake-seconds sum to {} but total is {}",
                id, settlement.epoch, seconds, settlement.total_stake_seconds
            )));
        }
        budgets += settlement.pool_budget as u128;
    }
    if expected_epoch - 1 != pool.last_settled_epoch() {
        return Err(violation(format!(
            "pool {}: last settled epoch is {} but settlements end at {}",
            id,
            pool.last_settled_epoch(),
            expected_epoch - 1
        )));
    }

    // DistributedPlusDustIsBudget
    let accounted = pool.distributed_total() as u128 + pool.foregone_dust() as u128;
    if accounted != budgets {
        return Err(violation(format!(
            "pool {}: distributed {} + foregone {} != settled budgets {}",
            id,
            pool.distributed_total(),
            pool.foregone_dust(),
            budgets
        )));
    }

    // ClaimedPlusPendingIsDistributed
    let mut owed: u128 = 0;
    for (_, account) in pool.vesting().accounts() {
        owed += account.claimed_total as u128;
        owed += account.buckets.values().map(|&b| b as u128).sum::<u128>();
    }
    let distributed: Amount = pool.distributed_total();
    if owed != distributed as u128 {
        return Err(violation(format!(
            "pool {}: claimed + pending is {} but {} was distributed",
            id, owed, distributed
        )));
    }

    Ok(())
}
