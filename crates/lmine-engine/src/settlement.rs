// crates/lmine-engine/src/settlement.rs
//
// Lazy, memoized epoch settlement for one pool.
//
// Per-epoch lifecycle: Future -> Active -> Elapsed-Unsettled -> Settled.
// The Elapsed-Unsettled -> Settled step happens exactly once, the first time
// any operation needs it, and always in epoch order. Catch-up stages every
// pending epoch (stake-seconds, allocation, vesting buckets) before
// committing anything, so a failure leaves the pool as it was and readers
// only ever see "not settled" or the final result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lmine_core::{Amount, EpochId, MiningError, RewardBudgetSource, StakeSeconds, Timestamp, UserId};

use crate::accumulator::{EpochStakeSeconds, ReplayCursor, StakeSecondsAccumulator};
use crate::allocator::{allocate, Allocation, PoolBudget};
use crate::clock::EpochClock;
use crate::pool::PoolState;
use crate::vesting::split_allocation;

/// Immutable result of settling one epoch for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSettlement {
    pub epoch: EpochId,
    pub total_stake_seconds: StakeSeconds,
    pub user_stake_seconds: BTreeMap<UserId, StakeSeconds>,
    /// This pool's share of the epoch's global budget.
    pub pool_budget: Amount,
    pub allocations: BTreeMap<UserId, Amount>,
    /// Part of `pool_budget` that no user received.
    pub dust: Amount,
}

impl EpochSettlement {
    fn new(measured: EpochStakeSeconds, pool_budget: Amount, allocation: Allocation) -> Self {
        Self {
            epoch: measured.epoch,
            total_stake_seconds: measured.total,
            user_stake_seconds: measured.per_user,
            pool_budget,
            allocations: allocation.per_user,
            dust: allocation.dust,
        }
    }

    pub fn stake_seconds_of(&self, user: &UserId) -> StakeSeconds {
        self.user_stake_seconds.get(user).copied().unwrap_or(0)
    }

    pub fn allocation_of(&self, user: &UserId) -> Amount {
        self.allocations.get(user).copied().unwrap_or(0)
    }
}

/// What a pool needs from its surroundings to settle epochs.
pub struct SettlementContext<'a, B: RewardBudgetSource> {
    pub clock: &'a EpochClock,
    pub vesting_epochs: u64,
    pub budget: PoolBudget<'a, B>,
}

/// Settlements computed for every pending epoch but not yet applied.
#[derive(Debug, Default)]
pub(crate) struct StagedCatchUp {
    pub(crate) settlements: Vec<EpochSettlement>,
    cursors: BTreeMap<UserId, ReplayCursor>,
}

impl PoolState {
    /// Settle every epoch that has fully elapsed by `now` and is not yet
    /// settled. Returns how many epochs were settled (0 when up to date).
    ///
    /// # Errors
    /// Returns `MiningError::ArithmeticOverflow` if any staged epoch
    /// overflows; no epoch is committed in that case.
    pub fn catch_up<B: RewardBudgetSource>(
        &mut self,
        now: Timestamp,
        ctx: &SettlementContext<'_, B>,
    ) -> Result<usize, MiningError> {
        let staged = self.stage_catch_up(now, ctx)?;
        Ok(self.commit_catch_up(staged, ctx.vesting_epochs))
    }

    /// Compute the settlements `catch_up` would commit at `now`, leaving the
    /// pool untouched.
    pub(crate) fn stage_catch_up<B: RewardBudgetSource>(
        &self,
        now: Timestamp,
        ctx: &SettlementContext<'_, B>,
    ) -> Result<StagedCatchUp, MiningError> {
        let target = ctx.clock.last_completed_epoch(now);
        if target <= self.last_settled_epoch {
            return Ok(StagedCatchUp::default());
        }

        let mut accumulator =
            StakeSecondsAccumulator::new(&self.ledger, ctx.clock, self.last_settled_epoch + 1);
        let mut settlements = Vec::new();
        while accumulator.next_epoch() <= target {
            let measured = accumulator.accumulate_next(now)?;
            let budget = ctx.budget.for_epoch(measured.epoch)?;
            let allocation = allocate(budget, &measured)?;
            settlements.push(EpochSettlement::new(measured, budget, allocation));
        }
        Ok(StagedCatchUp {
            settlements,
            cursors: accumulator.into_cursors(),
        })
    }

    /// Apply a staged catch-up. Cannot fail.
    pub(crate) fn commit_catch_up(&mut self, staged: StagedCatchUp, vesting_epochs: u64) -> usize {
        if staged.settlements.is_empty() {
            return 0;
        }
        self.ledger.commit_replay(staged.cursors);
        let settled = staged.settlements.len();
        for settlement in staged.settlements {
            self.commit(settlement, vesting_epochs);
        }
        settled
    }

    fn commit(&mut self, settlement: EpochSettlement, vesting_epochs: u64) {
        for (user, &amount) in &settlement.allocations {
            let buckets = split_allocation(settlement.epoch, amount, vesting_epochs);
            self.vesting.credit(user, &buckets);
        }

        let distributed = settlement.pool_budget - settlement.dust;
        self.distributed_total = self.distributed_total.saturating_add(distributed);
        self.foregone_dust = self.foregone_dust.saturating_add(settlement.dust);

        if settlement.total_stake_seconds == 0 && settlement.pool_budget > 0 {
            tracing::warn!(
                "Pool {}: epoch {} had no stake, budget of {} foregone",
                self.pool_id,
                settlement.epoch,
                settlement.pool_budget
            );
        } else {
            tracing::debug!(
                "Pool {}: settled epoch {} (stake-seconds {}, budget {}, {} users, dust {})",
                self.pool_id,
                settlement.epoch,
                settlement.total_stake_seconds,
                settlement.pool_budget,
                settlement.allocations.len(),
                settlement.dust
            );
        }

        self.last_settled_epoch = settlement.epoch;
        self.settlements.insert(settlement.epoch, settlement);
    }

    /// Settle `epoch` (and every earlier unsettled epoch) on demand.
    ///
    /// Settling an epoch that is already settled returns the cached result
    /// and changes nothing.
    ///
    /// # Errors
    /// Returns `MiningError::EpochNotYetComplete` if `epoch` has not ended by
    /// `now` (epoch 0 never completes), `NonMonotonicTime` for a stale `now`,
    /// and any catch-up error.
    pub fn settle_epoch<B: RewardBudgetSource>(
        &mut self,
        epoch: EpochId,
        now: Timestamp,
        ctx: &SettlementContext<'_, B>,
    ) -> Result<&EpochSettlement, MiningError> {
        let not_complete = || MiningError::EpochNotYetComplete {
            epoch,
            end: ctx.clock.end(epoch),
            now,
        };
        if epoch == 0 {
            return Err(not_complete());
        }
        if epoch > self.last_settled_epoch {
            if !ctx.clock.is_complete(epoch, now) {
                return Err(not_complete());
            }
            self.check_time(now, ctx)?;
            self.catch_up(now, ctx)?;
            self.latest_time = self.latest_time.max(now);
        }
        self.settlements.get(&epoch).ok_or_else(not_complete)
    }
}
