// crates/lmine-engine/src/redemption.rs
//
// Reward redemption for one pool.
//
// redeem_rewards(user, now):
//   1. current = epoch_of(now)
//   2. settle every epoch < current that is not settled yet
//   3. pay out every unclaimed bucket with target_epoch <= current
//
// Claimed buckets are removed, so calling again in the same epoch pays 0.
// Queries project the same catch-up without committing it.

use lmine_core::{Amount, EpochId, MiningError, RewardBudgetSource, Timestamp, UserId};

use crate::math::checked_add;
use crate::pool::PoolState;
use crate::settlement::{SettlementContext, StagedCatchUp};
use crate::vesting::{split_allocation, RewardAccount, VestingBucket};

/// A redemption that has passed every check and only needs applying.
#[derive(Debug)]
pub(crate) struct PreparedRedemption {
    staged: StagedCatchUp,
    current_epoch: EpochId,
    payout: Amount,
}

impl PreparedRedemption {
    pub(crate) fn payout(&self) -> Amount {
        self.payout
    }
}

impl PoolState {
    /// Redeem everything `user` has vested and not yet claimed.
    ///
    /// Returns the amount paid out; 0 is a valid result.
    ///
    /// # Errors
    /// `ClockNotStarted` before epoch 1, `NonMonotonicTime` for a stale
    /// `now`, plus any settlement error.
    pub fn redeem_rewards<B: RewardBudgetSource>(
        &mut self,
        user: &UserId,
        now: Timestamp,
        ctx: &SettlementContext<'_, B>,
    ) -> Result<Amount, MiningError> {
        let prepared = self.prepare_redemption(user, now, ctx)?;
        Ok(self.complete_redemption(user, prepared, now, ctx.vesting_epochs))
    }

    /// Run every fallible step of a redemption without touching the pool.
    pub(crate) fn prepare_redemption<B: RewardBudgetSource>(
        &self,
        user: &UserId,
        now: Timestamp,
        ctx: &SettlementContext<'_, B>,
    ) -> Result<PreparedRedemption, MiningError> {
        let current_epoch = ctx.clock.epoch_of(now)?;
        self.check_time(now, ctx)?;

        let staged = self.stage_catch_up(now, ctx)?;
        let account = self.projected_account(user, &staged, ctx.vesting_epochs);
        let payout = account.matured(current_epoch);
        checked_add(account.claimed_total, payout, "claimed total")?;
        Ok(PreparedRedemption {
            staged,
            current_epoch,
            payout,
        })
    }

    /// Apply a prepared redemption. Cannot fail.
    pub(crate) fn complete_redemption(
        &mut self,
        user: &UserId,
        prepared: PreparedRedemption,
        now: Timestamp,
        vesting_epochs: u64,
    ) -> Amount {
        let PreparedRedemption {
            staged,
            current_epoch,
            payout,
        } = prepared;
        self.commit_catch_up(staged, vesting_epochs);
        let claimed = self.vesting.claim(user, current_epoch);
        debug_assert_eq!(claimed, payout);
        self.latest_time = self.latest_time.max(now);

        if claimed > 0 {
            tracing::info!(
                "Pool {}: {} redeemed {} in epoch {} (claimed total {})",
                self.pool_id,
                user,
                claimed,
                current_epoch,
                self.vesting.claimed_total(user)
            );
        }
        claimed
    }

    /// Vested-but-unclaimed amount `user` could redeem at `now`.
    ///
    /// Read-only: elapsed epochs are projected, not settled.
    ///
    /// # Errors
    /// `ClockNotStarted` before epoch 1, plus any settlement error.
    pub fn pending_rewards<B: RewardBudgetSource>(
        &self,
        user: &UserId,
        now: Timestamp,
        ctx: &SettlementContext<'_, B>,
    ) -> Result<Amount, MiningError> {
        let current_epoch = ctx.clock.epoch_of(now)?;
        let staged = self.stage_catch_up(now, ctx)?;
        Ok(self
            .projected_account(user, &staged, ctx.vesting_epochs)
            .matured(current_epoch))
    }

    /// Buckets of `user` still locked at `now`, in maturity order.
    ///
    /// # Errors
    /// `ClockNotStarted` before epoch 1, plus any settlement error.
    pub fn vesting_schedule<B: RewardBudgetSource>(
        &self,
        user: &UserId,
        now: Timestamp,
        ctx: &SettlementContext<'_, B>,
    ) -> Result<Vec<VestingBucket>, MiningError> {
        let current_epoch = ctx.clock.epoch_of(now)?;
        let staged = self.stage_catch_up(now, ctx)?;
        Ok(self
            .projected_account(user, &staged, ctx.vesting_epochs)
            .locked(current_epoch))
    }

    /// `user`'s account as it would look once `staged` is committed.
    fn projected_account(
        &self,
        user: &UserId,
        staged: &StagedCatchUp,
        vesting_epochs: u64,
    ) -> RewardAccount {
        let mut account = self.vesting.account(user).cloned().unwrap_or_default();
        for settlement in &staged.settlements {
            let amount = settlement.allocation_of(user);
            for bucket in split_allocation(settlement.epoch, amount, vesting_epochs) {
                let slot = account.buckets.entry(bucket.target_epoch).or_insert(0);
                *slot = slot.saturating_add(bucket.amount);
            }
        }
        account
    }
}
